use clap::{Parser, Subcommand, ValueEnum};
use foldlight_core::{
    format_output, format_output_grouped, render_ansi, AnalyzeConfig, Analyzer, BufferAdapter,
    EditorBuffer, FoldStore, Language, OutputFormat, ProjectScanner, SourceSnapshot,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "foldlight")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fold-region and syntax-highlight analysis for Python and C/C++")]
#[command(long_about = "Scans source text with heuristic per-line lexers and reports foldable \
    regions (functions, classes, blocks) and classified token spans.\n\n\
    - Python blocks are recovered from indentation\n\
    - C/C++ blocks are recovered from braces, with string and comment context\n\
      tracked across lines\n\n\
    Output is grouped by language family (python / native) by default.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json)]
    pub format: OutputFormatArg,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only scan a specific language
    #[arg(long, value_enum)]
    pub language: Option<LanguageFilter>,

    /// Additional ignore patterns (gitignore style)
    #[arg(long, action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Ignore file path (defaults to .gitignore)
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Include hidden files and directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Minimum lines for a region to be reported
    #[arg(long, default_value_t = 2)]
    pub min_lines: usize,

    /// Use flat output structure (not grouped by language)
    #[arg(long)]
    pub flat: bool,

    /// Disable colors in terminal output
    #[arg(long)]
    pub no_color: bool,

    /// Show verbose progress
    #[arg(short, long)]
    pub verbose: bool,

    /// Parallel threads (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all foldable regions in a file
    Regions {
        /// File to analyze
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Json)]
        format: OutputFormatArg,
    },

    /// Render a file with every region folded away
    Render {
        /// File to render
        file: PathBuf,

        /// Placeholder line for collapsed bodies
        #[arg(long)]
        placeholder: Option<String>,

        /// Minimum lines for a region to fold
        #[arg(long, default_value_t = 2)]
        min_lines: usize,
    },

    /// Print a file with ANSI syntax highlighting
    Highlight {
        /// File to highlight
        file: PathBuf,

        /// Force ANSI output even when stdout is not a terminal
        #[arg(long)]
        ansi: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Summary,
    Ansi,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Ansi => OutputFormat::Ansi,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LanguageFilter {
    Python,
    C,
    Cpp,
    /// Alias for C + C++
    Native,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let args = Args::parse();

    match &args.command {
        Some(Commands::Regions { file, format }) => run_regions(file.clone(), format.clone()),
        Some(Commands::Render {
            file,
            placeholder,
            min_lines,
        }) => run_render(file.clone(), placeholder.clone(), *min_lines),
        Some(Commands::Highlight { file, ansi }) => run_highlight(file.clone(), *ansi, &args),
        None => run_scan(&args),
    }
}

fn run_scan(args: &Args) -> anyhow::Result<()> {
    let language_filter = args.language.as_ref().map(|l| match l {
        LanguageFilter::Python => vec![Language::Python],
        LanguageFilter::C => vec![Language::C],
        LanguageFilter::Cpp => vec![Language::Cpp],
        LanguageFilter::Native => vec![Language::C, Language::Cpp],
    });

    let mut config = AnalyzeConfig::new(args.path.clone())
        .with_ignore_patterns(args.ignore.clone())
        .with_include_hidden(args.include_hidden)
        .with_threads(args.threads)
        .with_min_region_lines(args.min_lines)
        .load_project_file()?;

    if let Some(languages) = language_filter {
        config = config.with_language_filter(languages);
    }

    if let Some(ref ignore_file) = args.ignore_file {
        config = config.with_ignore_file(ignore_file.clone());
    }

    let spinner = if args.verbose {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Scanning project...");
        Some(pb)
    } else {
        None
    };

    let scanner = ProjectScanner::new(config)?;
    let result = scanner.scan()?;
    tracing::debug!(
        files = result.stats.total_files,
        regions = result.stats.total_regions,
        "scan complete"
    );

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Scanned {} files in {}ms",
            result.stats.total_files, result.metadata.scan_duration_ms
        ));
    }

    let output = if args.flat {
        format_output(&result, args.format.clone().into())?
    } else {
        format_output_grouped(&result, args.format.clone().into())?
    };

    if let Some(ref path) = args.output {
        fs::write(path, &output)?;
        if args.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn run_regions(file: PathBuf, format: OutputFormatArg) -> anyhow::Result<()> {
    let scanner = ProjectScanner::new(AnalyzeConfig::default())?;
    let source_file = scanner.scan_file(&file)?;

    let output = match format {
        OutputFormatArg::Json => serde_json::to_string_pretty(&source_file)?,
        OutputFormatArg::Yaml => serde_yaml::to_string(&source_file)?,
        OutputFormatArg::Summary | OutputFormatArg::Ansi => {
            let mut out = String::new();
            out.push_str(&format!(
                "File: {}\nLanguage: {}\nLines: {}\nRegions: {}\n\n",
                source_file.path.display(),
                source_file.language.as_str(),
                source_file.line_count,
                source_file.regions.len()
            ));

            for (i, region) in source_file.regions.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {} (lines {}-{}, {} lines)\n",
                    i + 1,
                    region.kind.as_str(),
                    region.start_line,
                    region.end_line,
                    region.line_count()
                ));
            }

            out
        }
    };

    println!("{}", output);
    Ok(())
}

fn run_render(file: PathBuf, placeholder: Option<String>, min_lines: usize) -> anyhow::Result<()> {
    let content = fs::read_to_string(&file)?;
    let language = Language::from_path(&file)
        .ok_or_else(|| anyhow::anyhow!("Unsupported file type: {}", file.display()))?;

    let mut buffer = EditorBuffer::from_text(&content);
    let mut analyzer = Analyzer::new(Some(language))?;
    let mut result = analyzer.analyze(&buffer.snapshot());
    result.regions.retain(|r| r.line_count() >= min_lines);

    let mut store = match placeholder {
        Some(p) => FoldStore::new().with_placeholder(p),
        None => FoldStore::new(),
    };
    store.apply_result(&result);
    store.fold_all(&mut buffer);

    print!("{}", buffer.full_text());
    Ok(())
}

fn run_highlight(file: PathBuf, force_ansi: bool, args: &Args) -> anyhow::Result<()> {
    let content = fs::read_to_string(&file)?;
    let language = Language::from_path(&file)
        .ok_or_else(|| anyhow::anyhow!("Unsupported file type: {}", file.display()))?;

    let snapshot = SourceSnapshot::from_text(1, &content);
    let mut analyzer = Analyzer::new(Some(language))?;
    let result = analyzer.analyze(&snapshot);

    if force_ansi || (atty::is(atty::Stream::Stdout) && !args.no_color) {
        print!("{}", render_ansi(&snapshot, &result.tokens));
    } else {
        print!("{}", content);
    }

    if args.verbose {
        eprintln!(
            "\n--- {} tokens, {} regions ---",
            result.tokens.len(),
            result.regions.len()
        );
    }

    Ok(())
}
