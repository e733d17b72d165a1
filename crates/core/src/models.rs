use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a foldable region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldKind {
    /// Function or method body
    Function,
    /// Class, struct, enum, union, or namespace body
    Class,
    /// Any other indentation or brace block
    Block,
}

impl FoldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoldKind::Function => "function",
            FoldKind::Class => "class",
            FoldKind::Block => "block",
        }
    }
}

/// Classification of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Keyword,
    ClassName,
    FunctionName,
    BuiltinName,
    String,
    Comment,
    Number,
    Operator,
    Punctuation,
    Default,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::ClassName => "class_name",
            TokenKind::FunctionName => "function_name",
            TokenKind::BuiltinName => "builtin_name",
            TokenKind::String => "string",
            TokenKind::Comment => "comment",
            TokenKind::Number => "number",
            TokenKind::Operator => "operator",
            TokenKind::Punctuation => "punctuation",
            TokenKind::Default => "default",
        }
    }
}

/// A (line, column) position. Lines are 1-indexed, columns are 0-indexed
/// character offsets within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineCol {
    pub line: usize,
    pub col: usize,
}

impl LineCol {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// One lexical occurrence in the source, with its exact span.
///
/// Multi-line constructs (triple-quoted strings, block comments) are emitted
/// as one token per line segment, so every span stays within a single line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Inclusive start position
    pub start: LineCol,
    /// Exclusive end position
    pub end: LineCol,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            kind,
            start: LineCol::new(line, start_col),
            end: LineCol::new(line, end_col),
        }
    }
}

/// Stable identifier tying a fold region across repeated analyses, so
/// collapse state survives edits that leave the region's header intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(pub u64);

/// A collapsible line range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldRegion {
    pub kind: FoldKind,
    /// Header line (1-indexed); stays visible when the region collapses
    pub start_line: usize,
    /// Last line of the region (1-indexed); `start_line < end_line` always holds
    pub end_line: usize,
    pub anchor: AnchorId,
    /// Content hash of the header line, used for anchor matching across passes
    #[serde(skip)]
    pub header_hash: u64,
}

impl FoldRegion {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Whether this region nests `other` under the forest ordering
    pub fn contains(&self, other: &FoldRegion) -> bool {
        self.start_line <= other.start_line && other.end_line <= self.end_line
    }

    /// The lines hidden when this region collapses: `start_line + 1 ..= end_line`
    pub fn hides(&self, line: usize) -> bool {
        self.start_line < line && line <= self.end_line
    }
}

/// Language of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    C,
    Cpp,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Language::Python),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| Self::from_extension(&e.to_string_lossy()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    /// Whether the language uses indentation-delimited blocks
    pub fn is_indent_delimited(&self) -> bool {
        matches!(self, Language::Python)
    }
}

/// Immutable, versioned view of a buffer's lines at the moment of analysis
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    version: u64,
    lines: Vec<String>,
}

impl SourceSnapshot {
    pub fn new(version: u64, lines: Vec<String>) -> Self {
        Self { version, lines }
    }

    pub fn from_text(version: u64, text: &str) -> Self {
        Self {
            version,
            lines: text.lines().map(|l| l.to_string()).collect(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Line text by 1-indexed line number
    pub fn line(&self, line: usize) -> Option<&str> {
        self.lines.get(line.wrapping_sub(1)).map(|s| s.as_str())
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|s| s.as_str())
    }
}

/// A non-fatal note produced during scanning (unterminated string or block
/// comment at end of input, and the like). Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

/// The complete product of one analysis pass, returned to and held by the
/// caller. Stamped with the snapshot version it was computed from so stale
/// results can be rejected before application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub version: u64,
    pub language: Option<Language>,
    pub regions: Vec<FoldRegion>,
    pub tokens: Vec<Token>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    /// The no-op result: unknown language, failed pass, or empty input
    pub fn empty(version: u64, language: Option<Language>) -> Self {
        Self {
            version,
            language,
            regions: Vec::new(),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// A source file with its fold regions, as reported by the project scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Relative path from project root
    pub path: PathBuf,
    /// Absolute path
    pub absolute_path: PathBuf,
    /// Detected language
    pub language: Language,
    /// All fold regions in this file
    pub regions: Vec<FoldRegion>,
    /// Number of classified tokens
    pub token_count: usize,
    /// Total line count
    pub line_count: usize,
    /// Whether the file was read and analyzed successfully
    pub analyzed: bool,
    /// Read error message if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics about fold analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldStats {
    pub total_files: usize,
    pub total_regions: usize,
    pub function_regions: usize,
    pub class_regions: usize,
    pub block_regions: usize,
    pub python_files: usize,
    pub c_files: usize,
    pub cpp_files: usize,
    pub total_lines: usize,
    pub foldable_lines: usize,
}

impl FoldStats {
    pub fn add_region(&mut self, region: &FoldRegion) {
        self.total_regions += 1;
        self.foldable_lines += region.line_count();
        match region.kind {
            FoldKind::Function => self.function_regions += 1,
            FoldKind::Class => self.class_regions += 1,
            FoldKind::Block => self.block_regions += 1,
        }
    }
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub scan_duration_ms: u64,
    pub files_per_second: f64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            files_per_second: 0.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Per-language-family section of a grouped project map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageSection {
    pub files: Vec<SourceFile>,
    pub stats: FoldStats,
}

/// Aggregated analysis results for a project tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMap {
    /// Project root path
    pub root: PathBuf,
    /// All source files analyzed
    pub files: Vec<SourceFile>,
    /// Fold statistics
    pub stats: FoldStats,
    /// Scan metadata
    pub metadata: AnalysisMetadata,
}

impl ProjectMap {
    /// Convert to grouped format (python / native sections)
    pub fn to_grouped(&self) -> GroupedProjectMap {
        let python_files: Vec<SourceFile> = self
            .files
            .iter()
            .filter(|f| f.language == Language::Python)
            .cloned()
            .collect();

        let native_files: Vec<SourceFile> = self
            .files
            .iter()
            .filter(|f| f.language == Language::C || f.language == Language::Cpp)
            .cloned()
            .collect();

        let python_stats = Self::section_stats(&python_files);
        let native_stats = Self::section_stats(&native_files);

        GroupedProjectMap {
            root: self.root.clone(),
            python: LanguageSection {
                files: python_files,
                stats: python_stats,
            },
            native: LanguageSection {
                files: native_files,
                stats: native_stats,
            },
            metadata: self.metadata.clone(),
        }
    }

    fn section_stats(files: &[SourceFile]) -> FoldStats {
        let mut stats = FoldStats::default();
        stats.total_files = files.len();

        for file in files {
            match file.language {
                Language::Python => stats.python_files += 1,
                Language::C => stats.c_files += 1,
                Language::Cpp => stats.cpp_files += 1,
            }
            stats.total_lines += file.line_count;
            for region in &file.regions {
                stats.add_region(region);
            }
        }

        stats
    }
}

/// Grouped project map with separate sections for Python and C/C++
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedProjectMap {
    /// Project root path
    pub root: PathBuf,
    /// Python files
    pub python: LanguageSection,
    /// C and C++ files
    pub native: LanguageSection,
    /// Scan metadata
    pub metadata: AnalysisMetadata,
}
