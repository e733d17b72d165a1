use crate::models::Language;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid ignore pattern: {0}")]
    PatternError(#[from] globset::Error),
    #[error("Invalid ignore file: {0}")]
    IgnoreFileError(#[from] ignore::Error),
    #[error("Invalid config file {}: {source}", .path.display())]
    FileError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Directory names never worth descending into
const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "node_modules",
    "build",
    "target",
    ".idea",
    ".vscode",
];

/// Configuration for project analysis
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Project root directory
    pub root: PathBuf,
    /// Only analyze these languages; `None` means all supported
    pub language_filter: Option<Vec<Language>>,
    /// Additional gitignore-style ignore patterns
    pub ignore_patterns: Vec<String>,
    /// Explicit ignore file; defaults to `<root>/.gitignore` when present
    pub ignore_file: Option<PathBuf>,
    /// Include hidden files and directories
    pub include_hidden: bool,
    /// Minimum line count for a region to be reported
    pub min_region_lines: usize,
    /// Worker threads for the project scan (0 = auto)
    pub threads: usize,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            language_filter: None,
            ignore_patterns: Vec::new(),
            ignore_file: None,
            include_hidden: false,
            min_region_lines: 2,
            threads: 0,
        }
    }
}

impl AnalyzeConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    pub fn with_language_filter(mut self, languages: Vec<Language>) -> Self {
        self.language_filter = Some(languages);
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_ignore_file(mut self, path: PathBuf) -> Self {
        self.ignore_file = Some(path);
        self
    }

    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn with_min_region_lines(mut self, min: usize) -> Self {
        self.min_region_lines = min;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Merge `<root>/.foldlight.toml` into this config, if present
    pub fn load_project_file(mut self) -> Result<Self, ConfigError> {
        let path = self.root.join(".foldlight.toml");
        if !path.exists() {
            return Ok(self);
        }
        let text = std::fs::read_to_string(&path)?;
        let file: FileConfig =
            toml::from_str(&text).map_err(|source| ConfigError::FileError { path, source })?;

        self.ignore_patterns.extend(file.ignore);
        if let Some(min) = file.min_region_lines {
            self.min_region_lines = min;
        }
        if let Some(names) = file.languages {
            let languages: Vec<Language> = names
                .iter()
                .filter_map(|name| match name.as_str() {
                    "python" => Some(Language::Python),
                    "c" => Some(Language::C),
                    "cpp" => Some(Language::Cpp),
                    _ => None,
                })
                .collect();
            if !languages.is_empty() {
                self.language_filter = Some(languages);
            }
        }
        Ok(self)
    }
}

/// On-disk project configuration (`.foldlight.toml`)
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    min_region_lines: Option<usize>,
    #[serde(default)]
    languages: Option<Vec<String>>,
}

/// Combined ignore rules: default skip dirs, hidden-file policy, explicit
/// glob patterns, and an optional gitignore file. Paths are checked relative
/// to the project root.
pub struct IgnoreFilter {
    globs: GlobSet,
    gitignore: Option<Gitignore>,
    include_hidden: bool,
}

impl IgnoreFilter {
    pub fn new(config: &AnalyzeConfig) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            builder.add(Glob::new(pattern)?);
        }
        let globs = builder.build()?;

        let ignore_path = config
            .ignore_file
            .clone()
            .or_else(|| Some(config.root.join(".gitignore")))
            .filter(|p| p.exists());
        let gitignore = match ignore_path {
            Some(path) => {
                let mut gb = GitignoreBuilder::new(&config.root);
                if let Some(err) = gb.add(&path) {
                    return Err(err.into());
                }
                Some(gb.build()?)
            }
            None => None,
        };

        Ok(Self {
            globs,
            gitignore,
            include_hidden: config.include_hidden,
        })
    }

    /// Whether a root-relative path should be skipped
    pub fn should_ignore(&self, relative: &Path, is_dir: bool) -> bool {
        for component in relative.components() {
            if let std::path::Component::Normal(name) = component {
                let name = name.to_string_lossy();
                if DEFAULT_SKIP_DIRS.contains(&name.as_ref()) {
                    return true;
                }
                if !self.include_hidden && name.starts_with('.') {
                    return true;
                }
            }
        }
        if self.globs.is_match(relative) {
            return true;
        }
        if let Some(gitignore) = &self.gitignore {
            if gitignore.matched(relative, is_dir).is_ignore() {
                return true;
            }
        }
        false
    }

    /// Whether a path passes the language filter
    pub fn matches_language_filter(
        &self,
        path: &Path,
        filter: &Option<Vec<Language>>,
    ) -> bool {
        match filter {
            None => true,
            Some(languages) => Language::from_path(path)
                .map(|l| languages.contains(&l))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skip_dirs() {
        let filter = IgnoreFilter::new(&AnalyzeConfig::default()).unwrap();
        assert!(filter.should_ignore(Path::new("__pycache__/mod.py"), false));
        assert!(filter.should_ignore(Path::new(".git/config"), false));
        assert!(!filter.should_ignore(Path::new("src/main.py"), false));
    }

    #[test]
    fn test_hidden_files_skipped_by_default() {
        let filter = IgnoreFilter::new(&AnalyzeConfig::default()).unwrap();
        assert!(filter.should_ignore(Path::new(".hidden.py"), false));

        let config = AnalyzeConfig::default().with_include_hidden(true);
        let filter = IgnoreFilter::new(&config).unwrap();
        assert!(!filter.should_ignore(Path::new(".hidden.py"), false));
    }

    #[test]
    fn test_custom_ignore_patterns() {
        let config =
            AnalyzeConfig::default().with_ignore_patterns(vec!["**/generated_*.py".to_string()]);
        let filter = IgnoreFilter::new(&config).unwrap();
        assert!(filter.should_ignore(Path::new("src/generated_api.py"), false));
        assert!(!filter.should_ignore(Path::new("src/api.py"), false));
    }

    #[test]
    fn test_language_filter() {
        let filter = IgnoreFilter::new(&AnalyzeConfig::default()).unwrap();
        let only_python = Some(vec![Language::Python]);
        assert!(filter.matches_language_filter(Path::new("a.py"), &only_python));
        assert!(!filter.matches_language_filter(Path::new("a.c"), &only_python));
        assert!(filter.matches_language_filter(Path::new("a.c"), &None));
    }

    #[test]
    fn test_project_file_merges() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".foldlight.toml"),
            "ignore = [\"gen/**\"]\nmin_region_lines = 5\nlanguages = [\"python\"]\n",
        )
        .unwrap();

        let config = AnalyzeConfig::new(dir.path().to_path_buf())
            .load_project_file()
            .unwrap();
        assert_eq!(config.min_region_lines, 5);
        assert_eq!(config.ignore_patterns, vec!["gen/**".to_string()]);
        assert_eq!(config.language_filter, Some(vec![Language::Python]));
    }
}
