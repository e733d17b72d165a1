use crate::config::{AnalyzeConfig, ConfigError, IgnoreFilter};
use crate::engine::Analyzer;
use crate::models::{
    AnalysisMetadata, FoldStats, Language, ProjectMap, SourceFile, SourceSnapshot,
};
use crate::scanners::ScannerError;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Scanner error: {0}")]
    ScannerError(#[from] ScannerError),
    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFile(PathBuf),
}

/// Analyzes every supported source file under a project root
pub struct ProjectScanner {
    config: AnalyzeConfig,
    ignore_filter: IgnoreFilter,
}

impl ProjectScanner {
    pub fn new(config: AnalyzeConfig) -> Result<Self, ScanError> {
        let ignore_filter = IgnoreFilter::new(&config)?;
        Ok(Self {
            config,
            ignore_filter,
        })
    }

    /// Scan the project and return the aggregated map
    pub fn scan(&self) -> Result<ProjectMap, ScanError> {
        let start = Instant::now();

        let source_files = self.find_source_files()?;

        let files: Vec<SourceFile> = if self.config.threads == 1 {
            source_files
                .iter()
                .map(|(path, lang)| self.analyze_file(path, *lang))
                .collect()
        } else {
            let pool = if self.config.threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.threads)
                    .build()
                    .ok()
            } else {
                None
            };

            match pool {
                Some(pool) => pool.install(|| {
                    source_files
                        .par_iter()
                        .map(|(path, lang)| self.analyze_file(path, *lang))
                        .collect()
                }),
                None => source_files
                    .par_iter()
                    .map(|(path, lang)| self.analyze_file(path, *lang))
                    .collect(),
            }
        };

        let stats = self.calculate_stats(&files);

        let duration = start.elapsed();
        let metadata = AnalysisMetadata {
            scan_duration_ms: duration.as_millis() as u64,
            files_per_second: if duration.as_secs_f64() > 0.0 {
                files.len() as f64 / duration.as_secs_f64()
            } else {
                0.0
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(ProjectMap {
            root: self.config.root.clone(),
            files,
            stats,
            metadata,
        })
    }

    /// Analyze a single file
    pub fn scan_file(&self, path: &Path) -> Result<SourceFile, ScanError> {
        let language = Language::from_path(path)
            .ok_or_else(|| ScanError::UnsupportedFile(path.to_path_buf()))?;
        Ok(self.analyze_file(path, language))
    }

    /// Find all source files matching the ignore rules and language filter
    fn find_source_files(&self) -> Result<Vec<(PathBuf, Language)>, ScanError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.root)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if entry.file_type().is_dir() {
                continue;
            }

            let relative = path.strip_prefix(&self.config.root).unwrap_or(path);
            if self.ignore_filter.should_ignore(relative, false) {
                continue;
            }
            if !self
                .ignore_filter
                .matches_language_filter(path, &self.config.language_filter)
            {
                continue;
            }

            if let Some(language) = Language::from_path(path) {
                files.push((path.to_path_buf(), language));
            }
        }

        Ok(files)
    }

    fn analyze_file(&self, path: &Path, language: Language) -> SourceFile {
        let relative_path = path
            .strip_prefix(&self.config.root)
            .unwrap_or(path)
            .to_path_buf();

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                return SourceFile {
                    path: relative_path,
                    absolute_path: path.to_path_buf(),
                    language,
                    regions: vec![],
                    token_count: 0,
                    line_count: 0,
                    analyzed: false,
                    error: Some(e.to_string()),
                };
            }
        };

        let snapshot = SourceSnapshot::from_text(1, &content);
        let line_count = snapshot.line_count();

        let mut analyzer = match Analyzer::new(Some(language)) {
            Ok(a) => a,
            Err(e) => {
                return SourceFile {
                    path: relative_path,
                    absolute_path: path.to_path_buf(),
                    language,
                    regions: vec![],
                    token_count: 0,
                    line_count,
                    analyzed: false,
                    error: Some(e.to_string()),
                };
            }
        };

        let result = analyzer.analyze(&snapshot);
        let mut regions = result.regions;
        regions.retain(|r| r.line_count() >= self.config.min_region_lines);

        SourceFile {
            path: relative_path,
            absolute_path: path.to_path_buf(),
            language,
            regions,
            token_count: result.tokens.len(),
            line_count,
            analyzed: true,
            error: None,
        }
    }

    fn calculate_stats(&self, files: &[SourceFile]) -> FoldStats {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FoldKind;

    #[test]
    fn test_scanner_creation() {
        let config = AnalyzeConfig::default();
        let scanner = ProjectScanner::new(config);
        assert!(scanner.is_ok());
    }

    #[test]
    fn test_scan_mixed_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app.py"),
            "def main():\n    print('hi')\n    return 0\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("util.c"),
            "int add(int a, int b) {\n  return a + b;\n}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not source\n").unwrap();

        let scanner = ProjectScanner::new(AnalyzeConfig::new(dir.path().to_path_buf())).unwrap();
        let map = scanner.scan().unwrap();

        assert_eq!(map.stats.total_files, 2);
        assert_eq!(map.stats.python_files, 1);
        assert_eq!(map.stats.c_files, 1);
        assert_eq!(map.stats.total_regions, 2);
        assert_eq!(map.stats.function_regions, 1);
        assert_eq!(map.stats.block_regions, 1);
    }

    #[test]
    fn test_min_region_lines_filters_small_regions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def tiny():\n    pass\n").unwrap();

        let config = AnalyzeConfig::new(dir.path().to_path_buf()).with_min_region_lines(5);
        let scanner = ProjectScanner::new(config).unwrap();
        let map = scanner.scan().unwrap();
        assert_eq!(map.stats.total_regions, 0);
    }

    #[test]
    fn test_scan_file_unsupported_extension() {
        let scanner = ProjectScanner::new(AnalyzeConfig::default()).unwrap();
        let err = scanner.scan_file(Path::new("README.md")).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedFile(_)));
    }

    #[test]
    fn test_scan_file_reports_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.py");
        std::fs::write(&path, "class C:\n    def m(self):\n        pass\n").unwrap();

        let scanner = ProjectScanner::new(AnalyzeConfig::default()).unwrap();
        let file = scanner.scan_file(&path).unwrap();
        assert!(file.analyzed);
        assert_eq!(file.regions.len(), 2);
        assert_eq!(file.regions[0].kind, FoldKind::Class);
    }
}
