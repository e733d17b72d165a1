mod json;
mod yaml;

pub use json::to_json;
pub use yaml::to_yaml;

use crate::models::{GroupedProjectMap, LanguageSection, ProjectMap};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Summary,
    Ansi,
}

/// Format a ProjectMap according to the specified format (flat structure)
pub fn format_output(map: &ProjectMap, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(map),
        OutputFormat::Yaml => to_yaml(map),
        OutputFormat::Summary => Ok(format_summary(map)),
        OutputFormat::Ansi => Ok(format_summary_ansi(map)),
    }
}

/// Format a ProjectMap grouped by language family (python / native sections)
pub fn format_output_grouped(
    map: &ProjectMap,
    format: OutputFormat,
) -> Result<String, FormatError> {
    let grouped = map.to_grouped();
    match format {
        OutputFormat::Json => to_json_grouped(&grouped),
        OutputFormat::Yaml => to_yaml_grouped(&grouped),
        OutputFormat::Summary => Ok(format_summary_grouped(&grouped)),
        OutputFormat::Ansi => Ok(format_summary_grouped_ansi(&grouped)),
    }
}

fn to_json_grouped(grouped: &GroupedProjectMap) -> Result<String, FormatError> {
    serde_json::to_string_pretty(grouped).map_err(FormatError::from)
}

fn to_yaml_grouped(grouped: &GroupedProjectMap) -> Result<String, FormatError> {
    serde_yaml::to_string(grouped).map_err(FormatError::from)
}

fn section_lines(title: &str, section: &LanguageSection) -> String {
    let mut output = String::new();

    output.push_str(&format!("## {}\n", title));
    output.push_str(&format!(
        "Files: {} | Lines: {} | Foldable: {}\n\
         Regions: {} (functions: {}, classes: {}, blocks: {})\n",
        section.stats.total_files,
        section.stats.total_lines,
        section.stats.foldable_lines,
        section.stats.total_regions,
        section.stats.function_regions,
        section.stats.class_regions,
        section.stats.block_regions,
    ));

    let mut files_by_regions: Vec<_> = section
        .files
        .iter()
        .filter(|f| !f.regions.is_empty())
        .collect();
    files_by_regions.sort_by(|a, b| b.regions.len().cmp(&a.regions.len()));

    if !files_by_regions.is_empty() {
        output.push_str("Top files by regions:\n");
        for file in files_by_regions.iter().take(5) {
            output.push_str(&format!(
                "  {} ({} regions, {} lines)\n",
                file.path.display(),
                file.regions.len(),
                file.line_count
            ));
        }
    }
    output.push('\n');

    output
}

/// Plain-text summary of a full project map
pub fn format_summary(map: &ProjectMap) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Fold Analysis Summary\n\
         =====================\n\
         Root: {}\n\n\
         Files: {} (python: {}, c: {}, cpp: {})\n\
         Lines: {} | Foldable: {}\n\
         Regions: {} (functions: {}, classes: {}, blocks: {})\n\n",
        map.root.display(),
        map.stats.total_files,
        map.stats.python_files,
        map.stats.c_files,
        map.stats.cpp_files,
        map.stats.total_lines,
        map.stats.foldable_lines,
        map.stats.total_regions,
        map.stats.function_regions,
        map.stats.class_regions,
        map.stats.block_regions,
    ));

    output.push_str(&format!(
        "Scan Duration: {}ms ({:.2} files/sec)\n\
         Timestamp: {}\n\
         Tool Version: {}\n",
        map.metadata.scan_duration_ms,
        map.metadata.files_per_second,
        map.metadata.timestamp,
        map.metadata.tool_version
    ));

    output
}

fn format_summary_ansi(map: &ProjectMap) -> String {
    let bold = "\x1b[1m";
    let reset = "\x1b[0m";
    let cyan = "\x1b[36m";
    let dim = "\x1b[2m";

    format!(
        "{}{}Fold Analysis Summary{}\n\
         {}====================={}\n\
         {}Root:{} {}\n\n\
         {}Files:{} {} (python: {}, c: {}, cpp: {})\n\
         {}Regions:{} {} (functions: {}, classes: {}, blocks: {})\n\n\
         {}Scan Duration:{} {}ms ({:.2} files/sec)\n",
        bold,
        cyan,
        reset,
        cyan,
        reset,
        dim,
        reset,
        map.root.display(),
        dim,
        reset,
        map.stats.total_files,
        map.stats.python_files,
        map.stats.c_files,
        map.stats.cpp_files,
        dim,
        reset,
        map.stats.total_regions,
        map.stats.function_regions,
        map.stats.class_regions,
        map.stats.block_regions,
        dim,
        reset,
        map.metadata.scan_duration_ms,
        map.metadata.files_per_second,
    )
}

fn format_summary_grouped(grouped: &GroupedProjectMap) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Fold Analysis Summary (Grouped)\n\
         ================================\n\
         Root: {}\n\n",
        grouped.root.display()
    ));

    output.push_str(&section_lines("Python", &grouped.python));
    output.push_str(&section_lines("C / C++", &grouped.native));

    output.push_str(&format!(
        "Scan Duration: {}ms ({:.2} files/sec)\n\
         Timestamp: {}\n\
         Tool Version: {}\n",
        grouped.metadata.scan_duration_ms,
        grouped.metadata.files_per_second,
        grouped.metadata.timestamp,
        grouped.metadata.tool_version
    ));

    output
}

fn format_summary_grouped_ansi(grouped: &GroupedProjectMap) -> String {
    let bold = "\x1b[1m";
    let reset = "\x1b[0m";
    let cyan = "\x1b[36m";
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let dim = "\x1b[2m";

    let mut output = String::new();

    output.push_str(&format!(
        "{}{}Fold Analysis Summary (Grouped){}\n\
         {}================================{}\n\
         {}Root:{} {}\n\n",
        bold,
        cyan,
        reset,
        cyan,
        reset,
        dim,
        reset,
        grouped.root.display()
    ));

    for (color, title, section) in [
        (green, "Python", &grouped.python),
        (yellow, "C / C++", &grouped.native),
    ] {
        output.push_str(&format!("{}{}## {}{}\n", bold, color, title, reset));
        output.push_str(&format!(
            "{}Files:{} {} | {}Lines:{} {} | {}Foldable:{} {}\n\
             {}Regions:{} {} (functions: {}, classes: {}, blocks: {})\n\n",
            dim,
            reset,
            section.stats.total_files,
            dim,
            reset,
            section.stats.total_lines,
            dim,
            reset,
            section.stats.foldable_lines,
            dim,
            reset,
            section.stats.total_regions,
            section.stats.function_regions,
            section.stats.class_regions,
            section.stats.block_regions,
        ));
    }

    output.push_str(&format!(
        "{}Scan Duration:{} {}ms ({:.2} files/sec)\n",
        dim,
        reset,
        grouped.metadata.scan_duration_ms,
        grouped.metadata.files_per_second,
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMetadata, FoldStats};
    use std::path::PathBuf;

    fn empty_map() -> ProjectMap {
        ProjectMap {
            root: PathBuf::from("/p"),
            files: vec![],
            stats: FoldStats::default(),
            metadata: AnalysisMetadata::default(),
        }
    }

    #[test]
    fn test_format_output_json() {
        let out = format_output(&empty_map(), OutputFormat::Json).unwrap();
        assert!(out.contains("\"stats\""));
    }

    #[test]
    fn test_format_output_grouped_has_sections() {
        let out = format_output_grouped(&empty_map(), OutputFormat::Json).unwrap();
        assert!(out.contains("\"python\""));
        assert!(out.contains("\"native\""));
    }

    #[test]
    fn test_summary_mentions_root() {
        let out = format_output(&empty_map(), OutputFormat::Summary).unwrap();
        assert!(out.contains("Root: /p"));
    }
}
