//! Foldlight Core Library
//!
//! Heuristic source-structure analysis for editors: fold regions and
//! syntax-highlight token spans for Python and C/C++ sources.
//!
//! # Features
//!
//! - Indentation scanner for Python: functions, classes, and `:`-introduced
//!   blocks recovered from leading-whitespace width via a LIFO stack
//! - Character-level scanner for C/C++: string/comment state threaded across
//!   lines, brace regions opened by a keyword/signature heuristic
//! - Anchored fold regions: collapse state survives edits that leave a
//!   region's header line intact
//! - Byte-exact fold elision and restoration against a rope-backed buffer
//! - Span-exact style tagging driven by the token stream, never by text search
//! - Version-stamped, cancellable background analysis; stale results are
//!   discarded instead of applied
//! - Project-tree scanning with ignore rules and JSON/YAML/summary output
//!
//! # Example
//!
//! ```
//! use foldlight_core::{Analyzer, Language, SourceSnapshot};
//!
//! let mut analyzer = Analyzer::new(Some(Language::Python)).unwrap();
//! let snapshot = SourceSnapshot::from_text(1, "def greet():\n    print('hi')\n");
//! let result = analyzer.analyze(&snapshot);
//! assert_eq!(result.regions.len(), 1);
//! ```

pub mod buffer;
pub mod config;
pub mod engine;
pub mod fold_store;
pub mod highlight;
pub mod models;
pub mod output;
pub mod scanners;

// Re-exports for convenience
pub use buffer::{BufferAdapter, EditorBuffer};
pub use config::{AnalyzeConfig, ConfigError, IgnoreFilter};
pub use engine::{AnalysisScheduler, Analyzer, ProjectScanner, ScanError};
pub use fold_store::{FoldStore, ToggleOutcome, PLACEHOLDER};
pub use highlight::{
    apply_overlays, render_ansi, style_color, HighlightTagger, OverlayRenderer, StyleTag,
};
pub use models::*;
pub use output::{format_output, format_output_grouped, format_summary, FormatError, OutputFormat};
pub use scanners::{create_scanner, CancelFlag, Scanner, ScannerError};
