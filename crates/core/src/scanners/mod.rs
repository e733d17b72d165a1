mod brace;
mod indent;

pub use brace::{BraceScanner, ScanMode, ScanState};
pub use indent::IndentScanner;

use crate::models::{Diagnostic, FoldKind, Language, SourceSnapshot, Token};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Failed to initialize scanner: {0}")]
    InitError(String),
}

/// Cooperative cancellation flag, checked between line scans. Raising it has
/// no side effects: a cancelled scan returns `None` and leaves no partial
/// output behind.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A fold region as the scanner sees it, before anchors are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRegion {
    pub kind: FoldKind,
    pub start_line: usize,
    pub end_line: usize,
}

/// Everything one pass over a snapshot produces
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub regions: Vec<RawRegion>,
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Trait for language-family scanners
pub trait Scanner {
    /// Scan a snapshot, producing fold openers/closers and classified tokens.
    /// Returns `None` if the cancel flag was raised mid-scan.
    fn scan(&mut self, snapshot: &SourceSnapshot, cancel: &CancelFlag) -> Option<ScanOutput>;

    /// The language this scanner handles
    fn language(&self) -> Language;
}

/// Create a scanner for the given language
pub fn create_scanner(language: Language) -> Result<Box<dyn Scanner + Send>, ScannerError> {
    if language.is_indent_delimited() {
        Ok(Box::new(IndentScanner::new()))
    } else {
        Ok(Box::new(BraceScanner::new(language)?))
    }
}
