use crate::models::{AnalysisResult, AnchorId, FoldRegion, Language, SourceSnapshot};
use crate::scanners::{create_scanner, CancelFlag, Scanner, ScannerError};
use rustc_hash::{FxHashMap, FxHasher};
use std::collections::VecDeque;
use std::hash::Hasher;
use std::path::Path;

/// Orchestrates the scanner for a declared language and turns raw scanner
/// output into an ordered, anchored region forest.
///
/// Regions are sorted by `(start ascending, end descending)` so a parent
/// always precedes its children when rendered outer-to-inner. Anchors are
/// matched against the previous pass by `(kind, header-line content hash)`;
/// a match carries the prior anchor forward so collapse state survives edits
/// that leave the header line intact.
pub struct Analyzer {
    language: Option<Language>,
    scanner: Option<Box<dyn Scanner + Send>>,
    next_anchor: u64,
    previous: Vec<FoldRegion>,
}

impl Analyzer {
    /// Create an analyzer for a declared language. `None` means unsupported:
    /// every pass returns the empty result rather than an error.
    pub fn new(language: Option<Language>) -> Result<Self, ScannerError> {
        let scanner = match language {
            Some(lang) => Some(create_scanner(lang)?),
            None => None,
        };
        Ok(Self {
            language,
            scanner,
            next_anchor: 1,
            previous: Vec::new(),
        })
    }

    /// Create an analyzer with the language detected from a file extension
    pub fn for_path(path: &Path) -> Result<Self, ScannerError> {
        Self::new(Language::from_path(path))
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    /// Run one full pass over a snapshot
    pub fn analyze(&mut self, snapshot: &SourceSnapshot) -> AnalysisResult {
        let cancel = CancelFlag::new();
        match self.analyze_cancellable(snapshot, &cancel) {
            Some(result) => result,
            None => AnalysisResult::empty(snapshot.version(), self.language),
        }
    }

    /// Run one pass, bailing out with `None` if `cancel` is raised mid-scan.
    /// A cancelled pass leaves the previous pass's anchor state untouched.
    pub fn analyze_cancellable(
        &mut self,
        snapshot: &SourceSnapshot,
        cancel: &CancelFlag,
    ) -> Option<AnalysisResult> {
        let scanner = match self.scanner.as_mut() {
            Some(s) => s,
            None => return Some(AnalysisResult::empty(snapshot.version(), None)),
        };

        let output = scanner.scan(snapshot, cancel)?;

        // Hand out anchors: matched regions keep their prior id, new regions
        // get fresh ones. Duplicate headers are matched in order.
        let mut pool: FxHashMap<(crate::models::FoldKind, u64), VecDeque<AnchorId>> =
            FxHashMap::default();
        for prev in &self.previous {
            pool.entry((prev.kind, prev.header_hash))
                .or_default()
                .push_back(prev.anchor);
        }

        let mut regions = Vec::with_capacity(output.regions.len());
        for raw in &output.regions {
            let header = snapshot.line(raw.start_line).unwrap_or("");
            let header_hash = hash_header(header);
            let anchor = match pool
                .get_mut(&(raw.kind, header_hash))
                .and_then(|queue| queue.pop_front())
            {
                Some(prior) => prior,
                None => {
                    let id = AnchorId(self.next_anchor);
                    self.next_anchor += 1;
                    id
                }
            };
            regions.push(FoldRegion {
                kind: raw.kind,
                start_line: raw.start_line,
                end_line: raw.end_line,
                anchor,
                header_hash,
            });
        }

        regions.sort_by(|a, b| {
            a.start_line
                .cmp(&b.start_line)
                .then(b.end_line.cmp(&a.end_line))
        });

        let dropped = pool.values().map(|q| q.len()).sum::<usize>();
        if dropped > 0 {
            tracing::debug!(dropped, version = snapshot.version(), "anchors invalidated");
        }

        self.previous = regions.clone();

        Some(AnalysisResult {
            version: snapshot.version(),
            language: self.language,
            regions,
            tokens: output.tokens,
            diagnostics: output.diagnostics,
        })
    }
}

fn hash_header(header: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(header.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FoldKind;

    fn analyzer(language: Language) -> Analyzer {
        Analyzer::new(Some(language)).unwrap()
    }

    #[test]
    fn test_single_function_region() {
        let mut a = analyzer(Language::Python);
        let result = a.analyze(&SourceSnapshot::from_text(1, "def foo():\n    pass\n"));
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.regions[0].kind, FoldKind::Function);
        assert_eq!(result.regions[0].start_line, 1);
        assert_eq!(result.regions[0].end_line, 2);
    }

    #[test]
    fn test_parent_ordered_before_child() {
        let mut a = analyzer(Language::Python);
        let result = a.analyze(&SourceSnapshot::from_text(
            1,
            "class C:\n    def m(self):\n        pass\n",
        ));
        assert_eq!(result.regions.len(), 2);
        assert_eq!(result.regions[0].kind, FoldKind::Class);
        assert_eq!((result.regions[0].start_line, result.regions[0].end_line), (1, 3));
        assert_eq!(result.regions[1].kind, FoldKind::Function);
        assert_eq!((result.regions[1].start_line, result.regions[1].end_line), (2, 3));
    }

    #[test]
    fn test_brace_block_region() {
        let mut a = analyzer(Language::C);
        let result = a.analyze(&SourceSnapshot::from_text(1, "void f() {\n  int x;\n}\n"));
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.regions[0].kind, FoldKind::Block);
        assert_eq!((result.regions[0].start_line, result.regions[0].end_line), (1, 3));
    }

    #[test]
    fn test_reanalysis_is_idempotent() {
        let mut a = analyzer(Language::Python);
        let snapshot = SourceSnapshot::from_text(1, "class C:\n    def m(self):\n        pass\n");
        let first = a.analyze(&snapshot);
        let second = a.analyze(&snapshot);
        assert_eq!(first.regions, second.regions);
    }

    #[test]
    fn test_anchor_survives_body_edit() {
        let mut a = analyzer(Language::Python);
        let first = a.analyze(&SourceSnapshot::from_text(1, "def foo():\n    pass\n"));
        let second = a.analyze(&SourceSnapshot::from_text(
            2,
            "def foo():\n    x = 1\n    pass\n",
        ));
        assert_eq!(first.regions[0].anchor, second.regions[0].anchor);
        assert_eq!(second.regions[0].end_line, 3);
    }

    #[test]
    fn test_new_region_gets_fresh_anchor() {
        let mut a = analyzer(Language::Python);
        let first = a.analyze(&SourceSnapshot::from_text(1, "def foo():\n    pass\n"));
        let second = a.analyze(&SourceSnapshot::from_text(
            2,
            "def foo():\n    pass\ndef bar():\n    pass\n",
        ));
        let foo_anchor = first.regions[0].anchor;
        let anchors: Vec<_> = second.regions.iter().map(|r| r.anchor).collect();
        assert!(anchors.contains(&foo_anchor));
        assert_eq!(anchors.iter().filter(|a| **a == foo_anchor).count(), 1);
    }

    #[test]
    fn test_unknown_language_is_a_noop() {
        let mut a = Analyzer::new(None).unwrap();
        let result = a.analyze(&SourceSnapshot::from_text(1, "def foo():\n    pass\n"));
        assert!(result.regions.is_empty());
        assert!(result.tokens.is_empty());
    }

    #[test]
    fn test_tokens_flow_through() {
        let mut a = analyzer(Language::Python);
        let result = a.analyze(&SourceSnapshot::from_text(1, "x = 1\n"));
        assert!(!result.tokens.is_empty());
        assert_eq!(result.version, 1);
    }
}
