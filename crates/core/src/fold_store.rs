use crate::buffer::EditorBuffer;
use crate::models::{AnalysisResult, AnchorId, FoldRegion};
use rustc_hash::{FxHashMap, FxHashSet};

/// The single line standing in for a collapsed region's body
pub const PLACEHOLDER: &str = " [...] ";

/// Collapse state for one anchor
#[derive(Debug, Clone, Default)]
struct FoldState {
    collapsed: bool,
    /// The exact text removed at collapse time; spliced back verbatim on expand
    elided: Option<String>,
    /// The exact placeholder text inserted at collapse time
    placeholder: Option<String>,
}

/// What a toggle request actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Collapsed,
    Expanded,
    /// Unknown anchor, or a region currently hidden inside another collapse
    Ignored,
}

/// Holds collapse/expand state keyed by stable anchors and performs the
/// reversible text elision against the buffer.
///
/// Collapsing captures the body lines verbatim and replaces them with a
/// single placeholder line; expanding splices the captured text back at the
/// same spot, restoring the buffer byte-exactly. Region coordinates refer to
/// the snapshot of the last applied analysis; all positions are translated
/// through the set of currently collapsed regions before touching the buffer.
pub struct FoldStore {
    regions: Vec<FoldRegion>,
    states: FxHashMap<AnchorId, FoldState>,
    placeholder: String,
}

impl FoldStore {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            states: FxHashMap::default(),
            placeholder: PLACEHOLDER.to_string(),
        }
    }

    /// Use a custom placeholder line instead of the default marker
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Regions of the last applied analysis, outer-to-inner
    pub fn regions(&self) -> &[FoldRegion] {
        &self.regions
    }

    pub fn is_collapsed(&self, anchor: AnchorId) -> bool {
        self.states.get(&anchor).map(|s| s.collapsed).unwrap_or(false)
    }

    /// Fold-marker glyph for a region: `+` when collapsed, `-` when expanded
    pub fn glyph(&self, anchor: AnchorId) -> char {
        if self.is_collapsed(anchor) {
            '+'
        } else {
            '-'
        }
    }

    /// Adopt a new analysis pass: regions are replaced, and state entries
    /// whose anchors no longer exist are invalidated and removed.
    pub fn apply_result(&mut self, result: &AnalysisResult) {
        let valid: FxHashSet<AnchorId> = result.regions.iter().map(|r| r.anchor).collect();
        let before = self.states.len();
        self.states.retain(|anchor, _| valid.contains(anchor));
        let dropped = before - self.states.len();
        if dropped > 0 {
            tracing::debug!(dropped, "fold states invalidated");
        }
        self.regions = result.regions.clone();
    }

    /// Collapse or expand the region with this anchor. A request against an
    /// anchor that is unknown, or whose region is currently hidden inside
    /// another collapse, is a logged no-op.
    pub fn toggle(&mut self, buffer: &mut EditorBuffer, anchor: AnchorId) -> ToggleOutcome {
        let region = match self.regions.iter().find(|r| r.anchor == anchor) {
            Some(r) => r.clone(),
            None => {
                tracing::debug!(anchor = anchor.0, "toggle for unknown anchor ignored");
                return ToggleOutcome::Ignored;
            }
        };

        if self.is_collapsed(anchor) {
            self.expand(buffer, &region)
        } else {
            self.collapse(buffer, &region)
        }
    }

    /// Collapse every expanded region, outer-to-inner. Regions whose body is
    /// swallowed by an outer collapse are skipped.
    pub fn fold_all(&mut self, buffer: &mut EditorBuffer) {
        let anchors: Vec<AnchorId> = self.regions.iter().map(|r| r.anchor).collect();
        for anchor in anchors {
            if !self.is_collapsed(anchor) {
                self.toggle(buffer, anchor);
            }
        }
    }

    /// Expand every collapsed region, inner-to-outer, repeating until nothing
    /// more can be expanded (collapses nested inside other collapses become
    /// reachable once their container opens).
    pub fn unfold_all(&mut self, buffer: &mut EditorBuffer) {
        loop {
            let mut changed = false;
            let anchors: Vec<AnchorId> = self.regions.iter().rev().map(|r| r.anchor).collect();
            for anchor in anchors {
                if self.is_collapsed(anchor) && self.toggle(buffer, anchor) == ToggleOutcome::Expanded
                {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn collapse(&mut self, buffer: &mut EditorBuffer, region: &FoldRegion) -> ToggleOutcome {
        if self.line_is_hidden(region.start_line) || self.is_swallowed(region) {
            tracing::debug!(anchor = region.anchor.0, "collapse of hidden region ignored");
            return ToggleOutcome::Ignored;
        }

        let header = self.display_line(region.start_line);
        let body = self.body_display_count(region);
        if body == 0 {
            tracing::debug!(anchor = region.anchor.0, "collapse of empty body ignored");
            return ToggleOutcome::Ignored;
        }

        let range = buffer.char_range_of_lines(header + 1, header + body);
        let elided = buffer.slice(range.clone());
        let placeholder = if elided.ends_with('\n') {
            format!("{}\n", self.placeholder)
        } else {
            self.placeholder.clone()
        };
        buffer.splice(range, &placeholder);

        let state = self.states.entry(region.anchor).or_default();
        state.collapsed = true;
        state.elided = Some(elided);
        state.placeholder = Some(placeholder);
        ToggleOutcome::Collapsed
    }

    fn expand(&mut self, buffer: &mut EditorBuffer, region: &FoldRegion) -> ToggleOutcome {
        if self.line_is_hidden(region.start_line) || !self.placeholder_visible(region) {
            tracing::debug!(anchor = region.anchor.0, "expand of hidden region ignored");
            return ToggleOutcome::Ignored;
        }

        let (elided, placeholder) = match self.states.get(&region.anchor) {
            Some(state) => match (state.elided.clone(), state.placeholder.clone()) {
                (Some(e), Some(p)) => (e, p),
                _ => return ToggleOutcome::Ignored,
            },
            None => return ToggleOutcome::Ignored,
        };

        let header = self.display_line(region.start_line);
        let range = buffer.char_range_of_lines(header + 1, header + 1);
        if buffer.slice(range.clone()) != placeholder {
            tracing::warn!(anchor = region.anchor.0, "placeholder not where expected");
            return ToggleOutcome::Ignored;
        }
        buffer.splice(range, &elided);

        let state = self.states.entry(region.anchor).or_default();
        state.collapsed = false;
        state.elided = None;
        state.placeholder = None;
        ToggleOutcome::Expanded
    }

    fn collapsed_regions(&self) -> impl Iterator<Item = &FoldRegion> + '_ {
        self.regions.iter().filter(|r| self.is_collapsed(r.anchor))
    }

    /// A line is hidden when it sits inside some collapsed region's body
    fn line_is_hidden(&self, line: usize) -> bool {
        self.collapsed_regions().any(|c| c.hides(line))
    }

    /// A collapsed region's placeholder is present in the buffer unless the
    /// region is contained in another collapsed region.
    fn placeholder_visible(&self, region: &FoldRegion) -> bool {
        !self
            .collapsed_regions()
            .any(|c| c.anchor != region.anchor && c.contains(region))
    }

    /// A region whose whole range sits inside another collapse cannot be
    /// toggled until its container opens.
    fn is_swallowed(&self, region: &FoldRegion) -> bool {
        self.collapsed_regions()
            .any(|c| c.anchor != region.anchor && c.contains(region))
    }

    /// Map a snapshot line to its current buffer line, accounting for every
    /// collapse before it.
    fn display_line(&self, line: usize) -> usize {
        let hidden = self.hidden_lines_through(line);
        let placeholders = self
            .collapsed_regions()
            .filter(|c| self.placeholder_visible(c) && c.start_line < line)
            .count();
        line - hidden + placeholders
    }

    /// Number of hidden lines at or before `line` (union of collapsed bodies)
    fn hidden_lines_through(&self, line: usize) -> usize {
        let mut intervals: Vec<(usize, usize)> = self
            .collapsed_regions()
            .filter(|c| c.start_line < line)
            .map(|c| (c.start_line + 1, c.end_line.min(line)))
            .filter(|(a, b)| a <= b)
            .collect();
        intervals.sort_unstable();

        let mut total = 0;
        let mut current: Option<(usize, usize)> = None;
        for (a, b) in intervals {
            match current {
                Some((ca, cb)) if a <= cb + 1 => current = Some((ca, cb.max(b))),
                Some((ca, cb)) => {
                    total += cb - ca + 1;
                    current = Some((a, b));
                }
                None => current = Some((a, b)),
            }
        }
        if let Some((ca, cb)) = current {
            total += cb - ca + 1;
        }
        total
    }

    /// How many buffer lines the body of `region` occupies right now:
    /// its visible snapshot lines plus the placeholders of collapses nested
    /// within it.
    fn body_display_count(&self, region: &FoldRegion) -> usize {
        let span = region.end_line - region.start_line;
        let hidden = {
            let mut intervals: Vec<(usize, usize)> = self
                .collapsed_regions()
                .filter(|c| c.anchor != region.anchor)
                .map(|c| {
                    (
                        (c.start_line + 1).max(region.start_line + 1),
                        c.end_line.min(region.end_line),
                    )
                })
                .filter(|(a, b)| a <= b)
                .collect();
            intervals.sort_unstable();
            let mut total = 0;
            let mut current: Option<(usize, usize)> = None;
            for (a, b) in intervals {
                match current {
                    Some((ca, cb)) if a <= cb + 1 => current = Some((ca, cb.max(b))),
                    Some((ca, cb)) => {
                        total += cb - ca + 1;
                        current = Some((a, b));
                    }
                    None => current = Some((a, b)),
                }
            }
            if let Some((ca, cb)) = current {
                total += cb - ca + 1;
            }
            total
        };
        let nested_placeholders = self
            .collapsed_regions()
            .filter(|c| {
                c.anchor != region.anchor && self.placeholder_visible(c) && region.contains(c)
            })
            .count();
        span - hidden + nested_placeholders
    }
}

impl Default for FoldStore {
    fn default() -> Self {
        Self::new()
    }
}
