use crate::fold_store::FoldStore;
use crate::models::{AnalysisResult, AnchorId, FoldKind, LineCol, SourceSnapshot, Token, TokenKind};
use termcolor::Color;

/// A single tagging instruction: attach the style for `class` to exactly
/// this span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTag {
    pub class: TokenKind,
    pub start: LineCol,
    pub end: LineCol,
}

/// Sink for overlay instructions, implemented by the rendering side
pub trait OverlayRenderer {
    fn apply_fold_marker(&mut self, anchor: AnchorId, glyph: char, line: usize);
    fn remove_fold_marker(&mut self, anchor: AnchorId);
    fn apply_style_tag(&mut self, class: TokenKind, start: LineCol, end: LineCol);
    fn clear_style_tags(&mut self);
}

/// Display color of a token class, as a hex string
pub fn style_color(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Keyword => "#0000FF",
        TokenKind::ClassName => "#267F99",
        TokenKind::FunctionName => "#795E26",
        TokenKind::BuiltinName => "#267F99",
        TokenKind::String => "#A31515",
        TokenKind::Comment => "#008000",
        TokenKind::Number => "#098658",
        TokenKind::Operator => "#000000",
        TokenKind::Punctuation => "#000000",
        TokenKind::Default => "#000000",
    }
}

pub fn style_rgb(kind: TokenKind) -> (u8, u8, u8) {
    match kind {
        TokenKind::Keyword => (0x00, 0x00, 0xFF),
        TokenKind::ClassName | TokenKind::BuiltinName => (0x26, 0x7F, 0x99),
        TokenKind::FunctionName => (0x79, 0x5E, 0x26),
        TokenKind::String => (0xA3, 0x15, 0x15),
        TokenKind::Comment => (0x00, 0x80, 0x00),
        TokenKind::Number => (0x09, 0x86, 0x58),
        TokenKind::Operator | TokenKind::Punctuation | TokenKind::Default => (0x00, 0x00, 0x00),
    }
}

pub fn terminal_color(kind: TokenKind) -> Color {
    let (r, g, b) = style_rgb(kind);
    Color::Rgb(r, g, b)
}

/// Fold-marker color per region kind
pub fn fold_marker_color(kind: FoldKind) -> Color {
    match kind {
        FoldKind::Function => Color::Blue,
        FoldKind::Class => Color::Green,
        FoldKind::Block => Color::Yellow,
    }
}

/// Maps the token stream to style classes and emits exact-span tagging
/// instructions.
///
/// Tags attach to the spans the scanner reported; rendered text is never
/// re-searched, so equal-content tokens elsewhere in the buffer are never
/// mistagged.
pub struct HighlightTagger;

impl HighlightTagger {
    pub fn new() -> Self {
        Self
    }

    pub fn tags(&self, tokens: &[Token]) -> Vec<StyleTag> {
        tokens
            .iter()
            .map(|t| StyleTag {
                class: t.kind,
                start: t.start,
                end: t.end,
            })
            .collect()
    }

    pub fn apply(&self, tokens: &[Token], renderer: &mut dyn OverlayRenderer) {
        renderer.clear_style_tags();
        for token in tokens {
            renderer.apply_style_tag(token.kind, token.start, token.end);
        }
    }
}

impl Default for HighlightTagger {
    fn default() -> Self {
        Self::new()
    }
}

/// Push a full analysis pass to the overlay renderer: style tags for every
/// token, then a fold marker per region with the current collapse glyph.
pub fn apply_overlays(
    result: &AnalysisResult,
    store: &FoldStore,
    renderer: &mut dyn OverlayRenderer,
) {
    HighlightTagger::new().apply(&result.tokens, renderer);
    for region in &result.regions {
        renderer.apply_fold_marker(region.anchor, store.glyph(region.anchor), region.start_line);
    }
}

/// Render a snapshot to a string with ANSI truecolor styling driven by the
/// token stream. Black-on-default classes are left unstyled.
pub fn render_ansi(snapshot: &SourceSnapshot, tokens: &[Token]) -> String {
    const RESET: &str = "\x1b[0m";

    let mut out = String::new();
    let mut cursor = 0;

    for (idx, line) in snapshot.iter_lines().enumerate() {
        let line_no = idx + 1;
        let chars: Vec<char> = line.chars().collect();
        let mut col = 0;

        while cursor < tokens.len() && tokens[cursor].start.line < line_no {
            cursor += 1;
        }
        let mut i = cursor;
        while i < tokens.len() && tokens[i].start.line == line_no {
            let token = &tokens[i];
            if token.start.col > col {
                out.extend(&chars[col..token.start.col]);
            }
            let end = token.end.col.min(chars.len());
            let (r, g, b) = style_rgb(token.kind);
            if (r, g, b) == (0, 0, 0) {
                out.extend(&chars[token.start.col..end]);
            } else {
                out.push_str(&format!("\x1b[38;2;{};{};{}m", r, g, b));
                out.extend(&chars[token.start.col..end]);
                out.push_str(RESET);
            }
            col = end;
            i += 1;
        }
        if col < chars.len() {
            out.extend(&chars[col..]);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingRenderer {
        tags: Vec<StyleTag>,
        markers: Vec<(AnchorId, char, usize)>,
        cleared: usize,
    }

    impl OverlayRenderer for RecordingRenderer {
        fn apply_fold_marker(&mut self, anchor: AnchorId, glyph: char, line: usize) {
            self.markers.push((anchor, glyph, line));
        }

        fn remove_fold_marker(&mut self, anchor: AnchorId) {
            self.markers.retain(|(a, _, _)| *a != anchor);
        }

        fn apply_style_tag(&mut self, class: TokenKind, start: LineCol, end: LineCol) {
            self.tags.push(StyleTag { class, start, end });
        }

        fn clear_style_tags(&mut self) {
            self.cleared += 1;
            self.tags.clear();
        }
    }

    fn python_tokens(source: &str) -> Vec<Token> {
        use crate::scanners::{CancelFlag, IndentScanner, Scanner};
        IndentScanner::new()
            .scan(&SourceSnapshot::from_text(1, source), &CancelFlag::new())
            .unwrap()
            .tokens
    }

    #[test]
    fn test_each_occurrence_tagged_at_its_own_span() {
        let tokens = python_tokens("foo(foo)\n");
        let mut renderer = RecordingRenderer::default();
        HighlightTagger::new().apply(&tokens, &mut renderer);

        let foo_tags: Vec<&StyleTag> = renderer
            .tags
            .iter()
            .filter(|t| t.end.col - t.start.col == 3)
            .collect();
        assert_eq!(foo_tags.len(), 2);
        assert_eq!(foo_tags[0].class, TokenKind::FunctionName);
        assert_eq!(foo_tags[0].start, LineCol::new(1, 0));
        assert_eq!(foo_tags[1].class, TokenKind::Default);
        assert_eq!(foo_tags[1].start, LineCol::new(1, 4));
    }

    #[test]
    fn test_apply_clears_previous_tags() {
        let tokens = python_tokens("x = 1\n");
        let mut renderer = RecordingRenderer::default();
        let tagger = HighlightTagger::new();
        tagger.apply(&tokens, &mut renderer);
        tagger.apply(&tokens, &mut renderer);
        assert_eq!(renderer.cleared, 2);
        assert_eq!(renderer.tags.len(), tokens.len());
    }

    #[test]
    fn test_overlays_include_fold_markers() {
        use crate::engine::Analyzer;
        use crate::models::Language;

        let snapshot = SourceSnapshot::from_text(1, "def foo():\n    pass\n");
        let mut analyzer = Analyzer::new(Some(Language::Python)).unwrap();
        let result = analyzer.analyze(&snapshot);
        let mut store = FoldStore::new();
        store.apply_result(&result);

        let mut renderer = RecordingRenderer::default();
        apply_overlays(&result, &store, &mut renderer);
        assert_eq!(renderer.markers.len(), 1);
        let (anchor, glyph, line) = renderer.markers[0];
        assert_eq!(anchor, result.regions[0].anchor);
        assert_eq!(glyph, '-');
        assert_eq!(line, 1);
    }

    #[test]
    fn test_render_ansi_styles_keywords_only_where_needed() {
        let snapshot = SourceSnapshot::from_text(1, "def foo():\n");
        let tokens = python_tokens("def foo():\n");
        let rendered = render_ansi(&snapshot, &tokens);
        assert!(rendered.contains("\x1b[38;2;0;0;255mdef\x1b[0m"));
        // Punctuation stays unstyled
        assert!(rendered.contains("():"));
    }

    #[test]
    fn test_style_table_matches_token_kinds() {
        assert_eq!(style_color(TokenKind::Keyword), "#0000FF");
        assert_eq!(style_color(TokenKind::String), "#A31515");
        assert_eq!(style_color(TokenKind::Comment), "#008000");
        assert_eq!(terminal_color(TokenKind::Number), Color::Rgb(0x09, 0x86, 0x58));
    }
}
