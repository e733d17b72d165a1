use crate::models::SourceSnapshot;
use ropey::Rope;
use std::ops::Range;

/// Callback fired after every committed edit: `(new_version, edited_lines)`
pub type ChangeListener = Box<dyn FnMut(u64, Range<usize>) + Send>;

/// Read access to the editing surface, as the analysis side sees it
pub trait BufferAdapter {
    fn full_text(&self) -> String;
    /// Line text by 1-indexed line number, without the trailing newline
    fn line(&self, line: usize) -> Option<String>;
    fn line_count(&self) -> usize;
}

/// Rope-backed text buffer with a version counter.
///
/// Every committed edit bumps the version and fires the change listeners;
/// analysis works on immutable [`SourceSnapshot`]s taken from it, never on
/// the live buffer. Fold elision goes through [`splice`](Self::splice), which
/// rewrites text without bumping the version: collapsing is presentation, not
/// an edit.
pub struct EditorBuffer {
    rope: Rope,
    version: u64,
    listeners: Vec<ChangeListener>,
}

impl EditorBuffer {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            version: 1,
            listeners: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Take an immutable snapshot of the current text at the current version
    pub fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot::from_text(self.version, &self.rope.to_string())
    }

    /// Subscribe to committed edits
    pub fn on_change(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    /// Replace lines `start..=end` (1-indexed, inclusive) with `text`,
    /// committing an edit: the version advances and listeners fire.
    pub fn replace_lines(&mut self, start: usize, end: usize, text: &str) {
        let range = self.char_range_of_lines(start, end);
        self.rope.remove(range.clone());
        self.rope.insert(range.start, text);
        self.version += 1;
        let version = self.version;
        for listener in &mut self.listeners {
            listener(version, start..end + 1);
        }
    }

    /// Replace the whole buffer, committing an edit
    pub fn set_text(&mut self, text: &str) {
        let end = self.line_count().max(1);
        self.rope = Rope::from_str(text);
        self.version += 1;
        let version = self.version;
        for listener in &mut self.listeners {
            listener(version, 1..end + 1);
        }
    }

    /// Rewrite a character range without committing an edit. Returns the
    /// removed text. Fold collapse/expand plumbing only.
    pub fn splice(&mut self, range: Range<usize>, text: &str) -> String {
        let removed = self.rope.slice(range.clone()).to_string();
        self.rope.remove(range.clone());
        self.rope.insert(range.start, text);
        removed
    }

    /// Character range covering lines `start..=end` (1-indexed, inclusive),
    /// including the trailing newline of `end` when present.
    pub fn char_range_of_lines(&self, start: usize, end: usize) -> Range<usize> {
        let from = self.char_index_of_line(start);
        let to = self.char_index_of_line(end + 1);
        from..to
    }

    /// Character index of the start of a 1-indexed line; the end of the
    /// buffer for lines past the last.
    pub fn char_index_of_line(&self, line: usize) -> usize {
        let idx = line.saturating_sub(1);
        if idx >= self.rope.len_lines() {
            self.rope.len_chars()
        } else {
            self.rope.line_to_char(idx)
        }
    }

    pub fn slice(&self, range: Range<usize>) -> String {
        self.rope.slice(range).to_string()
    }
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferAdapter for EditorBuffer {
    fn full_text(&self) -> String {
        self.rope.to_string()
    }

    fn line(&self, line: usize) -> Option<String> {
        if line == 0 || line > self.line_count() {
            return None;
        }
        let text = self.rope.line(line - 1).to_string();
        Some(text.trim_end_matches(['\n', '\r']).to_string())
    }

    fn line_count(&self) -> usize {
        let len = self.rope.len_chars();
        if len == 0 {
            return 0;
        }
        if self.rope.char(len - 1) == '\n' {
            self.rope.len_lines() - 1
        } else {
            self.rope.len_lines()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_snapshot_matches_buffer() {
        let buffer = EditorBuffer::from_text("a\nb\nc\n");
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.version(), 1);
        assert_eq!(snapshot.line_count(), 3);
        assert_eq!(snapshot.line(2), Some("b"));
    }

    #[test]
    fn test_edit_bumps_version_and_notifies() {
        let mut buffer = EditorBuffer::from_text("a\nb\nc\n");
        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = Arc::clone(&seen);
        buffer.on_change(Box::new(move |version, _lines| {
            seen_clone.store(version, Ordering::SeqCst);
        }));

        buffer.replace_lines(2, 2, "B\n");
        assert_eq!(buffer.version(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(buffer.full_text(), "a\nB\nc\n");
    }

    #[test]
    fn test_snapshot_is_immutable_after_edit() {
        let mut buffer = EditorBuffer::from_text("a\nb\n");
        let snapshot = buffer.snapshot();
        buffer.replace_lines(1, 1, "X\n");
        assert_eq!(snapshot.line(1), Some("a"));
        assert_eq!(buffer.line(1).as_deref(), Some("X"));
    }

    #[test]
    fn test_splice_does_not_bump_version() {
        let mut buffer = EditorBuffer::from_text("a\nb\nc\n");
        let removed = buffer.splice(2..4, "Z\n");
        assert_eq!(removed, "b\n");
        assert_eq!(buffer.version(), 1);
        assert_eq!(buffer.full_text(), "a\nZ\nc\n");
    }

    #[test]
    fn test_line_count_without_trailing_newline() {
        let buffer = EditorBuffer::from_text("a\nb");
        assert_eq!(buffer.line_count(), 2);
        assert_eq!(buffer.line(2).as_deref(), Some("b"));
        assert_eq!(buffer.line(3), None);
    }
}
