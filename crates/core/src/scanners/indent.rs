use crate::models::{Diagnostic, FoldKind, Language, SourceSnapshot, Token, TokenKind};

use super::{CancelFlag, RawRegion, ScanOutput, Scanner};

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const BUILTINS: &[&str] = &[
    "abs", "bool", "bytes", "dict", "enumerate", "filter", "float", "getattr", "hasattr",
    "hash", "id", "input", "int", "isinstance", "issubclass", "iter", "len", "list", "map",
    "max", "min", "next", "object", "open", "print", "range", "repr", "reversed", "round",
    "set", "setattr", "sorted", "str", "sum", "super", "tuple", "type", "zip", "Exception",
    "ValueError", "TypeError", "KeyError", "IndexError", "RuntimeError", "StopIteration",
];

/// Scanner for the indentation-delimited grammar (Python).
///
/// Block structure is recovered from leading-whitespace width alone, via a
/// LIFO stack of open headers. String and comment context is not tracked for
/// folding: a line ending in `:` inside a string is misidentified as a block
/// introducer. Known limitation, kept as-is.
pub struct IndentScanner;

impl IndentScanner {
    pub fn new() -> Self {
        Self
    }

    fn fold_line(
        &self,
        line: &str,
        line_no: usize,
        stack: &mut Vec<(FoldKind, usize, usize)>,
        regions: &mut Vec<RawRegion>,
    ) {
        let stripped = line.trim();
        let indent = line.chars().take_while(|c| c.is_whitespace()).count();

        if stripped.starts_with("class ") {
            stack.push((FoldKind::Class, line_no, indent));
        } else if stripped.starts_with("def ") || stripped.starts_with("async def ") {
            stack.push((FoldKind::Function, line_no, indent));
        } else if stripped.ends_with(':') && !stripped.starts_with('#') {
            // Block introducer: close every open header at this indent or
            // deeper, most recent first, then open the new block.
            while let Some(&(kind, start, entry_indent)) = stack.last() {
                if entry_indent < indent {
                    break;
                }
                stack.pop();
                if line_no > start {
                    regions.push(RawRegion {
                        kind,
                        start_line: start,
                        end_line: line_no,
                    });
                }
            }
            stack.push((FoldKind::Block, line_no, indent));
        }
    }
}

impl Default for IndentScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for IndentScanner {
    fn scan(&mut self, snapshot: &SourceSnapshot, cancel: &CancelFlag) -> Option<ScanOutput> {
        let mut out = ScanOutput::default();
        let mut stack: Vec<(FoldKind, usize, usize)> = Vec::new();
        let mut carry: Option<char> = None;

        for (idx, line) in snapshot.iter_lines().enumerate() {
            if cancel.is_cancelled() {
                return None;
            }
            let line_no = idx + 1;
            self.fold_line(line, line_no, &mut stack, &mut out.regions);
            tokenize_line(line, line_no, &mut carry, &mut out.tokens);
        }

        // Close every still-open header at the last line.
        let last = snapshot.line_count();
        while let Some((kind, start, _)) = stack.pop() {
            if last > start {
                out.regions.push(RawRegion {
                    kind,
                    start_line: start,
                    end_line: last,
                });
            }
        }

        if carry.is_some() {
            out.diagnostics.push(Diagnostic {
                line: last,
                message: "unterminated triple-quoted string at end of input".to_string(),
            });
        }

        Some(out)
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

/// Tokenize one line. `carry` holds the quote character of a triple-quoted
/// string left open on a previous line; spans never cross a line, so a
/// multi-line string is one `String` token per line segment.
fn tokenize_line(line: &str, line_no: usize, carry: &mut Option<char>, tokens: &mut Vec<Token>) {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut i = 0;

    if let Some(quote) = *carry {
        match find_triple(&chars, 0, quote) {
            Some(close) => {
                tokens.push(Token::new(TokenKind::String, line_no, 0, close + 3));
                *carry = None;
                i = close + 3;
            }
            None => {
                if len > 0 {
                    tokens.push(Token::new(TokenKind::String, line_no, 0, len));
                }
                return;
            }
        }
    }

    let mut prev_word: Option<String> = None;

    while i < len {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '#' {
            tokens.push(Token::new(TokenKind::Comment, line_no, i, len));
            break;
        }

        if c == '"' || c == '\'' {
            if i + 2 < len && chars[i + 1] == c && chars[i + 2] == c {
                // Triple-quoted string; may run past the end of this line
                match find_triple(&chars, i + 3, c) {
                    Some(close) => {
                        tokens.push(Token::new(TokenKind::String, line_no, i, close + 3));
                        i = close + 3;
                    }
                    None => {
                        tokens.push(Token::new(TokenKind::String, line_no, i, len));
                        *carry = Some(c);
                        break;
                    }
                }
            } else {
                // Single-line string; unterminated closes at end of line
                let mut j = i + 1;
                while j < len {
                    if chars[j] == '\\' {
                        j += 2;
                        continue;
                    }
                    if chars[j] == c {
                        j += 1;
                        break;
                    }
                    j += 1;
                }
                let end = j.min(len);
                tokens.push(Token::new(TokenKind::String, line_no, i, end));
                i = end;
            }
            prev_word = None;
            continue;
        }

        if c.is_ascii_digit() {
            let mut j = i + 1;
            while j < len && (chars[j].is_ascii_alphanumeric() || chars[j] == '.' || chars[j] == '_') {
                j += 1;
            }
            tokens.push(Token::new(TokenKind::Number, line_no, i, j));
            prev_word = None;
            i = j;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut j = i + 1;
            while j < len && (chars[j].is_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            let word: String = chars[i..j].iter().collect();
            let kind = classify_word(&word, prev_word.as_deref(), &chars, j);
            tokens.push(Token::new(kind, line_no, i, j));
            prev_word = Some(word);
            i = j;
            continue;
        }

        if "+-*/%=<>!&|^~@".contains(c) {
            tokens.push(Token::new(TokenKind::Operator, line_no, i, i + 1));
            prev_word = None;
            i += 1;
            continue;
        }

        tokens.push(Token::new(TokenKind::Punctuation, line_no, i, i + 1));
        prev_word = None;
        i += 1;
    }
}

fn classify_word(word: &str, prev_word: Option<&str>, chars: &[char], after: usize) -> TokenKind {
    if KEYWORDS.contains(&word) {
        return TokenKind::Keyword;
    }
    match prev_word {
        Some("def") => return TokenKind::FunctionName,
        Some("class") => return TokenKind::ClassName,
        _ => {}
    }
    if BUILTINS.contains(&word) {
        return TokenKind::BuiltinName;
    }
    let mut k = after;
    while k < chars.len() && chars[k].is_whitespace() {
        k += 1;
    }
    if k < chars.len() && chars[k] == '(' {
        return TokenKind::FunctionName;
    }
    TokenKind::Default
}

/// Find three consecutive `quote` characters at or after `from`, returning
/// the index of the first.
fn find_triple(chars: &[char], from: usize, quote: char) -> Option<usize> {
    if chars.len() < 3 {
        return None;
    }
    (from..=chars.len() - 3).find(|&k| chars[k] == quote && chars[k + 1] == quote && chars[k + 2] == quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> ScanOutput {
        let snapshot = SourceSnapshot::from_text(1, source);
        IndentScanner::new()
            .scan(&snapshot, &CancelFlag::new())
            .unwrap()
    }

    #[test]
    fn test_function_region() {
        let out = scan("def foo():\n    pass\n");
        assert_eq!(
            out.regions,
            vec![RawRegion {
                kind: FoldKind::Function,
                start_line: 1,
                end_line: 2
            }]
        );
    }

    #[test]
    fn test_nested_class_and_method() {
        let out = scan("class C:\n    def m(self):\n        pass\n");
        assert!(out.regions.contains(&RawRegion {
            kind: FoldKind::Class,
            start_line: 1,
            end_line: 3
        }));
        assert!(out.regions.contains(&RawRegion {
            kind: FoldKind::Function,
            start_line: 2,
            end_line: 3
        }));
        assert_eq!(out.regions.len(), 2);
    }

    #[test]
    fn test_single_line_header_no_region() {
        let out = scan("for i in range(3):\n");
        assert!(out.regions.is_empty());
    }

    #[test]
    fn test_block_introducer_closes_at_same_indent() {
        let out = scan("if a:\n    x = 1\nif b:\n    y = 2\n");
        assert_eq!(
            out.regions,
            vec![
                RawRegion {
                    kind: FoldKind::Block,
                    start_line: 1,
                    end_line: 3
                },
                RawRegion {
                    kind: FoldKind::Block,
                    start_line: 3,
                    end_line: 4
                },
            ]
        );
    }

    #[test]
    fn test_deeper_entries_close_first() {
        let out = scan("def outer():\n    if x:\n        pass\nwhile y:\n    pass\n");
        // Line 4 closes both the inner `if` (indent 4) and `outer` (indent 0),
        // inner first.
        assert_eq!(out.regions[0].start_line, 2);
        assert_eq!(out.regions[0].end_line, 4);
        assert_eq!(out.regions[1].start_line, 1);
        assert_eq!(out.regions[1].end_line, 4);
    }

    #[test]
    fn test_comment_line_is_not_an_introducer() {
        let out = scan("# setup:\nx = 1\n");
        assert!(out.regions.is_empty());
    }

    #[test]
    fn test_keyword_and_name_tokens() {
        let out = scan("def foo():\n");
        let kinds: Vec<(TokenKind, usize, usize)> = out
            .tokens
            .iter()
            .map(|t| (t.kind, t.start.col, t.end.col))
            .collect();
        assert_eq!(kinds[0], (TokenKind::Keyword, 0, 3));
        assert_eq!(kinds[1], (TokenKind::FunctionName, 4, 7));
    }

    #[test]
    fn test_call_site_and_argument_spans() {
        let out = scan("foo(foo)\n");
        let foo_tokens: Vec<&Token> = out
            .tokens
            .iter()
            .filter(|t| t.end.col - t.start.col == 3)
            .collect();
        assert_eq!(foo_tokens[0].kind, TokenKind::FunctionName);
        assert_eq!(foo_tokens[0].start.col, 0);
        assert_eq!(foo_tokens[1].kind, TokenKind::Default);
        assert_eq!(foo_tokens[1].start.col, 4);
    }

    #[test]
    fn test_comment_and_string_tokens() {
        let out = scan("x = 'hi'  # note\n");
        assert!(out
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::String && t.start.col == 4 && t.end.col == 8));
        assert!(out
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Comment && t.start.col == 10));
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let out = scan("\"\"\"\ndoc text\n\"\"\"\n");
        let strings: Vec<&Token> = out
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::String)
            .collect();
        assert_eq!(strings.len(), 3);
        assert_eq!(strings[0].start.line, 1);
        assert_eq!(strings[1].start.line, 2);
        assert_eq!(strings[1].end.col, 8);
        assert_eq!(strings[2].start.line, 3);
    }

    #[test]
    fn test_unterminated_triple_string_diagnostic() {
        let out = scan("s = \"\"\"\nstill open\n");
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.diagnostics[0].message.contains("unterminated"));
    }

    #[test]
    fn test_cancel_returns_none() {
        let snapshot = SourceSnapshot::from_text(1, "def foo():\n    pass\n");
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(IndentScanner::new().scan(&snapshot, &cancel).is_none());
    }
}
