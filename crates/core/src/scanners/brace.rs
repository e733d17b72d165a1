use crate::models::{Diagnostic, FoldKind, Language, SourceSnapshot, Token, TokenKind};
use regex::Regex;

use super::{CancelFlag, RawRegion, ScanOutput, Scanner, ScannerError};

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union",
    "unsigned", "void", "volatile", "while",
    // C++
    "bool", "catch", "class", "constexpr", "delete", "explicit", "false", "friend", "mutable",
    "namespace", "new", "noexcept", "nullptr", "operator", "override", "private", "protected",
    "public", "template", "this", "throw", "true", "try", "typename", "using", "virtual",
];

const BUILTINS: &[&str] = &[
    "printf", "fprintf", "sprintf", "scanf", "sscanf", "puts", "putchar", "getchar", "malloc",
    "calloc", "realloc", "free", "memcpy", "memmove", "memset", "strlen", "strcpy", "strncpy",
    "strcmp", "strncmp", "strcat", "fopen", "fclose", "fread", "fwrite", "fgets", "exit",
    "abort", "assert", "std", "cout", "cin", "cerr", "endl", "string", "vector", "map",
    "size_t", "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t", "uint16_t", "uint32_t",
    "uint64_t",
];

/// Keywords whose presence before a `{` marks a type or namespace body
const OPENER_KEYWORDS: &[&str] = &["class", "struct", "enum", "union", "namespace"];

/// Lexer mode carried across line boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Normal,
    InBlockComment,
    InString,
}

/// Carry-over lexer state, threaded line-to-line in original source order.
///
/// Only `InBlockComment` survives a line boundary: an unterminated string
/// implicitly closes at end of line (fail-soft), resetting the mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanState {
    pub mode: ScanMode,
    pub pending_escape: bool,
}

/// Scanner for the brace-delimited grammar family (C and C++).
///
/// A single pass over characters drives both tokenization and fold events. A
/// `{` opens a region only when the text before it (previous line plus the
/// current line up to the brace) names a type keyword or looks like a function
/// signature; the check is a substring/regex heuristic, not a grammar.
pub struct BraceScanner {
    language: Language,
    signature_re: Regex,
}

impl BraceScanner {
    pub fn new(language: Language) -> Result<Self, ScannerError> {
        let signature_re = Regex::new(r"\w+\s*\([^)]*\)\s*$")
            .map_err(|e| ScannerError::InitError(e.to_string()))?;
        Ok(Self {
            language,
            signature_re,
        })
    }

    /// Should the `{` at `col` on `line` open a fold region?
    fn brace_opens_region(&self, prev_line: &str, line_prefix: &str) -> bool {
        let context = format!("{} {}", prev_line, line_prefix);
        if OPENER_KEYWORDS.iter().any(|kw| context.contains(kw)) {
            return true;
        }
        self.signature_re.is_match(&context)
    }
}

impl Scanner for BraceScanner {
    fn scan(&mut self, snapshot: &SourceSnapshot, cancel: &CancelFlag) -> Option<ScanOutput> {
        let mut out = ScanOutput::default();
        let mut state = ScanState::default();
        let mut openers: Vec<usize> = Vec::new();
        let mut prev_line = String::new();

        for (idx, line) in snapshot.iter_lines().enumerate() {
            if cancel.is_cancelled() {
                return None;
            }
            let line_no = idx + 1;
            scan_line(
                self,
                line,
                line_no,
                &mut state,
                &mut openers,
                &prev_line,
                &mut out,
            );
            prev_line = line.to_string();
        }

        if state.mode == ScanMode::InBlockComment {
            out.diagnostics.push(Diagnostic {
                line: snapshot.line_count(),
                message: "unterminated block comment at end of input".to_string(),
            });
        }

        Some(out)
    }

    fn language(&self) -> Language {
        self.language
    }
}

fn scan_line(
    scanner: &BraceScanner,
    line: &str,
    line_no: usize,
    state: &mut ScanState,
    openers: &mut Vec<usize>,
    prev_line: &str,
    out: &mut ScanOutput,
) {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut i = 0;
    let mut string_start = 0;
    let mut prev_word: Option<String> = None;

    while i < len {
        match state.mode {
            ScanMode::InBlockComment => {
                match find_pair(&chars, i, '*', '/') {
                    Some(close) => {
                        out.tokens
                            .push(Token::new(TokenKind::Comment, line_no, i, close + 2));
                        state.mode = ScanMode::Normal;
                        i = close + 2;
                    }
                    None => {
                        out.tokens.push(Token::new(TokenKind::Comment, line_no, i, len));
                        i = len;
                    }
                }
            }
            ScanMode::InString => {
                if state.pending_escape {
                    // The escaped character is consumed without re-evaluation
                    state.pending_escape = false;
                    i += 1;
                } else if chars[i] == '\\' {
                    state.pending_escape = true;
                    i += 1;
                } else if chars[i] == '"' {
                    out.tokens
                        .push(Token::new(TokenKind::String, line_no, string_start, i + 1));
                    state.mode = ScanMode::Normal;
                    i += 1;
                } else {
                    i += 1;
                }
            }
            ScanMode::Normal => {
                let c = chars[i];

                if c.is_whitespace() {
                    i += 1;
                    continue;
                }

                if c == '"' {
                    string_start = i;
                    state.mode = ScanMode::InString;
                    state.pending_escape = false;
                    i += 1;
                    continue;
                }

                if c == '\'' {
                    // Character literal, possibly escaped; bare quote otherwise
                    if i + 3 < len && chars[i + 1] == '\\' && chars[i + 3] == '\'' {
                        out.tokens.push(Token::new(TokenKind::String, line_no, i, i + 4));
                        i += 4;
                    } else if i + 2 < len && chars[i + 2] == '\'' && chars[i + 1] != '\'' {
                        out.tokens.push(Token::new(TokenKind::String, line_no, i, i + 3));
                        i += 3;
                    } else {
                        out.tokens
                            .push(Token::new(TokenKind::Punctuation, line_no, i, i + 1));
                        i += 1;
                    }
                    prev_word = None;
                    continue;
                }

                if c == '/' {
                    if i + 1 < len && chars[i + 1] == '*' {
                        match find_pair(&chars, i + 2, '*', '/') {
                            Some(close) => {
                                out.tokens
                                    .push(Token::new(TokenKind::Comment, line_no, i, close + 2));
                                i = close + 2;
                            }
                            None => {
                                out.tokens.push(Token::new(TokenKind::Comment, line_no, i, len));
                                state.mode = ScanMode::InBlockComment;
                                i = len;
                            }
                        }
                        prev_word = None;
                        continue;
                    }
                    if i + 1 < len && chars[i + 1] == '/' {
                        // Line comment: the rest of the line is dead
                        out.tokens.push(Token::new(TokenKind::Comment, line_no, i, len));
                        break;
                    }
                    out.tokens.push(Token::new(TokenKind::Operator, line_no, i, i + 1));
                    prev_word = None;
                    i += 1;
                    continue;
                }

                if c == '{' {
                    let prefix: String = chars[..i].iter().collect();
                    if scanner.brace_opens_region(prev_line, &prefix) {
                        openers.push(line_no);
                    }
                    out.tokens
                        .push(Token::new(TokenKind::Punctuation, line_no, i, i + 1));
                    prev_word = None;
                    i += 1;
                    continue;
                }

                if c == '}' {
                    if let Some(opened) = openers.pop() {
                        if line_no > opened {
                            out.regions.push(RawRegion {
                                kind: FoldKind::Block,
                                start_line: opened,
                                end_line: line_no,
                            });
                        }
                    }
                    out.tokens
                        .push(Token::new(TokenKind::Punctuation, line_no, i, i + 1));
                    prev_word = None;
                    i += 1;
                    continue;
                }

                if c == '#' {
                    // Preprocessor directive
                    let mut j = i + 1;
                    while j < len && chars[j].is_ascii_alphabetic() {
                        j += 1;
                    }
                    out.tokens.push(Token::new(TokenKind::Keyword, line_no, i, j));
                    let mut k = j;
                    while k < len && chars[k].is_whitespace() {
                        k += 1;
                    }
                    if k < len && chars[k] == '<' {
                        let close = (k + 1..len).find(|&p| chars[p] == '>');
                        let end = close.map(|p| p + 1).unwrap_or(len);
                        out.tokens.push(Token::new(TokenKind::String, line_no, k, end));
                        i = end;
                    } else {
                        i = j;
                    }
                    prev_word = None;
                    continue;
                }

                if c.is_ascii_digit() {
                    let mut j = i + 1;
                    while j < len
                        && (chars[j].is_ascii_alphanumeric() || chars[j] == '.' || chars[j] == '_')
                    {
                        j += 1;
                    }
                    out.tokens.push(Token::new(TokenKind::Number, line_no, i, j));
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
                    out.tokens.push(Token::new(kind, line_no, i, j));
                    prev_word = Some(word);
                    i = j;
                    continue;
                }

                if "+-*%=<>!&|^~?".contains(c) {
                    out.tokens.push(Token::new(TokenKind::Operator, line_no, i, i + 1));
                    prev_word = None;
                    i += 1;
                    continue;
                }

                out.tokens
                    .push(Token::new(TokenKind::Punctuation, line_no, i, i + 1));
                prev_word = None;
                i += 1;
            }
        }
    }

    // An unterminated string closes at end of line; only block-comment state
    // carries over.
    if state.mode == ScanMode::InString {
        if len > string_start {
            out.tokens
                .push(Token::new(TokenKind::String, line_no, string_start, len));
        }
        state.mode = ScanMode::Normal;
        state.pending_escape = false;
    }
}

fn classify_word(word: &str, prev_word: Option<&str>, chars: &[char], after: usize) -> TokenKind {
    if let Some(prev) = prev_word {
        if OPENER_KEYWORDS.contains(&prev) {
            return TokenKind::ClassName;
        }
    }
    if KEYWORDS.contains(&word) {
        return TokenKind::Keyword;
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

/// Find the two-character sequence `a` `b` at or after `from`, returning the
/// index of `a`.
fn find_pair(chars: &[char], from: usize, a: char, b: char) -> Option<usize> {
    if chars.len() < 2 {
        return None;
    }
    (from..chars.len().saturating_sub(1)).find(|&k| chars[k] == a && chars[k + 1] == b)
}
