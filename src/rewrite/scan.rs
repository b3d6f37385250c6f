//! Bracket scanning shared by the line state machines.
//!
//! Counting skips string literals, rune literals, raw strings and comments,
//! so a `(` inside `"..."` or after `//` never shifts a depth counter.
//! Block comments and raw strings may span lines; the line-by-line scans
//! carry the [`ScanMode`] from one line into the next.

/// Transient state carried from line to line by the lowering and return scans.
///
/// Re-created at the start of every stage and dropped at its end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanState {
    /// Inside the region the stage tracks: a lowering-method definition for
    /// the lowering stage, a buffer-returning function literal for returns.
    pub inside_region: bool,
    pub brace_depth: usize,
    pub pending_wrap: Option<PendingWrap>,
    /// Lexical mode at the start of the next line.
    pub mode: ScanMode,
}

/// A wrapper opened on one line whose closing `)` belongs on a later line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrap {
    /// Parentheses of the wrapped call still open at the end of the last line seen.
    pub paren_depth: usize,
    /// 1-based line of the statement that opened the wrap.
    pub opened_at_line: usize,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a line's net brace count.
    ///
    /// Returns `None` (leaving the depth untouched) when the depth would go negative.
    pub fn shift_braces(&mut self, delta: isize) -> Option<usize> {
        let depth = self.brace_depth.checked_add_signed(delta)?;
        self.brace_depth = depth;
        Some(depth)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    #[default]
    Code,
    Str,
    Rune,
    Raw,
    LineComment,
    BlockComment,
}

impl ScanMode {
    /// Mode on the far side of a line break.
    ///
    /// Line comments end there, and interpreted literals cannot cross one.
    fn across_line_break(self) -> ScanMode {
        match self {
            ScanMode::Str | ScanMode::Rune | ScanMode::LineComment => ScanMode::Code,
            mode => mode,
        }
    }
}

/// Iterator over `(byte offset, bracket)` for every `(`, `)`, `{` and `}` in code position.
pub struct Brackets<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    mode: ScanMode,
}

impl<'a> Brackets<'a> {
    /// Scan `text` as if it started in `mode`.
    pub fn resume(text: &'a str, mode: ScanMode) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            mode,
        }
    }

    /// Mode reached so far.
    pub fn mode(&self) -> ScanMode {
        self.mode
    }
}

impl Iterator for Brackets<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((idx, ch)) = self.chars.next() {
            match self.mode {
                ScanMode::Code => match ch {
                    '(' | ')' | '{' | '}' => return Some((idx, ch)),
                    '"' => self.mode = ScanMode::Str,
                    '\'' => self.mode = ScanMode::Rune,
                    '`' => self.mode = ScanMode::Raw,
                    '/' => match self.chars.peek() {
                        Some((_, '/')) => {
                            self.chars.next();
                            self.mode = ScanMode::LineComment;
                        }
                        Some((_, '*')) => {
                            self.chars.next();
                            self.mode = ScanMode::BlockComment;
                        }
                        _ => {}
                    },
                    _ => {}
                },
                ScanMode::Str | ScanMode::Rune => match ch {
                    '\\' => {
                        self.chars.next();
                    }
                    '"' if self.mode == ScanMode::Str => self.mode = ScanMode::Code,
                    '\'' if self.mode == ScanMode::Rune => self.mode = ScanMode::Code,
                    '\n' => self.mode = self.mode.across_line_break(),
                    _ => {}
                },
                ScanMode::Raw => {
                    if ch == '`' {
                        self.mode = ScanMode::Code;
                    }
                }
                ScanMode::LineComment => {
                    if ch == '\n' {
                        self.mode = ScanMode::Code;
                    }
                }
                ScanMode::BlockComment => {
                    if ch == '*' && matches!(self.chars.peek(), Some((_, '/'))) {
                        self.chars.next();
                        self.mode = ScanMode::Code;
                    }
                }
            }
        }
        None
    }
}

/// Brackets of `text` that sit in code position.
pub fn brackets(text: &str) -> Brackets<'_> {
    Brackets::resume(text, ScanMode::Code)
}

/// Net `{` minus `}` count of `text`.
pub fn net_braces(text: &str) -> isize {
    scan_line(text, ScanMode::Code).braces
}

/// One line's bracket summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineScan {
    /// Net `{` minus `}` count
    pub braces: isize,
    /// Mode the following line starts in
    pub next: ScanMode,
}

/// Scan a single line (without its `\n`) that starts in `mode`.
pub fn scan_line(line: &str, mode: ScanMode) -> LineScan {
    let mut iter = Brackets::resume(line, mode);
    let braces = iter.by_ref().fold(0, |acc, (_, ch)| match ch {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    });
    LineScan {
        braces,
        next: iter.mode().across_line_break(),
    }
}

/// Mode in effect at byte offset `at` of `text`, scanning from the start.
pub fn mode_at(text: &str, at: usize) -> ScanMode {
    let mut iter = brackets(&text[..at]);
    iter.by_ref().for_each(drop);
    iter.mode()
}

/// Outcome of scanning for the `)` that returns a parenthesis depth to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// Depth reached zero; the offset points just past that `)`.
    Closed(usize),
    /// Text ended with this many parentheses still open.
    Open(usize),
    /// Nothing was open and nothing was opened.
    Flat,
    /// The `)` at this offset had nothing left to close.
    Underflow(usize),
}

/// Scan `text` starting with `depth` parentheses already open.
///
/// With `depth == 0` this finds the end of the first call in `text`. With a
/// carried depth it finds where a call begun on an earlier line finishes.
pub fn find_close(text: &str, depth: usize) -> Balance {
    find_close_from(text, depth, ScanMode::Code)
}

/// [`find_close`] for text that starts in `mode`.
pub fn find_close_from(text: &str, depth: usize, mode: ScanMode) -> Balance {
    let mut depth = depth;
    for (idx, ch) in Brackets::resume(text, mode) {
        match ch {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Balance::Underflow(idx);
                }
                depth -= 1;
                if depth == 0 {
                    return Balance::Closed(idx + 1);
                }
            }
            _ => {}
        }
    }
    if depth == 0 {
        Balance::Flat
    } else {
        Balance::Open(depth)
    }
}

/// True when every parenthesis and brace in `text` pairs up in order.
pub fn is_balanced(text: &str) -> bool {
    let mut stack = Vec::new();
    for (_, ch) in brackets(text) {
        match ch {
            '(' | '{' => stack.push(ch),
            ')' if stack.pop() != Some('(') => return false,
            '}' if stack.pop() != Some('{') => return false,
            _ => {}
        }
    }
    stack.is_empty()
}

/// Insert `insert` into `line` at byte offset `at`.
pub fn splice(line: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(line.len() + insert.len());
    out.push_str(&line[..at]);
    out.push_str(insert);
    out.push_str(&line[at..]);
    out
}

/// 1-based line number of byte offset `at`.
pub fn line_of(text: &str, at: usize) -> usize {
    text[..at].matches('\n').count() + 1
}
