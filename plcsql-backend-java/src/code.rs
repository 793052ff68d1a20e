//! Indentation-aware builder for emitted Java.
//!
//! A `Code` is a list of lines, each at a depth relative to the fragment's
//! first line. Fragments nest into each other, and the absolute indentation
//! is fixed only at `render` time.

use plcsql_ast::Span;

/// Widest single-line form `call`/`hang` produce before breaking into lines.
pub const MAX_INLINE: usize = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Code {
    lines: Vec<Line>,
    marks: Vec<Mark>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Line {
    depth: usize,
    text: String,
}

/// Source span of the statement that produced lines `first..end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark {
    pub first: usize,
    pub end: usize,
    pub span: Span,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(s: impl Into<String>) -> Self {
        let mut c = Self::new();
        c.line(s);
        c
    }

    /// Lines written with two-space indentation steps; the steps become
    /// depths, so the configured indent width applies to them too.
    pub fn template<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut c = Self::new();
        for l in lines {
            let text: String = l.into();
            let trimmed = text.trim_start_matches(' ');
            let depth = (text.len() - trimmed.len()) / 2;
            c.line(trimmed);
            if let Some(last) = c.lines.last_mut() {
                last.depth = depth;
            }
        }
        c
    }

    pub fn line(&mut self, s: impl Into<String>) -> &mut Self {
        let text = s.into();
        debug_assert!(!text.contains('\n'), "code lines are single lines: {text:?}");
        self.lines.push(Line { depth: 0, text });
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    /// Appends `other` at the same depth.
    pub fn append(&mut self, other: Code) -> &mut Self {
        self.push_at(0, other)
    }

    /// Appends `other` one level deeper.
    pub fn nest(&mut self, other: Code) -> &mut Self {
        self.push_at(1, other)
    }

    fn push_at(&mut self, depth: usize, other: Code) -> &mut Self {
        let base = self.lines.len();
        self.marks.extend(other.marks.into_iter().map(|m| Mark {
            first: m.first + base,
            end: m.end + base,
            span: m.span,
        }));
        self.lines.extend(other.lines.into_iter().map(|l| Line {
            depth: l.depth + depth,
            text: l.text,
        }));
        self
    }

    /// `head` / indented `body` / `tail`, the shape of every Java block.
    pub fn wrap(head: impl Into<String>, body: Code, tail: impl Into<String>) -> Self {
        let mut c = Code::text(head);
        c.nest(body);
        c.line(tail);
        c
    }

    /// `name(a, b)` on one line when every argument is a single short line,
    /// otherwise one argument per indented line.
    pub fn call(name: &str, args: Vec<Code>) -> Self {
        if args.iter().all(Code::is_single_line) {
            let parts: Vec<&str> = args.iter().filter_map(Code::as_single_line).collect();
            let inline = format!("{name}({})", parts.join(", "));
            if inline.len() <= MAX_INLINE {
                return Code::text(inline);
            }
        }
        if args.is_empty() {
            return Code::text(format!("{name}()"));
        }
        let mut c = Code::text(format!("{name}("));
        c.nest(Code::join(args, ","));
        c.line(")");
        c
    }

    /// `head value tail` on one line when it fits, otherwise `head` followed
    /// by the indented value carrying `tail`.
    pub fn hang(head: impl Into<String>, value: Code, tail: &str) -> Self {
        let head = head.into();
        if let Some(v) = value.as_single_line() {
            let inline = if head.is_empty() {
                format!("{v}{tail}")
            } else {
                format!("{head} {v}{tail}")
            };
            if inline.len() <= MAX_INLINE {
                let mut c = Code::text(inline);
                c.marks = value.marks;
                return c;
            }
        }
        let mut c = Code::text(head);
        c.nest(value.suffix(tail));
        c
    }

    /// Concatenates fragments, putting `delimiter` after all but the last.
    pub fn join(parts: Vec<Code>, delimiter: &str) -> Self {
        let n = parts.len();
        let mut c = Code::new();
        for (i, p) in parts.into_iter().enumerate() {
            if i + 1 < n {
                c.append(p.suffix(delimiter));
            } else {
                c.append(p);
            }
        }
        c
    }

    /// Like `join`, but glues each fragment's first line onto the previous
    /// fragment's last line after `delimiter` (`} else if (...) {`).
    pub fn chain(parts: Vec<Code>, delimiter: &str) -> Self {
        let mut c = Code::new();
        for p in parts {
            if c.is_empty() {
                c = p;
            } else {
                c.glue(delimiter, p);
            }
        }
        c
    }

    /// Joins `other`'s first line onto this fragment's last line.
    pub fn glue(&mut self, delimiter: &str, other: Code) -> &mut Self {
        let Some(last) = self.lines.len().checked_sub(1) else {
            return self.append(other);
        };
        let depth = self.lines[last].depth;
        let mut lines = other.lines.into_iter();
        if let Some(first) = lines.next() {
            self.lines[last].text.push_str(delimiter);
            self.lines[last].text.push_str(&first.text);
        }
        let base = last;
        self.marks.extend(other.marks.into_iter().map(|m| Mark {
            first: m.first + base,
            end: m.end + base,
            span: m.span,
        }));
        self.lines.extend(lines.map(|l| Line {
            depth: l.depth + depth,
            text: l.text,
        }));
        self
    }

    pub fn prefix(mut self, p: &str) -> Self {
        match self.lines.first_mut() {
            Some(l) => l.text.insert_str(0, p),
            None => self.lines.push(Line { depth: 0, text: p.to_string() }),
        }
        self
    }

    pub fn suffix(mut self, s: &str) -> Self {
        match self.lines.last_mut() {
            Some(l) => l.text.push_str(s),
            None => self.lines.push(Line { depth: 0, text: s.to_string() }),
        }
        self
    }

    /// Records that every line of this fragment stems from `span`.
    pub fn mark(mut self, span: Span) -> Self {
        if !self.lines.is_empty() {
            self.marks.push(Mark {
                first: 0,
                end: self.lines.len(),
                span,
            });
        }
        self
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_single_line(&self) -> bool {
        self.lines.len() == 1
    }

    pub fn as_single_line(&self) -> Option<&str> {
        match self.lines.as_slice() {
            [l] => Some(l.text.as_str()),
            _ => None,
        }
    }

    pub fn render(&self, indent_width: usize) -> String {
        let mut out = String::new();
        for l in &self.lines {
            if !l.text.is_empty() {
                out.push_str(&" ".repeat(l.depth * indent_width));
                out.push_str(&l.text);
            }
            out.push('\n');
        }
        out
    }
}
