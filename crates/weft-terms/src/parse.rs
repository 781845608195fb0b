use smol_str::SmolStr;

use crate::Term;

/// Errors produced while reading the textual term syntax.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character `{found}` at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("invalid escape sequence `\\{found}` at offset {offset}")]
    InvalidEscape { found: char, offset: usize },

    #[error("integer literal at offset {offset} is out of range")]
    IntOutOfRange { offset: usize },

    #[error("trailing input at offset {offset}")]
    Trailing { offset: usize },
}

pub(crate) fn parse_term(input: &str) -> Result<Term, TermError> {
    let mut cursor = Cursor::new(input);
    cursor.skip_ws();
    let term = cursor.term()?;
    cursor.skip_ws();
    if let Some((offset, _)) = cursor.peek() {
        return Err(TermError::Trailing { offset });
    }
    Ok(term)
}

struct Cursor<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some((_, c)) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), TermError> {
        match self.bump() {
            Some((_, c)) if c == want => Ok(()),
            Some((offset, found)) => Err(TermError::UnexpectedChar { found, offset }),
            None => Err(TermError::UnexpectedEnd),
        }
    }

    fn term(&mut self) -> Result<Term, TermError> {
        match self.peek() {
            None => Err(TermError::UnexpectedEnd),
            Some((_, '[')) => self.list(),
            Some((_, '"')) => self.string(),
            Some((_, '?')) => {
                self.bump();
                Ok(Term::Var(self.ident()?))
            }
            Some((_, c)) if c.is_ascii_digit() || c == '-' => self.int(),
            Some((_, c)) if is_ident_start(c) => self.appl(),
            Some((offset, found)) => Err(TermError::UnexpectedChar { found, offset }),
        }
    }

    fn list(&mut self) -> Result<Term, TermError> {
        self.expect('[')?;
        let items = self.args(']')?;
        Ok(Term::List(items))
    }

    fn appl(&mut self) -> Result<Term, TermError> {
        let name = self.ident()?;
        self.skip_ws();
        if matches!(self.peek(), Some((_, '('))) {
            self.bump();
            let args = self.args(')')?;
            Ok(Term::Appl(name, args))
        } else {
            Ok(Term::Appl(name, Vec::new()))
        }
    }

    /// Comma-separated terms up to (and consuming) `close`.
    fn args(&mut self, close: char) -> Result<Vec<Term>, TermError> {
        let mut items = Vec::new();
        self.skip_ws();
        if matches!(self.peek(), Some((_, c)) if c == close) {
            self.bump();
            return Ok(items);
        }
        loop {
            self.skip_ws();
            items.push(self.term()?);
            self.skip_ws();
            match self.bump() {
                Some((_, ',')) => continue,
                Some((_, c)) if c == close => return Ok(items),
                Some((offset, found)) => return Err(TermError::UnexpectedChar { found, offset }),
                None => return Err(TermError::UnexpectedEnd),
            }
        }
    }

    fn string(&mut self) -> Result<Term, TermError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(TermError::UnexpectedEnd),
                Some((_, '"')) => return Ok(Term::Str(out)),
                Some((_, '\\')) => match self.bump() {
                    None => return Err(TermError::UnexpectedEnd),
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((offset, found)) => {
                        return Err(TermError::InvalidEscape { found, offset })
                    }
                },
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn int(&mut self) -> Result<Term, TermError> {
        let (start, _) = self.peek().ok_or(TermError::UnexpectedEnd)?;
        if matches!(self.peek(), Some((_, '-'))) {
            self.bump();
        }
        let mut saw_digit = false;
        while matches!(self.peek(), Some((_, c)) if c.is_ascii_digit()) {
            self.bump();
            saw_digit = true;
        }
        if !saw_digit {
            return match self.peek() {
                Some((offset, found)) => Err(TermError::UnexpectedChar { found, offset }),
                None => Err(TermError::UnexpectedEnd),
            };
        }
        let end = self.peek().map_or(self.input.len(), |(offset, _)| offset);
        self.input[start..end]
            .parse::<i64>()
            .map(Term::Int)
            .map_err(|_| TermError::IntOutOfRange { offset: start })
    }

    fn ident(&mut self) -> Result<SmolStr, TermError> {
        let (start, c) = self.peek().ok_or(TermError::UnexpectedEnd)?;
        if !is_ident_start(c) {
            return Err(TermError::UnexpectedChar { found: c, offset: start });
        }
        while matches!(self.peek(), Some((_, c)) if is_ident_continue(c)) {
            self.bump();
        }
        let end = self.peek().map_or(self.input.len(), |(offset, _)| offset);
        Ok(SmolStr::new(&self.input[start..end]))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}
