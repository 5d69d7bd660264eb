//! Tokenizer for probe bodies

use super::CompileError;
use super::parser::MAX_NESTING;

/// Piece of a template literal
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    /// Tokens of a `${...}` interpolation
    Expr(Vec<Spanned>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Str(String),
    Template(Vec<TemplatePart>),
    Number(f64),
    /// Single punctuation character, or "=>" / "..."
    Punct(&'static str),
}

/// A token with the 1-based line it started on
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub tok: Tok,
    pub line: usize,
}

const PUNCT: &[&str] = &[
    "(", ")", "{", "}", "[", "]", ",", ";", ":", ".", "=", "-", "<", ">", "!", "+", "*", "/", "?",
    "&", "|",
];

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    Lexer {
        chars: &chars,
        pos: 0,
        line: 1,
        nesting: 0,
    }
    .run(false)
}

struct Lexer<'a> {
    chars: &'a [char],
    pos: usize,
    line: usize,
    /// Open template interpolations
    nesting: usize,
}

impl Lexer<'_> {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(self.line, message)
    }

    /// Lex until end of input, or until the closing `}` of an interpolation
    fn run(&mut self, in_interpolation: bool) -> Result<Vec<Spanned>, CompileError> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;

        while let Some(c) = self.peek(0) {
            let line = self.line;
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek(1) == Some('/') => {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '/' if self.peek(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek(0) == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.error("unterminated block comment")),
                        }
                    }
                }
                '\'' | '"' => {
                    let value = self.string(c)?;
                    tokens.push(Spanned {
                        tok: Tok::Str(value),
                        line,
                    });
                }
                '`' => {
                    let parts = self.template()?;
                    tokens.push(Spanned {
                        tok: Tok::Template(parts),
                        line,
                    });
                }
                c if c.is_ascii_digit() => {
                    let number = self.number()?;
                    tokens.push(Spanned {
                        tok: Tok::Number(number),
                        line,
                    });
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    let mut ident = String::new();
                    while let Some(c) = self.peek(0) {
                        if c.is_alphanumeric() || c == '_' || c == '$' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Spanned {
                        tok: Tok::Ident(ident),
                        line,
                    });
                }
                '=' if self.peek(1) == Some('>') => {
                    self.bump();
                    self.bump();
                    tokens.push(Spanned {
                        tok: Tok::Punct("=>"),
                        line,
                    });
                }
                '.' if self.peek(1) == Some('.') && self.peek(2) == Some('.') => {
                    self.pos += 3;
                    tokens.push(Spanned {
                        tok: Tok::Punct("..."),
                        line,
                    });
                }
                '}' if in_interpolation && depth == 0 => {
                    self.bump();
                    return Ok(tokens);
                }
                _ => {
                    let Some(punct) = PUNCT.iter().find(|p| p.starts_with(c)) else {
                        return Err(self.error(format!("unexpected character '{}'", c)));
                    };
                    if c == '{' {
                        depth += 1;
                    } else if c == '}' {
                        depth = depth.saturating_sub(1);
                    }
                    self.bump();
                    tokens.push(Spanned {
                        tok: Tok::Punct(*punct),
                        line,
                    });
                }
            }
        }

        if in_interpolation {
            return Err(self.error("unterminated template interpolation"));
        }
        Ok(tokens)
    }

    fn escape(&mut self) -> Result<char, CompileError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some(c) => Ok(c),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, CompileError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(value),
                Some('\\') => value.push(self.escape()?),
                Some('\n') | None => return Err(self.error("unterminated string")),
                Some(c) => value.push(c),
            }
        }
    }

    fn template(&mut self) -> Result<Vec<TemplatePart>, CompileError> {
        self.bump();
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek(0) {
                Some('`') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    text.push(self.escape()?);
                }
                Some('$') if self.peek(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    if self.nesting >= MAX_NESTING {
                        return Err(self.error("template interpolations nested too deeply"));
                    }
                    self.nesting += 1;
                    let inner = self.run(true);
                    self.nesting -= 1;
                    parts.push(TemplatePart::Expr(inner?));
                }
                Some(_) => {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                None => return Err(self.error("unterminated template literal")),
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(parts)
    }

    fn number(&mut self) -> Result<f64, CompileError> {
        let mut raw = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() || c == '.' || c == '_' {
                // "1.toString" style member access is not part of the grammar
                if c == '.' && !self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                    break;
                }
                if c != '_' {
                    raw.push(c);
                }
                self.bump();
            } else {
                break;
            }
        }
        raw.parse::<f64>()
            .map_err(|_| self.error(format!("invalid number '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|s| s.tok).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            toks("const r = await request.get('/a'); // trailing"),
            vec![
                Tok::Ident("const".into()),
                Tok::Ident("r".into()),
                Tok::Punct("="),
                Tok::Ident("await".into()),
                Tok::Ident("request".into()),
                Tok::Punct("."),
                Tok::Ident("get".into()),
                Tok::Punct("("),
                Tok::Str("/a".into()),
                Tok::Punct(")"),
                Tok::Punct(";"),
            ]
        );
    }

    #[test]
    fn test_template_with_interpolation() {
        let tokens = toks("`Bearer ${authToken}!`");
        let [Tok::Template(parts)] = tokens.as_slice() else {
            panic!("expected a template");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], TemplatePart::Text("Bearer ".into()));
        let TemplatePart::Expr(inner) = &parts[1] else {
            panic!("expected interpolation");
        };
        assert_eq!(inner[0].tok, Tok::Ident("authToken".into()));
        assert_eq!(parts[2], TemplatePart::Text("!".into()));
    }

    #[test]
    fn test_numbers_and_arrow() {
        assert_eq!(
            toks("100_000 1.5 () =>"),
            vec![
                Tok::Number(100000.0),
                Tok::Number(1.5),
                Tok::Punct("("),
                Tok::Punct(")"),
                Tok::Punct("=>"),
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a\n/* x\n y */\nb").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 4);
    }

    #[test]
    fn test_interpolation_nesting_is_bounded() {
        let nested = |levels: usize| format!("{}1{}", "`${".repeat(levels), "}`".repeat(levels));

        assert!(tokenize(&nested(MAX_NESTING)).is_ok());

        let err = tokenize(&nested(10_000)).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("nested too deeply"), "{}", err.message);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc\n'").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
