use crate::script::ast::{Token, TokenKind};
use crate::script::ParseError;

/// Split script source into tokens. Comments and whitespace are dropped,
/// the returned vector always ends with a [`TokenKind::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Scanner::new(source).scan()
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    line: usize,
    tokens: Vec<Token>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            src,
            line: 1,
            tokens: vec![],
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next().map(|(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|(i, _)| *i).unwrap_or(self.src.len())
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>, line: usize) {
        self.tokens.push(Token {
            kind,
            lexeme: lexeme.into(),
            line,
        });
    }

    fn scan(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(c) = self.peek() {
            let line = self.line;
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '/' if self.peek_second() == Some('*') => {
                    self.bump();
                    self.bump();
                    self.skip_block_comment(line)?;
                }
                '"' | '\'' => {
                    self.bump();
                    let text = self.string(c, line)?;
                    self.push(TokenKind::String, text, line);
                }
                '%' | '$' if self.peek_second().is_some_and(|n| is_ident_start(n) || n == ':') => {
                    self.bump();
                    let name = self.ident();
                    let kind = if c == '%' {
                        TokenKind::LocalVar
                    } else {
                        TokenKind::GlobalVar
                    };
                    self.push(kind, name, line);
                }
                c if is_ident_start(c) => {
                    let name = self.ident();
                    self.push(TokenKind::Ident, name, line);
                }
                c if c.is_ascii_digit() => {
                    let start = self.offset();
                    while self
                        .peek()
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.')
                    {
                        self.bump();
                    }
                    let end = self.offset();
                    let number = &self.src[start..end];
                    self.push(TokenKind::Number, number, line);
                }
                c => {
                    self.bump();
                    self.push(TokenKind::Punct, c.to_string(), line);
                }
            }
        }

        let line = self.line;
        self.push(TokenKind::Eof, "", line);
        Ok(self.tokens)
    }

    fn skip_block_comment(&mut self, line: usize) -> Result<(), ParseError> {
        while let Some(c) = self.bump() {
            if c == '*' && self.peek() == Some('/') {
                self.bump();
                return Ok(());
            }
        }
        Err(ParseError::UnterminatedComment { line })
    }

    fn string(&mut self, quote: char, line: usize) -> Result<String, ParseError> {
        let mut text = String::new();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        text.push('\\');
                        text.push(escaped);
                    }
                }
                c if c == quote => return Ok(text),
                c => text.push(c),
            }
        }
        Err(ParseError::UnterminatedString { line })
    }

    /// Identifier with optional `::` separated parts, e.g. `Foo::bar` or `Pref::Net::Port`.
    fn ident(&mut self) -> String {
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(c) if is_ident_char(c) => {
                    name.push(c);
                    self.bump();
                }
                Some(':') if self.peek_second() == Some(':') => {
                    name.push_str("::");
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
        name
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    #[test]
    fn test_variables_and_operators() {
        let tokens = kinds("%a = %b % 2; if ($x $= \"y\") {}");
        assert_eq!(tokens[0], (TokenKind::LocalVar, "a".to_string()));
        assert_eq!(tokens[2], (TokenKind::LocalVar, "b".to_string()));
        assert_eq!(tokens[3], (TokenKind::Punct, "%".to_string()));
        assert!(tokens.contains(&(TokenKind::GlobalVar, "x".to_string())));
        assert!(tokens.contains(&(TokenKind::Punct, "$".to_string())));
        assert!(tokens.contains(&(TokenKind::String, "y".to_string())));
    }

    #[test]
    fn test_qualified_names() {
        let tokens = kinds("function Foo::bar() { $Pref::Net::Port = 1; }");
        assert_eq!(tokens[1], (TokenKind::Ident, "Foo::bar".to_string()));
        assert!(tokens.contains(&(TokenKind::GlobalVar, "Pref::Net::Port".to_string())));
    }

    #[test]
    fn test_comments_and_lines() {
        let tokens = tokenize("// %skipped\n/* $also\nskipped */ %seen").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "seen");
        assert_eq!(tokens[0].line, 3);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            tokenize("%a = \"oops;"),
            Err(ParseError::UnterminatedString { line: 1 })
        ));
        assert!(matches!(
            tokenize("\n/* never closed"),
            Err(ParseError::UnterminatedComment { line: 2 })
        ));
    }
}
