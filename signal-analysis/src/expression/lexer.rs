use super::ExpressionError;
use lumparser_common::Real;
use std::{fmt::Display, iter::Peekable, str::CharIndices};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(Real),
    Ident(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{value}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::DoubleStar => write!(f, "**"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token together with the byte offset it starts at.
pub(crate) type Spanned = (usize, Token);

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let mut end = self.source.len();
        while let Some(&(index, c)) = self.chars.peek() {
            if pred(c) {
                self.chars.next();
            } else {
                end = index;
                break;
            }
        }
        end
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Consumes an exponent suffix such as `e-3` if one follows, without consuming
    /// an `e` which begins an identifier.
    fn exponent(&mut self) {
        let mut lookahead = self.chars.clone();
        if !matches!(lookahead.next(), Some((_, 'e' | 'E'))) {
            return;
        }
        let mut next = lookahead.next();
        if matches!(next, Some((_, '+' | '-'))) {
            next = lookahead.next();
        }
        if matches!(next, Some((_, c)) if c.is_ascii_digit()) {
            self.chars.next();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.chars.next();
            }
            self.take_while(|c| c.is_ascii_digit());
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, ExpressionError> {
        self.take_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.chars.next();
            self.take_while(|c| c.is_ascii_digit());
        }
        self.exponent();
        let end = self.chars.peek().map_or(self.source.len(), |&(i, _)| i);
        let text = self.source.get(start..end).unwrap_or_default();
        text.parse()
            .map(Token::Number)
            .map_err(|_| ExpressionError::InvalidNumber(text.to_owned()))
    }

    fn ident(&mut self, start: usize) -> Token {
        let end = self.take_while(|c| c.is_alphanumeric() || c == '_');
        Token::Ident(self.source.get(start..end).unwrap_or_default().to_owned())
    }

    fn next_token(&mut self) -> Option<Result<Spanned, ExpressionError>> {
        self.take_while(char::is_whitespace);
        let &(start, c) = self.chars.peek()?;
        let token = match c {
            '0'..='9' | '.' => self.number(start),
            c if c.is_alphabetic() || c == '_' => Ok(self.ident(start)),
            _ => {
                self.chars.next();
                match c {
                    '+' => Ok(Token::Plus),
                    '-' => Ok(Token::Minus),
                    '*' if self.peek_char() == Some('*') => {
                        self.chars.next();
                        Ok(Token::DoubleStar)
                    }
                    '*' => Ok(Token::Star),
                    '/' => Ok(Token::Slash),
                    '%' => Ok(Token::Percent),
                    '(' => Ok(Token::LParen),
                    ')' => Ok(Token::RParen),
                    ',' => Ok(Token::Comma),
                    other => Err(ExpressionError::UnexpectedCharacter {
                        character: other,
                        position: start,
                    }),
                }
            }
        };
        Some(token.map(|token| (start, token)))
    }
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let mut lexer = Lexer::new(source);
    std::iter::from_fn(|| lexer.next_token()).collect()
}
