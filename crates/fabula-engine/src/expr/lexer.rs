use std::fmt;

use logos::Logos;

use crate::error::{EngineError, EngineResult};

/// Token type for the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal.
    Int(i64),
    /// Double-quoted string literal, quotes stripped.
    Str(String),
    /// `true` or `false`.
    Bool(bool),
    /// The `nil` keyword.
    Nil,
    /// The dice operator `d`.
    Dice,
    /// Bare word (an event role in field access).
    Ident(String),
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `!`
    Bang,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Nil => write!(f, "nil"),
            Token::Dice => write!(f, "d"),
            Token::Ident(w) => write!(f, "{w}"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Bang => write!(f, "!"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
        }
    }
}

/// Internal logos token. Borrows from source, converted to owned `Token`
/// after lexing.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[regex(r"[0-9][0-9_]*")]
    Int,

    #[regex(r#""[^"\n]*""#)]
    Str,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("nil")]
    Nil,

    // Outranks the ident regex on the single letter "d".
    #[token("d", priority = 3)]
    Dice,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token(">=")]
    Ge,

    #[token(">")]
    Gt,

    #[token("<=")]
    Le,

    #[token("<")]
    Lt,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("!")]
    Bang,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,
}

/// Lex an expression source string into tokens.
pub fn lex(source: &str) -> EngineResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let raw = result.map_err(|()| {
            EngineError::ExprParse(format!("unexpected character {:?}", lexer.slice()))
        })?;
        let token = match raw {
            RawToken::Int => {
                let text = lexer.slice().replace('_', "");
                let n = text.parse::<i64>().map_err(|_| {
                    EngineError::ExprParse(format!("integer literal out of range: {text}"))
                })?;
                Token::Int(n)
            }
            RawToken::Str => {
                let slice = lexer.slice();
                Token::Str(slice[1..slice.len() - 1].to_string())
            }
            RawToken::True => Token::Bool(true),
            RawToken::False => Token::Bool(false),
            RawToken::Nil => Token::Nil,
            RawToken::Dice => Token::Dice,
            RawToken::Ident => Token::Ident(lexer.slice().to_string()),
            RawToken::EqEq => Token::EqEq,
            RawToken::NotEq => Token::NotEq,
            RawToken::Ge => Token::Ge,
            RawToken::Gt => Token::Gt,
            RawToken::Le => Token::Le,
            RawToken::Lt => Token::Lt,
            RawToken::Plus => Token::Plus,
            RawToken::Minus => Token::Minus,
            RawToken::Star => Token::Star,
            RawToken::Slash => Token::Slash,
            RawToken::Bang => Token::Bang,
            RawToken::Dot => Token::Dot,
            RawToken::Comma => Token::Comma,
            RawToken::LParen => Token::LParen,
            RawToken::RParen => Token::RParen,
            RawToken::LBracket => Token::LBracket,
            RawToken::RBracket => Token::RBracket,
        };
        tokens.push(token);
    }

    Ok(tokens)
}
