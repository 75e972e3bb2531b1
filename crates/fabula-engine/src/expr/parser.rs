use crate::error::{EngineError, EngineResult};
use crate::event::EventRole;
use crate::value::Value;

use super::lexer::Token;
use super::{BinaryOp, Expr, UnaryOp};

/// Parse a token stream into an expression tree, folding constant
/// subtrees as it goes.
pub(super) fn parse_tokens(tokens: Vec<Token>) -> EngineResult<Expr> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.equality()?;
    if let Some(tok) = parser.peek() {
        return Err(EngineError::ExprParse(format!(
            "unexpected token '{tok}' after expression"
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> EngineResult<()> {
        match self.next() {
            Some(ref tok) if tok == expected => Ok(()),
            Some(tok) => Err(EngineError::ExprParse(format!(
                "expected '{expected}', found '{tok}'"
            ))),
            None => Err(EngineError::ExprParse(format!(
                "expected '{expected}', found end of input"
            ))),
        }
    }

    fn equality(&mut self) -> EngineResult<Expr> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.comparison()?;
            left = binary(op, left, right);
        }
    }

    fn comparison(&mut self) -> EngineResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            left = binary(op, left, right);
        }
    }

    fn additive(&mut self) -> EngineResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> EngineResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Dice) => BinaryOp::Dice,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> EngineResult<Expr> {
        match self.peek() {
            Some(Token::Bang) => {
                self.pos += 1;
                let sub = self.unary()?;
                Ok(fold(Expr::Unary {
                    op: UnaryOp::Not,
                    sub: Box::new(sub),
                }))
            }
            Some(Token::Minus) => {
                self.pos += 1;
                let sub = self.unary()?;
                Ok(fold(Expr::Unary {
                    op: UnaryOp::Neg,
                    sub: Box::new(sub),
                }))
            }
            // "d 6" is sugar for "1 d 6".
            Some(Token::Dice) => {
                self.pos += 1;
                let sub = self.unary()?;
                Ok(binary(
                    BinaryOp::Dice,
                    Expr::Const(Value::Int(1)),
                    sub,
                ))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> EngineResult<Expr> {
        match self.next() {
            Some(Token::Int(n)) => Ok(Expr::Const(Value::Int(n))),
            Some(Token::Str(s)) => Ok(Expr::Const(Value::Str(s))),
            Some(Token::Bool(b)) => Ok(Expr::Const(Value::Bool(b))),
            Some(Token::Nil) => Ok(Expr::Const(Value::Nil)),
            Some(Token::LParen) => {
                let expr = self.equality()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => self.list(),
            Some(Token::Ident(word)) => self.field(&word),
            Some(tok) => Err(EngineError::ExprParse(format!(
                "unexpected token '{tok}'"
            ))),
            None => Err(EngineError::ExprParse(
                "unexpected end of expression".to_string(),
            )),
        }
    }

    fn field(&mut self, role_name: &str) -> EngineResult<Expr> {
        let Some(role) = EventRole::parse(role_name) else {
            return Err(EngineError::ExprParse(format!(
                "unknown event role '{role_name}'"
            )));
        };
        match role {
            // The message role is the event text itself; no field name.
            EventRole::Message => Ok(Expr::Field {
                role,
                name: String::new(),
            }),
            EventRole::Room => Err(EngineError::ExprParse(
                "the room role has no readable fields".to_string(),
            )),
            EventRole::Source | EventRole::Instrument | EventRole::Target => {
                self.expect(&Token::Dot)?;
                match self.next() {
                    Some(Token::Ident(name)) => Ok(Expr::Field { role, name }),
                    Some(tok) => Err(EngineError::ExprParse(format!(
                        "expected field name after '{role_name}.', found '{tok}'"
                    ))),
                    None => Err(EngineError::ExprParse(format!(
                        "expected field name after '{role_name}.'"
                    ))),
                }
            }
        }
    }

    fn list(&mut self) -> EngineResult<Expr> {
        let mut ints = Vec::new();
        let mut strs = Vec::new();
        let mut bools = Vec::new();

        loop {
            match self.next() {
                Some(Token::Int(n)) => ints.push(n),
                Some(Token::Minus) => match self.next() {
                    Some(Token::Int(n)) => ints.push(-n),
                    _ => {
                        return Err(EngineError::ExprParse(
                            "expected integer after '-' in list".to_string(),
                        ));
                    }
                },
                Some(Token::Str(s)) => strs.push(s),
                Some(Token::Bool(b)) => bools.push(b),
                Some(tok) => {
                    return Err(EngineError::ExprParse(format!(
                        "unexpected token '{tok}' in list literal"
                    )));
                }
                None => {
                    return Err(EngineError::ExprParse(
                        "unterminated list literal".to_string(),
                    ));
                }
            }
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RBracket)?;
            break;
        }

        match (ints.is_empty(), strs.is_empty(), bools.is_empty()) {
            (false, true, true) => Ok(Expr::Const(Value::IntList(ints))),
            (true, false, true) => Ok(Expr::Const(Value::StrList(strs))),
            (true, true, false) => Ok(Expr::Const(Value::BoolList(bools))),
            _ => Err(EngineError::ExprParse(
                "list literals must hold a single kind".to_string(),
            )),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    fold(Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Replace an all-constant subtree by its value. Dice and field nodes
/// refuse constant evaluation and stay live.
fn fold(expr: Expr) -> Expr {
    match expr.eval_const() {
        Ok(v) => Expr::Const(v),
        Err(_) => expr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    #[test]
    fn folds_constant_subtrees() {
        assert_eq!(
            parse("1 + 2 == 4 - 1").unwrap(),
            Expr::Const(Value::Bool(true))
        );
        assert_eq!(parse("!!true").unwrap(), Expr::Const(Value::Bool(true)));
    }

    #[test]
    fn folds_around_live_nodes() {
        // The dice node survives; its constant operand still folds.
        let expr = parse("(2 + 3) d 6").unwrap();
        let Expr::Binary { op, left, .. } = expr else {
            panic!("expected a binary node");
        };
        assert_eq!(op, BinaryOp::Dice);
        assert_eq!(*left, Expr::Const(Value::Int(5)));
    }

    #[test]
    fn field_nodes_never_fold() {
        assert!(matches!(
            parse("source.hp").unwrap(),
            Expr::Field { .. }
        ));
    }

    #[test]
    fn erroring_constants_stay_unfolded() {
        // Division by zero is a runtime error, not a parse error.
        assert!(matches!(parse("5 / 0").unwrap(), Expr::Binary { .. }));
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parse("1 2").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("bystander.hp").is_err());
    }
}
