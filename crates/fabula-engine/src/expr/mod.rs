//! The expression language used by rule conditions and field actions.
//!
//! Expressions are parsed once at compile time into an [`Expr`] tree.
//! All-constant subtrees are folded during parsing, with one exception:
//! dice nodes always survive to runtime, because every evaluation must
//! roll fresh.

mod lexer;
mod parser;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventRole, RunCtx};
use crate::value::Value;

pub use lexer::Token;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Boolean negation `!`.
    Not,
    /// Integer negation `-`.
    Neg,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `+` (int addition or string concatenation)
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `d` (sum of left rolls of a right-sided die)
    Dice,
}

/// A compiled expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// A literal or folded constant.
    Const(Value),
    /// A field read off an event role's entity. The message role reads
    /// the event text instead.
    Field {
        /// Which event slot to resolve.
        role: EventRole,
        /// Field name on the resolved entity.
        name: String,
    },
    /// A prefix operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// Operand.
        sub: Box<Expr>,
    },
    /// An infix operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
}

/// Parse an expression source string.
pub fn parse(source: &str) -> EngineResult<Expr> {
    let tokens = lexer::lex(source)?;
    parser::parse_tokens(tokens)
}

impl Expr {
    /// Evaluate against a live event.
    pub fn eval(&self, ev: &Event, ctx: &mut RunCtx<'_>) -> EngineResult<Value> {
        match self {
            Expr::Const(v) => Ok(v.clone()),
            Expr::Field { role, name } => eval_field(*role, name, ev, ctx),
            Expr::Unary { op, sub } => apply_unary(*op, sub.eval(ev, ctx)?),
            Expr::Binary { op, left, right } => {
                let l = left.eval(ev, ctx)?;
                let r = right.eval(ev, ctx)?;
                if *op == BinaryOp::Dice {
                    roll_dice(l, r, ctx)
                } else {
                    apply_binary(*op, l, r)
                }
            }
        }
    }

    /// Evaluate without an event. Errors on field access and dice,
    /// which both need runtime context.
    pub fn eval_const(&self) -> EngineResult<Value> {
        match self {
            Expr::Const(v) => Ok(v.clone()),
            Expr::Field { .. } => Err(EngineError::NotConstant("field access")),
            Expr::Unary { op, sub } => apply_unary(*op, sub.eval_const()?),
            Expr::Binary { op, left, right } => {
                if *op == BinaryOp::Dice {
                    return Err(EngineError::NotConstant("dice roll"));
                }
                apply_binary(*op, left.eval_const()?, right.eval_const()?)
            }
        }
    }
}

fn eval_field(
    role: EventRole,
    name: &str,
    ev: &Event,
    ctx: &mut RunCtx<'_>,
) -> EngineResult<Value> {
    match role {
        EventRole::Message => Ok(Value::Str(ev.message.clone().unwrap_or_default())),
        EventRole::Room => Err(EngineError::InvalidRole {
            role,
            context: "field expression",
        }),
        EventRole::Source | EventRole::Instrument | EventRole::Target => {
            let id = ev.require_role(role, "field expression")?;
            Ok(ctx.world.get(id)?.field(name))
        }
    }
}

fn apply_unary(op: UnaryOp, v: Value) -> EngineResult<Value> {
    match op {
        UnaryOp::Not => match v {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EngineError::TypeMismatch {
                op: "!",
                expected: "bool",
                got: other.kind(),
            }),
        },
        UnaryOp::Neg => match v {
            Value::Int(n) => Ok(Value::Int(-n)),
            other => Err(EngineError::TypeMismatch {
                op: "-",
                expected: "int",
                got: other.kind(),
            }),
        },
    }
}

fn apply_binary(op: BinaryOp, l: Value, r: Value) -> EngineResult<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => {
            let (Value::Int(a), Value::Int(b)) = (&l, &r) else {
                return Err(EngineError::TypeMismatch {
                    op: "comparison",
                    expected: "int",
                    got: if matches!(l, Value::Int(_)) { r.kind() } else { l.kind() },
                });
            };
            let out = match op {
                BinaryOp::Gt => a > b,
                BinaryOp::Ge => a >= b,
                BinaryOp::Lt => a < b,
                _ => a <= b,
            };
            Ok(Value::Bool(out))
        }
        BinaryOp::Add => match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (l, r) => Err(EngineError::TypeMismatch {
                op: "+",
                expected: "int+int or string+string",
                got: if matches!(l, Value::Int(_) | Value::Str(_)) {
                    r.kind()
                } else {
                    l.kind()
                },
            }),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (Value::Int(a), Value::Int(b)) = (&l, &r) else {
                return Err(EngineError::TypeMismatch {
                    op: "arithmetic",
                    expected: "int",
                    got: if matches!(l, Value::Int(_)) { r.kind() } else { l.kind() },
                });
            };
            match op {
                BinaryOp::Sub => Ok(Value::Int(a - b)),
                BinaryOp::Mul => Ok(Value::Int(a * b)),
                _ => {
                    if *b == 0 {
                        Err(EngineError::DivisionByZero)
                    } else {
                        Ok(Value::Int(a / b))
                    }
                }
            }
        }
        BinaryOp::Dice => Err(EngineError::NotConstant("dice roll")),
    }
}

fn roll_dice(l: Value, r: Value, ctx: &mut RunCtx<'_>) -> EngineResult<Value> {
    use rand::Rng;

    let (Value::Int(count), Value::Int(sides)) = (&l, &r) else {
        return Err(EngineError::TypeMismatch {
            op: "d",
            expected: "int",
            got: if matches!(l, Value::Int(_)) { r.kind() } else { l.kind() },
        });
    };
    if *count < 0 || *sides < 1 {
        return Err(EngineError::InvalidDice {
            count: *count,
            sides: *sides,
        });
    }
    let mut total = 0i64;
    for _ in 0..*count {
        total += ctx.rng.random_range(1..=*sides);
    }
    Ok(Value::Int(total))
}
