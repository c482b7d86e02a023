//! Expression and statement language shared by the resolved tree and the IR.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a resolved type, by name (e.g. `Int`, `List<T>`, `T`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this names a bare type parameter. Type parameters are single
    /// upper-case letters by convention of the frontend.
    pub fn is_type_parameter(&self) -> bool {
        let mut chars = self.0.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    Bool(bool),
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
}

impl BinaryOp {
    /// Evaluate the operator on two constants, if both are foldable.
    pub fn fold(self, lhs: &Constant, rhs: &Constant) -> Option<Constant> {
        match (self, lhs, rhs) {
            (BinaryOp::Add, Constant::Int(a), Constant::Int(b)) => a.checked_add(*b).map(Constant::Int),
            (BinaryOp::Sub, Constant::Int(a), Constant::Int(b)) => a.checked_sub(*b).map(Constant::Int),
            (BinaryOp::Mul, Constant::Int(a), Constant::Int(b)) => a.checked_mul(*b).map(Constant::Int),
            (BinaryOp::Div, Constant::Int(a), Constant::Int(b)) => a.checked_div(*b).map(Constant::Int),
            (BinaryOp::Add, Constant::Str(a), Constant::Str(b)) => Some(Constant::Str(format!("{}{}", a, b))),
            (BinaryOp::Eq, a, b) => Some(Constant::Bool(a == b)),
            _ => None,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    Const {
        value: Constant,
    },
    Local {
        name: String,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: String,
        #[serde(default)]
        args: Vec<Expr>,
        /// Declared return type of the callee, when it is generic.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generic_return: Option<TypeRef>,
        /// Type the call site expects.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ty: Option<TypeRef>,
    },
    /// An unbound reference to a callable, as written in source.
    CallableReference {
        target: String,
    },
    /// A callable reference after lowering, with its arity made explicit.
    FunctionReference {
        target: String,
        arity: usize,
    },
    Cast {
        ty: TypeRef,
        #[serde(rename = "operand")]
        expr: Box<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Const {
            value: Constant::Int(value),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local { name: name.into() }
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.into(),
            args,
            generic_return: None,
            ty: None,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Visit this expression and every nested expression, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            Expr::Call { args, .. } => args.iter().for_each(|arg| arg.walk(f)),
            Expr::Cast { expr, .. } => expr.walk(f),
            Expr::Const { .. }
            | Expr::Local { .. }
            | Expr::CallableReference { .. }
            | Expr::FunctionReference { .. } => {}
        }
    }

    /// Rewrite this expression bottom-up: children are rewritten before `f`
    /// sees their parent.
    pub fn rewrite(self, f: &mut impl FnMut(Expr) -> Expr) -> Expr {
        let rewritten = match self {
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op,
                lhs: Box::new(lhs.rewrite(f)),
                rhs: Box::new(rhs.rewrite(f)),
            },
            Expr::Call {
                callee,
                args,
                generic_return,
                ty,
            } => Expr::Call {
                callee,
                args: args.into_iter().map(|arg| arg.rewrite(f)).collect(),
                generic_return,
                ty,
            },
            Expr::Cast { ty, expr } => Expr::Cast {
                ty,
                expr: Box::new(expr.rewrite(f)),
            },
            leaf => leaf,
        };
        f(rewritten)
    }
}

/// A statement in a function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    Let { name: String, value: Expr },
    Eval { value: Expr },
    Return { value: Expr },
}

impl Stmt {
    pub fn expr(&self) -> &Expr {
        match self {
            Stmt::Let { value, .. } | Stmt::Eval { value } | Stmt::Return { value } => value,
        }
    }

    /// Rewrite the statement's expression in place.
    pub fn rewrite_expr(&mut self, f: &mut impl FnMut(Expr) -> Expr) {
        let slot = match self {
            Stmt::Let { value, .. } | Stmt::Eval { value } | Stmt::Return { value } => value,
        };
        let taken = std::mem::replace(slot, Expr::int(0));
        *slot = taken.rewrite(f);
    }
}
