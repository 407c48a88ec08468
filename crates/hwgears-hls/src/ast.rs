//! Concrete, closed source AST for gear bodies.
//!
//! The original source front-end parses arbitrary host-language syntax
//! and dispatches through a kind-keyed visitor registry. That is
//! deliberately not reproduced here: per spec.md's Non-goal on "arbitrary
//! host control flow in gear bodies", this crate instead exposes a small,
//! closed statement/expression set that a gear-body author builds with
//! ordinary Rust constructor calls. [`lower_expr`]/[`lower_stmt`] are the
//! equivalent of the visitor dispatch, implemented as a plain `match`
//! over this closed enum rather than a registry.

use std::collections::{BTreeSet, HashMap};

use hwgears_core::type_ops::{self, ArithOp};
use hwgears_core::types::HwType;
use hwgears_core::Width;

use crate::error::HlsError;
use crate::ir::{BlockKind, ComponentField, Expr, IndexKey, NameCtx, ResValue, Stmt, UnaryOp};

/// A name's declared type during lowering -- the source-level analog of
/// `hwgears_core::template::Env`, but over concrete types only (source
/// bodies are lowered after elaboration has already resolved every
/// parameter template).
pub type Scope = HashMap<String, HwType>;

/// The closed expression set a gear body's source form is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceExpr {
    Lit(i64),
    NameRef(String),
    BinOp(ArithOp, Box<SourceExpr>, Box<SourceExpr>),
    UnaryOp(UnaryOp, Box<SourceExpr>),
    If(Box<SourceExpr>, Box<SourceExpr>, Box<SourceExpr>),
    Cast(Box<SourceExpr>, HwType),
    Concat(Vec<SourceExpr>),
    Index(Box<SourceExpr>, IndexKey),
    Field(String, ComponentField),
    Call(String, Vec<SourceExpr>),
    Pull(String),
}

/// The closed statement set a gear body's source form is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStmt {
    Assign(String, SourceExpr),
    Return(SourceExpr),
    Await(SourceExpr),
    Yield(Vec<SourceExpr>),
    /// `if`/`elif`/`else` chain; the final arm's test is `None` for a
    /// trailing `else`.
    If(Vec<(Option<SourceExpr>, Vec<SourceStmt>)>),
    While(SourceExpr, Vec<SourceStmt>),
    /// `async with intf as bind: body`.
    With(String, String, Vec<SourceStmt>),
    /// `async for bind in intf: body`.
    ForEach(String, String, Vec<SourceStmt>),
    Block(Vec<SourceStmt>),
}

/// Lowers a source expression to typed IR, resolving name types from
/// `scope` and computing result types for every compound form via
/// `hwgears_core::type_ops`.
pub fn lower_expr(expr: &SourceExpr, scope: &Scope) -> Result<Expr, HlsError> {
    match expr {
        SourceExpr::Lit(v) => Ok(Expr::Res {
            value: ResValue::Int(*v),
            dtype: type_ops::literal_type(*v),
        }),
        SourceExpr::NameRef(name) => {
            let dtype = lookup(scope, name)?;
            Ok(Expr::Name { name: name.clone(), ctx: NameCtx::Load, dtype })
        }
        SourceExpr::BinOp(op, lhs, rhs) => {
            let lhs_ir = lower_expr(lhs, scope)?;
            let rhs_ir = lower_expr(rhs, scope)?;
            let dtype = type_ops::arith_result_type(*op, lhs_ir.dtype(), rhs_ir.dtype())
                .map_err(|e| HlsError::Syntax {
                    location: "BinOp".to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Expr::BinOp { op: *op, lhs: Box::new(lhs_ir), rhs: Box::new(rhs_ir), dtype })
        }
        SourceExpr::UnaryOp(op, operand) => {
            let operand_ir = lower_expr(operand, scope)?;
            let dtype = operand_ir.dtype().clone();
            Ok(Expr::UnaryOp { op: *op, operand: Box::new(operand_ir), dtype })
        }
        SourceExpr::If(cond, if_true, if_false) => {
            let cond_ir = lower_expr(cond, scope)?;
            let true_ir = lower_expr(if_true, scope)?;
            let false_ir = lower_expr(if_false, scope)?;
            if true_ir.dtype() != false_ir.dtype() {
                return Err(HlsError::Syntax {
                    location: "Conditional".to_string(),
                    reason: "branches of a conditional expression must share a type".to_string(),
                });
            }
            let dtype = true_ir.dtype().clone();
            Ok(Expr::Conditional {
                cond: Box::new(cond_ir),
                if_true: Box::new(true_ir),
                if_false: Box::new(false_ir),
                dtype,
            })
        }
        SourceExpr::Cast(inner, dtype) => {
            let inner_ir = lower_expr(inner, scope)?;
            Ok(Expr::Cast { expr: Box::new(inner_ir), dtype: dtype.clone() })
        }
        SourceExpr::Concat(parts) => {
            let parts_ir: Vec<Expr> = parts
                .iter()
                .map(|p| lower_expr(p, scope))
                .collect::<Result<_, _>>()?;
            let width: u32 = parts_ir
                .iter()
                .map(|p| type_ops::bitwidth(p.dtype()).map(Width::get).unwrap_or(0))
                .sum();
            Ok(Expr::Concat { parts: parts_ir, dtype: HwType::uint(width as i64) })
        }
        SourceExpr::Index(base, key) => {
            let base_ir = lower_expr(base, scope)?;
            let dtype = match key {
                IndexKey::Int(i) => type_ops::index(base_ir.dtype(), *i),
                IndexKey::Name(name) => type_ops::by_name(base_ir.dtype(), name),
            }
            .map_err(|e| HlsError::Syntax {
                location: "Subscript".to_string(),
                reason: e.to_string(),
            })?;
            Ok(Expr::Subscript { base: Box::new(base_ir), index: key.clone(), dtype })
        }
        SourceExpr::Field(interface, field) => {
            let base = lookup(scope, interface)?;
            let dtype = match field {
                ComponentField::Data => base,
                ComponentField::Valid | ComponentField::Ready => HwType::uint(1),
                ComponentField::Eot => HwType::uint(1),
            };
            Ok(Expr::Component { interface: interface.clone(), field: *field, dtype })
        }
        SourceExpr::Call(name, args) => {
            let args_ir: Vec<Expr> = args
                .iter()
                .map(|a| lower_expr(a, scope))
                .collect::<Result<_, _>>()?;
            let dtype = args_ir
                .last()
                .map(|a| a.dtype().clone())
                .unwrap_or(HwType::Any);
            Ok(Expr::FunctionCall { name: name.clone(), args: args_ir, dtype })
        }
        SourceExpr::Pull(interface) => {
            let dtype = lookup(scope, interface)?;
            Ok(Expr::InterfacePull { interface: interface.clone(), dtype })
        }
    }
}

fn lookup(scope: &Scope, name: &str) -> Result<HwType, HlsError> {
    scope.get(name).cloned().ok_or_else(|| HlsError::Syntax {
        location: name.to_string(),
        reason: "unbound name".to_string(),
    })
}

/// Lowers a single source statement. `scope` is mutated in place as
/// `Assign` introduces new bindings -- matches the original's "a scalar
/// assignment creates a Variable" rule (§4.5); this crate does not yet
/// distinguish `Variable` from `Register` (that distinction is assigned
/// by the scheduler once it knows which assignments survive a loop body).
pub fn lower_stmt(stmt: &SourceStmt, scope: &mut Scope) -> Result<Stmt, HlsError> {
    match stmt {
        SourceStmt::Assign(name, expr) => {
            let value = lower_expr(expr, scope)?;
            scope.insert(name.clone(), value.dtype().clone());
            Ok(Stmt::AssignValue { target: name.clone(), value })
        }
        SourceStmt::Return(expr) => Ok(Stmt::FuncReturn(lower_expr(expr, scope)?)),
        SourceStmt::Await(expr) => Ok(Stmt::Await(lower_expr(expr, scope)?)),
        SourceStmt::Yield(exprs) => {
            let lowered: Vec<Expr> = exprs
                .iter()
                .map(|e| lower_expr(e, scope))
                .collect::<Result<_, _>>()?;
            Ok(Stmt::Yield(lowered))
        }
        SourceStmt::If(arms) => {
            let mut lowered_arms = Vec::with_capacity(arms.len());
            for (test, body) in arms {
                let test_ir = test.as_ref().map(|t| lower_expr(t, scope)).transpose()?;
                let body_ir = lower_block(body, scope)?;
                lowered_arms.push((test_ir, body_ir));
            }
            Ok(Stmt::ContainerBlock(lowered_arms))
        }
        SourceStmt::While(test, body) => {
            let test_ir = lower_expr(test, scope)?;
            let body_ir = lower_block(body, scope)?;
            Ok(Stmt::LoopBlock { test: test_ir, stmts: body_ir })
        }
        SourceStmt::With(interface, bind, body) => {
            let interface_ty = lookup(scope, interface)?;
            scope.insert(bind.clone(), interface_ty);
            let body_ir = lower_block(body, scope)?;
            Ok(Stmt::IntfBlock { interface: interface.clone(), bind: bind.clone(), stmts: body_ir })
        }
        SourceStmt::ForEach(interface, bind, body) => {
            let interface_ty = lookup(scope, interface)?;
            scope.insert(bind.clone(), interface_ty);
            let body_ir = lower_block(body, scope)?;
            Ok(Stmt::IntfLoop { interface: interface.clone(), bind: bind.clone(), stmts: body_ir })
        }
        SourceStmt::Block(body) => Ok(Stmt::BaseBlock(lower_block(body, scope)?)),
    }
}

fn lower_block(body: &[SourceStmt], scope: &mut Scope) -> Result<Vec<Stmt>, HlsError> {
    body.iter().map(|s| lower_stmt(s, scope)).collect()
}

/// Maps a [`SourceStmt`] to the [`BlockKind`] its lowered form opens, for
/// callers (the CFG builder) that need to know which kind of sink to
/// expect without re-matching the lowered [`Stmt`].
pub fn block_kind(stmt: &SourceStmt) -> Option<BlockKind> {
    match stmt {
        SourceStmt::If(_) => Some(BlockKind::ContainerBlock),
        SourceStmt::While(..) => Some(BlockKind::LoopBlock),
        SourceStmt::With(..) => Some(BlockKind::IntfBlock),
        SourceStmt::ForEach(..) => Some(BlockKind::IntfLoop),
        SourceStmt::Block(_) => Some(BlockKind::BaseBlock),
        _ => None,
    }
}

/// Counts the operator nodes in an expression tree (`BinOp`/`UnaryOp`
/// only -- casts, concats, and calls are not "operators" for this
/// heuristic).
fn operator_count(expr: &SourceExpr) -> usize {
    match expr {
        SourceExpr::BinOp(_, lhs, rhs) => 1 + operator_count(lhs) + operator_count(rhs),
        SourceExpr::UnaryOp(_, operand) => 1 + operator_count(operand),
        SourceExpr::If(cond, t, f) => operator_count(cond) + operator_count(t) + operator_count(f),
        SourceExpr::Cast(inner, _) => operator_count(inner),
        SourceExpr::Concat(parts) => parts.iter().map(operator_count).sum(),
        SourceExpr::Index(base, _) => operator_count(base),
        _ => 0,
    }
}

fn name_ref_count(expr: &SourceExpr) -> usize {
    match expr {
        SourceExpr::NameRef(_) => 1,
        SourceExpr::BinOp(_, lhs, rhs) => name_ref_count(lhs) + name_ref_count(rhs),
        SourceExpr::UnaryOp(_, operand) => name_ref_count(operand),
        SourceExpr::If(cond, t, f) => name_ref_count(cond) + name_ref_count(t) + name_ref_count(f),
        SourceExpr::Cast(inner, _) => name_ref_count(inner),
        SourceExpr::Concat(parts) => parts.iter().map(name_ref_count).sum(),
        SourceExpr::Index(base, _) => name_ref_count(base),
        SourceExpr::Call(_, args) => args.iter().map(name_ref_count).sum(),
        _ => 0,
    }
}

/// A small pure function is inlined at its call site when its body is a
/// single `return` whose expression has at most 2 operators and at most
/// `arg_count` name references -- matches spec.md §4.5's inlining
/// heuristic exactly. Tunable per spec.md §9 Open Questions; callers that
/// want a different threshold should call [`operator_count`]/
/// [`name_ref_count`] directly rather than fork this function.
pub fn should_inline(body: &[SourceStmt], arg_count: usize) -> bool {
    match body {
        [SourceStmt::Return(expr)] => operator_count(expr) <= 2 && name_ref_count(expr) <= arg_count,
        _ => false,
    }
}

/// Collects every name assigned somewhere inside a `LoopBlock`'s body, at
/// any nesting depth. Per spec.md §3/§4.5 ("assignments that survive a
/// loop body become Registers, state-holding, with an initial value"),
/// these are exactly the names that need register (not plain-variable)
/// semantics once the scheduler splits the loop across states -- a value
/// assigned only within a single state's straight-line code never needs
/// to survive a state transition, but one assigned inside a loop body
/// must hold its value across the cycle boundary the loop introduces.
pub fn registers_in(body: &[Stmt]) -> BTreeSet<String> {
    let mut regs = BTreeSet::new();
    collect_registers(body, false, &mut regs);
    regs
}

fn collect_registers(stmts: &[Stmt], inside_loop: bool, regs: &mut BTreeSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::AssignValue { target, .. } => {
                if inside_loop {
                    regs.insert(target.clone());
                }
            }
            Stmt::LoopBlock { stmts, .. } => collect_registers(stmts, true, regs),
            Stmt::HDLBlock(branches) => {
                for b in branches {
                    collect_registers(&b.stmts, inside_loop, regs);
                }
            }
            Stmt::ContainerBlock(arms) => {
                for (_, body) in arms {
                    collect_registers(body, inside_loop, regs);
                }
            }
            Stmt::IntfBlock { stmts, .. } | Stmt::IntfLoop { stmts, .. } => {
                collect_registers(stmts, inside_loop, regs)
            }
            Stmt::BaseBlock(inner) => collect_registers(inner, inside_loop, regs),
            Stmt::Branch(b) => collect_registers(&b.stmts, inside_loop, regs),
            Stmt::FuncReturn(_) | Stmt::Await(_) | Stmt::Yield(_) => {}
        }
    }
}

/// Cache key for lowered `FunctionCall` IR: `(callable, arg dtypes, kwd
/// names)`. Deriving `Hash`/`Eq` here (rather than keying a `HashMap` on
/// a formatted string) means two differently-typed calls to a
/// same-named function can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub callable: String,
    pub arg_dtypes: Vec<HwType>,
    pub kwds: BTreeSet<String>,
}

impl CallKey {
    pub fn new(callable: impl Into<String>, arg_dtypes: Vec<HwType>, kwds: BTreeSet<String>) -> Self {
        CallKey { callable: callable.into(), arg_dtypes, kwds }
    }
}
