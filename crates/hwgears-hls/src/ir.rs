//! Typed expression/statement IR lowered from a gear body.
//!
//! Every node here carries (or derives) a concrete [`HwType`] -- there is
//! no untyped IR stage. The statement set is deliberately closed: a gear
//! body can only be built from the variants below (via
//! `hwgears_hls::ast`'s constructor functions), not from arbitrary
//! control flow, per spec.md's Non-goal on host-language control flow.

use hwgears_core::types::HwType;

/// Binary/unary operators carried by [`Expr::BinOp`]/[`Expr::UnaryOp`].
pub use hwgears_core::type_ops::ArithOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// The interface sub-field a [`Expr::Component`] projects out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentField {
    Data,
    Valid,
    Ready,
    Eot,
}

/// Load/store/enable context for a [`Expr::Name`] reference, mirroring
/// how the same name means different things on the left vs. right of an
/// assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCtx {
    Load,
    Store,
    Enable,
}

/// A literal value carried by [`Expr::Res`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResValue {
    Int(i64),
    Bool(bool),
}

/// A key into a [`Expr::Subscript`]: either an integer index or a named
/// field (tuple/union field name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexKey {
    Int(i64),
    Name(String),
}

/// A typed expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value (`ResExpr` in the original naming).
    Res { value: ResValue, dtype: HwType },
    /// A name reference with load/store/enable context.
    Name { name: String, ctx: NameCtx, dtype: HwType },
    BinOp { op: ArithOp, lhs: Box<Expr>, rhs: Box<Expr>, dtype: HwType },
    UnaryOp { op: UnaryOp, operand: Box<Expr>, dtype: HwType },
    /// An equality/inequality comparison; always `Uint[1]`. Kept distinct
    /// from [`ArithOp`] since comparisons don't follow the arithmetic
    /// width-growth rules -- the state register guards (`_state == k`)
    /// the code-shape generator emits are the main user.
    Compare { op: CompareOp, lhs: Box<Expr>, rhs: Box<Expr>, dtype: HwType },
    /// `if cond { if_true } else { if_false }`, as a value expression.
    Conditional { cond: Box<Expr>, if_true: Box<Expr>, if_false: Box<Expr>, dtype: HwType },
    Cast { expr: Box<Expr>, dtype: HwType },
    Concat { parts: Vec<Expr>, dtype: HwType },
    Subscript { base: Box<Expr>, index: IndexKey, dtype: HwType },
    /// Projects one sub-field (`data`/`valid`/`ready`/`eot`) of an
    /// interface.
    Component { interface: String, field: ComponentField, dtype: HwType },
    FunctionCall { name: String, args: Vec<Expr>, dtype: HwType },
    /// Pulls the current value off a stream interface (the expression
    /// form of `async with intf as x`).
    InterfacePull { interface: String, dtype: HwType },
}

impl Expr {
    pub fn dtype(&self) -> &HwType {
        match self {
            Expr::Res { dtype, .. }
            | Expr::Name { dtype, .. }
            | Expr::BinOp { dtype, .. }
            | Expr::UnaryOp { dtype, .. }
            | Expr::Compare { dtype, .. }
            | Expr::Conditional { dtype, .. }
            | Expr::Cast { dtype, .. }
            | Expr::Concat { dtype, .. }
            | Expr::Subscript { dtype, .. }
            | Expr::Component { dtype, .. }
            | Expr::FunctionCall { dtype, .. }
            | Expr::InterfacePull { dtype, .. } => dtype,
        }
    }
}

/// One test-guarded group of statements inside an [`Stmt::HDLBlock`].
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub test: Expr,
    pub stmts: Vec<Stmt>,
}

/// A statement in a gear body's lowered control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    AssignValue { target: String, value: Expr },
    FuncReturn(Expr),
    /// Suspends the current cycle. `Await(false)` is the unconditional
    /// "stop here, resume next state" form the loop-breaker emits.
    Await(Expr),
    Yield(Vec<Expr>),
    Branch(Branch),
    /// An ordered list of mutually-exclusive guarded branches -- the
    /// lowering target for both `if`/`elif` chains and loop-breaking.
    HDLBlock(Vec<Branch>),
    LoopBlock { test: Expr, stmts: Vec<Stmt> },
    /// `async with intf as x: stmts` -- one interface handshake window.
    IntfBlock { interface: String, bind: String, stmts: Vec<Stmt> },
    /// `async for x in intf: stmts` -- a streaming consume loop.
    IntfLoop { interface: String, bind: String, stmts: Vec<Stmt> },
    /// An `if`/`else if`/`else` chain, each arm's test `None` for a
    /// trailing `else`.
    ContainerBlock(Vec<(Option<Expr>, Vec<Stmt>)>),
    /// A plain, unconditional sequence.
    BaseBlock(Vec<Stmt>),
}

/// Which block-opening statement a structured-control `Sink` marker
/// closes. The CFG (`cfg.rs`) attaches one `Sink` per block so a scope
/// walk can always find the unique node closing any open block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    HDLBlock,
    LoopBlock,
    IntfBlock,
    IntfLoop,
    ContainerBlock,
    BaseBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_dtype_recovers_declared_type() {
        let e = Expr::Res { value: ResValue::Int(3), dtype: HwType::uint(2) };
        assert_eq!(e.dtype(), &HwType::uint(2));
    }

    #[test]
    fn branch_holds_nested_statements() {
        let branch = Branch {
            test: Expr::Res { value: ResValue::Bool(true), dtype: HwType::uint(1) },
            stmts: vec![Stmt::FuncReturn(Expr::Res {
                value: ResValue::Int(0),
                dtype: HwType::uint(1),
            })],
        };
        assert_eq!(branch.stmts.len(), 1);
    }
}
