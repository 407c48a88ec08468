//! HDL code-shape generation: lowers scheduled IR into the final
//! `CombBlock` artifact.
//!
//! `CombBlock` is a plain serializable statement tree, not emitted HDL
//! text -- the out-of-scope text-templated backend is the consumer that
//! turns this into Verilog/SV source, matching spec.md §1's scope
//! boundary. `build` constructs it from a [`crate::scheduler::ScheduleResult`];
//! [`eliminate_dead_branches`] is a dedicated final cleanup pass run once
//! over the constructed tree, kept separate from construction so each
//! half stays independently testable (spec.md §4.7).

use std::collections::BTreeSet;

use hwgears_core::types::HwType;

use crate::ir::{Branch, ComponentField, CompareOp, Expr, NameCtx, ResValue, Stmt};
use crate::scheduler::{ScheduleResult, State, STATE_VAR};

/// The final artifact: a combinational block containing a (possibly
/// trivial, single-state) state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct CombBlock {
    pub stmts: Vec<Stmt>,
}

/// Builds the top-level `CombBlock` from a schedule. A single-state
/// schedule contributes its statements directly; a multi-state schedule
/// is wrapped in one `HDLBlock` whose branches are guarded by
/// `_state == k`, per spec.md §4.6's "State register" rule.
pub fn build(schedule: &ScheduleResult) -> CombBlock {
    if schedule.states.len() == 1 {
        return CombBlock { stmts: schedule.states[0].stmts.clone() };
    }
    let branches = schedule.states.iter().map(state_branch).collect();
    CombBlock { stmts: vec![Stmt::HDLBlock(branches)] }
}

/// Builds the final `CombBlock` the way spec.md §4.7 describes: each
/// state's statements first get `IntfBlock`/`Yield` lowered to entry
/// conditions and per-port guarded assignments (`lower_ports`), then any
/// register write left sitting inside a conditional branch is folded into
/// a single unconditional `ConditionalExpr` assignment (`predicate_registers`),
/// before the states are wrapped in the `_state == k` guard structure and
/// dead branches are pruned. `out_ports` is the gear's output port list in
/// `Yield` tuple order; `registers` is the set of names
/// [`crate::ast::registers_in`] found assigned inside a loop body of the
/// *pre-scheduled* gear body (register identity can't be recovered once
/// loops have been broken into states).
pub fn build_for_gear(
    schedule: &ScheduleResult,
    out_ports: &[String],
    registers: &BTreeSet<String>,
) -> CombBlock {
    let lowered_states: Vec<State> = schedule
        .states
        .iter()
        .map(|s| {
            let ported = lower_ports(&s.stmts, out_ports);
            let predicated = predicate_registers(&ported, registers);
            State { index: s.index, stmts: predicated }
        })
        .collect();
    let lowered = ScheduleResult { states: lowered_states, state_width: schedule.state_width };
    eliminate_dead_branches(&build(&lowered))
}

/// Lowers every `IntfBlock`/`Yield` in `stmts` per spec.md §4.7:
/// - an `IntfBlock` over stream `i` is rewritten into an `HDLBlock` with
///   one branch guarded by `i.valid` (the "contributes `i.valid` to the
///   entry condition" rule), whose body asserts `i.ready := true` before
///   running the (recursively lowered) interior, with every reference to
///   the block's bound name replaced by `Component(i, Data)` -- `async
///   with i as x` really does bind `x` to `i.data`, nothing more;
/// - a `Yield(exprs)` is rewritten into one guarded `data := expr`
///   assignment per destination out-port, guarded by that port's `.ready`.
pub fn lower_ports(stmts: &[Stmt], out_ports: &[String]) -> Vec<Stmt> {
    stmts.iter().map(|s| lower_ports_stmt(s, out_ports)).collect()
}

fn lower_ports_stmt(stmt: &Stmt, out_ports: &[String]) -> Stmt {
    match stmt {
        Stmt::IntfBlock { interface, bind, stmts } => {
            let mut inner = vec![Stmt::AssignValue {
                target: format!("{interface}.ready"),
                value: bool_lit(true),
            }];
            let renamed = rename_stmts(stmts, bind, interface);
            inner.extend(lower_ports(&renamed, out_ports));
            Stmt::HDLBlock(vec![Branch { test: valid_of(interface), stmts: inner }])
        }
        Stmt::IntfLoop { interface, bind, stmts } => {
            let renamed = rename_stmts(stmts, bind, interface);
            Stmt::IntfLoop {
                interface: interface.clone(),
                bind: bind.clone(),
                stmts: lower_ports(&renamed, out_ports),
            }
        }
        Stmt::Yield(exprs) => Stmt::BaseBlock(
            exprs
                .iter()
                .zip(out_ports)
                .map(|(expr, port)| {
                    Stmt::HDLBlock(vec![Branch {
                        test: ready_of(port),
                        stmts: vec![Stmt::AssignValue {
                            target: format!("{port}.data"),
                            value: expr.clone(),
                        }],
                    }])
                })
                .collect(),
        ),
        Stmt::HDLBlock(branches) => Stmt::HDLBlock(
            branches
                .iter()
                .map(|b| Branch { test: b.test.clone(), stmts: lower_ports(&b.stmts, out_ports) })
                .collect(),
        ),
        Stmt::ContainerBlock(arms) => Stmt::ContainerBlock(
            arms.iter()
                .map(|(test, body)| (test.clone(), lower_ports(body, out_ports)))
                .collect(),
        ),
        Stmt::LoopBlock { test, stmts } => {
            Stmt::LoopBlock { test: test.clone(), stmts: lower_ports(stmts, out_ports) }
        }
        Stmt::BaseBlock(inner) => Stmt::BaseBlock(lower_ports(inner, out_ports)),
        Stmt::Branch(b) => {
            Stmt::Branch(Branch { test: b.test.clone(), stmts: lower_ports(&b.stmts, out_ports) })
        }
        other @ (Stmt::AssignValue { .. } | Stmt::FuncReturn(_) | Stmt::Await(_)) => other.clone(),
    }
}

fn bool_lit(v: bool) -> Expr {
    Expr::Res { value: ResValue::Bool(v), dtype: HwType::uint(1) }
}

fn valid_of(interface: &str) -> Expr {
    Expr::Component {
        interface: interface.to_string(),
        field: ComponentField::Valid,
        dtype: HwType::uint(1),
    }
}

fn ready_of(port: &str) -> Expr {
    Expr::Component { interface: port.to_string(), field: ComponentField::Ready, dtype: HwType::uint(1) }
}

/// Replaces every `Name(from)` reference inside `stmts` with
/// `Component(to, Data)` -- the "`x` really means `intf.data`" rewrite an
/// `async with intf as x` binding needs once the block itself becomes an
/// explicit `i.valid`-guarded branch.
fn rename_stmts(stmts: &[Stmt], from: &str, to: &str) -> Vec<Stmt> {
    stmts.iter().map(|s| rename_stmt(s, from, to)).collect()
}

fn rename_stmt(stmt: &Stmt, from: &str, to: &str) -> Stmt {
    let e = |expr: &Expr| rename_expr(expr, from, to);
    match stmt {
        Stmt::AssignValue { target, value } => {
            Stmt::AssignValue { target: target.clone(), value: e(value) }
        }
        Stmt::FuncReturn(expr) => Stmt::FuncReturn(e(expr)),
        Stmt::Await(expr) => Stmt::Await(e(expr)),
        Stmt::Yield(exprs) => Stmt::Yield(exprs.iter().map(e).collect()),
        Stmt::Branch(b) => Stmt::Branch(Branch { test: e(&b.test), stmts: rename_stmts(&b.stmts, from, to) }),
        Stmt::HDLBlock(branches) => Stmt::HDLBlock(
            branches
                .iter()
                .map(|b| Branch { test: e(&b.test), stmts: rename_stmts(&b.stmts, from, to) })
                .collect(),
        ),
        Stmt::LoopBlock { test, stmts } => {
            Stmt::LoopBlock { test: e(test), stmts: rename_stmts(stmts, from, to) }
        }
        Stmt::IntfBlock { interface, bind, stmts } => Stmt::IntfBlock {
            interface: interface.clone(),
            bind: bind.clone(),
            stmts: rename_stmts(stmts, from, to),
        },
        Stmt::IntfLoop { interface, bind, stmts } => Stmt::IntfLoop {
            interface: interface.clone(),
            bind: bind.clone(),
            stmts: rename_stmts(stmts, from, to),
        },
        Stmt::ContainerBlock(arms) => Stmt::ContainerBlock(
            arms.iter()
                .map(|(test, body)| (test.as_ref().map(&e), rename_stmts(body, from, to)))
                .collect(),
        ),
        Stmt::BaseBlock(inner) => Stmt::BaseBlock(rename_stmts(inner, from, to)),
    }
}

fn rename_expr(expr: &Expr, from: &str, to: &str) -> Expr {
    let b = |e: &Expr| Box::new(rename_expr(e, from, to));
    match expr {
        Expr::Name { name, ctx: NameCtx::Load, dtype } if name == from => {
            Expr::Component { interface: to.to_string(), field: ComponentField::Data, dtype: dtype.clone() }
        }
        Expr::BinOp { op, lhs, rhs, dtype } => {
            Expr::BinOp { op: *op, lhs: b(lhs), rhs: b(rhs), dtype: dtype.clone() }
        }
        Expr::UnaryOp { op, operand, dtype } => {
            Expr::UnaryOp { op: *op, operand: b(operand), dtype: dtype.clone() }
        }
        Expr::Compare { op, lhs, rhs, dtype } => {
            Expr::Compare { op: *op, lhs: b(lhs), rhs: b(rhs), dtype: dtype.clone() }
        }
        Expr::Conditional { cond, if_true, if_false, dtype } => Expr::Conditional {
            cond: b(cond),
            if_true: b(if_true),
            if_false: b(if_false),
            dtype: dtype.clone(),
        },
        Expr::Cast { expr, dtype } => Expr::Cast { expr: b(expr), dtype: dtype.clone() },
        Expr::Concat { parts, dtype } => {
            Expr::Concat { parts: parts.iter().map(|p| rename_expr(p, from, to)).collect(), dtype: dtype.clone() }
        }
        Expr::Subscript { base, index, dtype } => {
            Expr::Subscript { base: b(base), index: index.clone(), dtype: dtype.clone() }
        }
        Expr::FunctionCall { name, args, dtype } => Expr::FunctionCall {
            name: name.clone(),
            args: args.iter().map(|a| rename_expr(a, from, to)).collect(),
            dtype: dtype.clone(),
        },
        other => other.clone(),
    }
}

/// Folds register writes sitting inside conditional branches into a
/// single unconditional `AssignValue` per register, per spec.md §4.7:
/// "register writes that happen under a conditional path are rewritten
/// to `ConditionalExpr(new, old, cond)` so unconditional register
/// semantics hold." Operates one nesting level at a time: the immediate
/// branches of an `HDLBlock`/`ContainerBlock` are scanned for writes to
/// names in `registers`, those writes are removed from their branch, and
/// a merged `Conditional` chain (first branch's test checked first,
/// falling through to "keep the old value" if no branch's test holds) is
/// appended after the block. Nested blocks are predicated first via
/// recursion, so a register write several levels deep surfaces one block
/// at a time as the recursion unwinds.
pub fn predicate_registers(stmts: &[Stmt], registers: &BTreeSet<String>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            Stmt::HDLBlock(branches) => {
                let recursed: Vec<Branch> = branches
                    .iter()
                    .map(|b| Branch { test: b.test.clone(), stmts: predicate_registers(&b.stmts, registers) })
                    .collect();
                let arms: Vec<(Expr, Vec<Stmt>)> =
                    recursed.iter().map(|b| (b.test.clone(), b.stmts.clone())).collect();
                let (cleaned, hoisted) = extract_register_writes(&arms, registers);
                let cleaned_branches: Vec<Branch> = cleaned
                    .into_iter()
                    .map(|(test, stmts)| Branch { test, stmts })
                    .collect();
                if !cleaned_branches.iter().all(|b| b.stmts.is_empty()) {
                    out.push(Stmt::HDLBlock(cleaned_branches));
                }
                out.extend(hoisted);
            }
            Stmt::ContainerBlock(arms) => {
                let recursed: Vec<(Option<Expr>, Vec<Stmt>)> = arms
                    .iter()
                    .map(|(test, body)| (test.clone(), predicate_registers(body, registers)))
                    .collect();
                let arms_with_default: Vec<(Expr, Vec<Stmt>)> = recursed
                    .iter()
                    .map(|(test, body)| (test.clone().unwrap_or_else(|| bool_lit(true)), body.clone()))
                    .collect();
                let (cleaned, hoisted) = extract_register_writes(&arms_with_default, registers);
                let cleaned_arms: Vec<(Option<Expr>, Vec<Stmt>)> = recursed
                    .into_iter()
                    .zip(cleaned)
                    .map(|((orig_test, _), (_, stmts))| (orig_test, stmts))
                    .collect();
                if !cleaned_arms.iter().all(|(_, s)| s.is_empty()) {
                    out.push(Stmt::ContainerBlock(cleaned_arms));
                }
                out.extend(hoisted);
            }
            Stmt::LoopBlock { test, stmts } => {
                out.push(Stmt::LoopBlock { test: test.clone(), stmts: predicate_registers(stmts, registers) })
            }
            Stmt::IntfBlock { interface, bind, stmts } => out.push(Stmt::IntfBlock {
                interface: interface.clone(),
                bind: bind.clone(),
                stmts: predicate_registers(stmts, registers),
            }),
            Stmt::IntfLoop { interface, bind, stmts } => out.push(Stmt::IntfLoop {
                interface: interface.clone(),
                bind: bind.clone(),
                stmts: predicate_registers(stmts, registers),
            }),
            Stmt::BaseBlock(inner) => out.push(Stmt::BaseBlock(predicate_registers(inner, registers))),
            Stmt::Branch(b) => out.push(Stmt::Branch(Branch {
                test: b.test.clone(),
                stmts: predicate_registers(&b.stmts, registers),
            })),
            other => out.push(other.clone()),
        }
    }
    out
}

/// Removes the last write to each register name in `registers` from each
/// arm's statement list, returning the cleaned arms plus one hoisted
/// `AssignValue` per register that was written in at least one arm. The
/// hoisted value folds the arms right-to-left (so the first arm's test is
/// checked outermost, matching if/elif priority), defaulting to the
/// register's own prior value when no arm's test holds.
fn extract_register_writes(
    arms: &[(Expr, Vec<Stmt>)],
    registers: &BTreeSet<String>,
) -> (Vec<(Expr, Vec<Stmt>)>, Vec<Stmt>) {
    let mut written_regs: Vec<String> = Vec::new();
    let mut cleaned: Vec<(Expr, Vec<Stmt>)> = Vec::with_capacity(arms.len());
    for (test, stmts) in arms {
        let mut kept = Vec::with_capacity(stmts.len());
        for s in stmts {
            if let Stmt::AssignValue { target, .. } = s {
                if registers.contains(target) {
                    if !written_regs.contains(target) {
                        written_regs.push(target.clone());
                    }
                    continue;
                }
            }
            kept.push(s.clone());
        }
        cleaned.push((test.clone(), kept));
    }

    let mut hoisted = Vec::with_capacity(written_regs.len());
    for reg in &written_regs {
        let dtype = arms
            .iter()
            .flat_map(|(_, stmts)| stmts.iter())
            .find_map(|s| match s {
                Stmt::AssignValue { target, value } if target == reg => Some(value.dtype().clone()),
                _ => None,
            })
            .unwrap_or(HwType::Any);
        let mut acc = Expr::Name { name: reg.clone(), ctx: NameCtx::Load, dtype: dtype.clone() };
        for (test, stmts) in arms.iter().rev() {
            if let Some(write) = last_assign(stmts, reg) {
                acc = Expr::Conditional {
                    cond: Box::new(test.clone()),
                    if_true: Box::new(write),
                    if_false: Box::new(acc),
                    dtype: dtype.clone(),
                };
            }
        }
        hoisted.push(Stmt::AssignValue { target: reg.clone(), value: acc });
    }
    (cleaned, hoisted)
}

fn last_assign(stmts: &[Stmt], target: &str) -> Option<Expr> {
    stmts.iter().rev().find_map(|s| match s {
        Stmt::AssignValue { target: t, value } if t == target => Some(value.clone()),
        _ => None,
    })
}

fn state_branch(state: &State) -> Branch {
    Branch {
        test: state_guard(state.index),
        stmts: state.stmts.clone(),
    }
}

fn state_guard(index: u32) -> Expr {
    Expr::Compare {
        op: CompareOp::Eq,
        lhs: Box::new(Expr::Name {
            name: STATE_VAR.to_string(),
            ctx: crate::ir::NameCtx::Load,
            dtype: HwType::uint(1),
        }),
        rhs: Box::new(Expr::Res { value: ResValue::Int(index as i64), dtype: HwType::uint(1) }),
        dtype: HwType::uint(1),
    }
}

/// Statically-known-false test expressions, recognized for dead-branch
/// elimination: a literal `false`/`0`, or `a == b` where both sides are
/// the identical literal is excluded (that's statically true, not dead) --
/// only the unambiguous `Res(false)`/`Res(0)` case is folded, matching
/// the conservative scope of spec.md §4.7's final pass (this is cleanup,
/// not a general constant-folding optimizer).
fn is_statically_false(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Res { value: ResValue::Bool(false), .. } | Expr::Res { value: ResValue::Int(0), .. }
    )
}

/// Removes `HDLBlock`/`ContainerBlock` branches whose test is statically
/// `false`, and drops an `HDLBlock`/`ContainerBlock` entirely once it has
/// no remaining branches. Recurses into every nested block so branches
/// made unreachable by an earlier rewrite are also cleaned up.
pub fn eliminate_dead_branches(block: &CombBlock) -> CombBlock {
    CombBlock { stmts: clean_stmts(&block.stmts) }
}

fn clean_stmts(stmts: &[Stmt]) -> Vec<Stmt> {
    stmts.iter().filter_map(clean_stmt).collect()
}

fn clean_stmt(stmt: &Stmt) -> Option<Stmt> {
    match stmt {
        Stmt::HDLBlock(branches) => {
            let kept: Vec<Branch> = branches
                .iter()
                .filter(|b| !is_statically_false(&b.test))
                .map(|b| Branch { test: b.test.clone(), stmts: clean_stmts(&b.stmts) })
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Stmt::HDLBlock(kept))
            }
        }
        Stmt::ContainerBlock(arms) => {
            let kept: Vec<(Option<Expr>, Vec<Stmt>)> = arms
                .iter()
                .filter(|(test, _)| !test.as_ref().is_some_and(is_statically_false))
                .map(|(test, body)| (test.clone(), clean_stmts(body)))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Stmt::ContainerBlock(kept))
            }
        }
        Stmt::LoopBlock { test, stmts } => {
            Some(Stmt::LoopBlock { test: test.clone(), stmts: clean_stmts(stmts) })
        }
        Stmt::IntfBlock { interface, bind, stmts } => Some(Stmt::IntfBlock {
            interface: interface.clone(),
            bind: bind.clone(),
            stmts: clean_stmts(stmts),
        }),
        Stmt::IntfLoop { interface, bind, stmts } => Some(Stmt::IntfLoop {
            interface: interface.clone(),
            bind: bind.clone(),
            stmts: clean_stmts(stmts),
        }),
        Stmt::BaseBlock(inner) => Some(Stmt::BaseBlock(clean_stmts(inner))),
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ResValue;
    use crate::scheduler::schedule;

    fn bool_lit(v: bool) -> Expr {
        Expr::Res { value: ResValue::Bool(v), dtype: HwType::uint(1) }
    }

    #[test]
    fn single_state_schedule_yields_flat_comb_block() {
        let body = vec![Stmt::FuncReturn(bool_lit(true))];
        let result = schedule(&body);
        let comb = build(&result);
        assert_eq!(comb.stmts, body);
    }

    #[test]
    fn multi_state_schedule_wraps_in_guarded_hdl_block() {
        let body = vec![Stmt::LoopBlock {
            test: bool_lit(true),
            stmts: vec![Stmt::Await(bool_lit(false))],
        }];
        let result = schedule(&body);
        let comb = build(&result);
        match &comb.stmts[..] {
            [Stmt::HDLBlock(branches)] => assert_eq!(branches.len(), 2),
            _ => panic!("expected a single top-level HDLBlock"),
        }
    }

    #[test]
    fn dead_branch_elimination_drops_statically_false_branch() {
        let block = CombBlock {
            stmts: vec![Stmt::HDLBlock(vec![
                Branch { test: bool_lit(false), stmts: vec![] },
                Branch { test: bool_lit(true), stmts: vec![Stmt::Await(bool_lit(false))] },
            ])],
        };
        let cleaned = eliminate_dead_branches(&block);
        match &cleaned.stmts[..] {
            [Stmt::HDLBlock(branches)] => assert_eq!(branches.len(), 1),
            _ => panic!("expected one surviving branch"),
        }
    }

    #[test]
    fn dead_branch_elimination_drops_block_with_no_branches_left() {
        let block = CombBlock {
            stmts: vec![Stmt::HDLBlock(vec![Branch { test: bool_lit(false), stmts: vec![] }])],
        };
        let cleaned = eliminate_dead_branches(&block);
        assert!(cleaned.stmts.is_empty());
    }

    fn name(n: &str) -> Expr {
        Expr::Name { name: n.to_string(), ctx: NameCtx::Load, dtype: HwType::uint(4) }
    }

    #[test]
    fn intf_block_contributes_valid_guard_and_emits_ready() {
        let body = vec![Stmt::IntfBlock {
            interface: "din".to_string(),
            bind: "c".to_string(),
            stmts: vec![Stmt::Yield(vec![name("c")])],
        }];
        let lowered = lower_ports(&body, &["dout".to_string()]);
        match &lowered[..] {
            [Stmt::HDLBlock(branches)] => {
                assert_eq!(branches.len(), 1);
                assert_eq!(branches[0].test, valid_of("din"));
                match &branches[0].stmts[..] {
                    [Stmt::AssignValue { target, value }, Stmt::BaseBlock(yields)] => {
                        assert_eq!(target, "din.ready");
                        assert_eq!(*value, bool_lit(true));
                        match &yields[..] {
                            [Stmt::HDLBlock(port_branches)] => {
                                assert_eq!(port_branches[0].test, ready_of("dout"));
                                match &port_branches[0].stmts[..] {
                                    [Stmt::AssignValue { target, value }] => {
                                        assert_eq!(target, "dout.data");
                                        // `c` (the bound name) was rewritten to `din.data`.
                                        assert_eq!(
                                            *value,
                                            Expr::Component {
                                                interface: "din".to_string(),
                                                field: ComponentField::Data,
                                                dtype: HwType::uint(4),
                                            }
                                        );
                                    }
                                    other => panic!("unexpected port branch stmts: {other:?}"),
                                }
                            }
                            other => panic!("unexpected yield lowering: {other:?}"),
                        }
                    }
                    other => panic!("unexpected intf block body: {other:?}"),
                }
            }
            other => panic!("unexpected lowering: {other:?}"),
        }
    }

    #[test]
    fn register_write_in_one_branch_folds_to_conditional_assign() {
        let registers: BTreeSet<String> = ["acc".to_string()].into_iter().collect();
        let body = vec![Stmt::HDLBlock(vec![
            Branch {
                test: name("go"),
                stmts: vec![Stmt::AssignValue { target: "acc".to_string(), value: name("c") }],
            },
            Branch { test: bool_lit(true), stmts: vec![Stmt::Await(bool_lit(false))] },
        ])];
        let predicated = predicate_registers(&body, &registers);
        // The conditional register write is hoisted out of the HDLBlock as
        // a single unconditional assignment guarded by a Conditional expr.
        match &predicated[..] {
            [Stmt::HDLBlock(branches), Stmt::AssignValue { target, value }] => {
                assert_eq!(branches[0].stmts.len(), 0);
                assert_eq!(target, "acc");
                match value {
                    Expr::Conditional { cond, if_true, if_false, .. } => {
                        assert_eq!(**cond, name("go"));
                        assert_eq!(**if_true, name("c"));
                        assert_eq!(
                            **if_false,
                            Expr::Name { name: "acc".to_string(), ctx: NameCtx::Load, dtype: HwType::uint(4) }
                        );
                    }
                    other => panic!("expected a Conditional register write, got {other:?}"),
                }
            }
            other => panic!("unexpected predicated output: {other:?}"),
        }
    }

    #[test]
    fn build_for_gear_wires_intf_and_yield_across_states() {
        let body = vec![Stmt::IntfBlock {
            interface: "din".to_string(),
            bind: "c".to_string(),
            stmts: vec![Stmt::Yield(vec![name("c")]), Stmt::Yield(vec![name("c")])],
        }];
        let registers = crate::ast::registers_in(&body);
        let scheduled = schedule(&body);
        let comb = build_for_gear(&scheduled, &["dout".to_string()], &registers);
        assert_eq!(scheduled.states.len(), 2);
        assert!(!comb.stmts.is_empty());
    }
}
