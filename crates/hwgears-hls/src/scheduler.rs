//! Multi-state scheduler: breaks `LoopBlock`s across clock-cycle
//! boundaries and assigns IR to states.
//!
//! The original source carries two partially-overlapping scheduler
//! implementations in `pygears/hls/passes/schedule.py`: a DFS
//! loop-copying pass (`LoopBreaker`/`LoopState`) and a `ScheduleBFS`
//! class. Reading that module shows only the DFS path is ever invoked --
//! the BFS class and its `bfs()` call are commented out of the live
//! `schedule()` function. This module implements only the DFS path; the
//! BFS alternative is not ported.
//!
//! **Loop-breaking.** A `LoopBlock` becomes a two-armed `HDLBlock`: while
//! its test holds, run one iteration of the body then transition to the
//! loop's own state (`AssignValue(_state, k)` + `Await(false)`); once the
//! test fails, transition back to state 0. State `k`'s body is exactly
//! that same two-armed form -- each clock cycle re-evaluates the test and
//! either keeps the loop running or falls back out, matching spec.md
//! §4.6's "entry `HDLBlock` whose single branch contains the loop body;
//! at the body's tail an `Await(false)` ... `AssignValue(_state, k)`" plus
//! "the loop's exit point rewritten to assign `_state = 0` then
//! `Await(false)`".
//!
//! **Ordering.** Loops are numbered in the order a pre-order DFS over the
//! statement tree encounters them, starting at `k = 1` (state `0` is
//! reserved for the entry state), matching spec.md §4.6's tie-break rule.
//! States are sorted by index before being returned, since a nested loop's
//! state is allocated (counter bumped) before its enclosing loop's but
//! pushed to `extra_states` after it returns from the recursive walk.
//!
//! **Yield-splitting.** Spec.md §5 treats every `yield` as a suspension
//! point in its own right, not just the ones inside an explicit loop: a
//! flat sequence of statements containing `N` yields (e.g. the body of an
//! `async with` block with no enclosing loop) schedules into `N` states
//! chained in source order, the last one looping back to state 0. This is
//! handled by [`break_sequence`], applied to every statement list that
//! isn't a `LoopBlock`'s own body. A `LoopBlock` body keeps the original,
//! unsplit per-iteration handling (`break_loops`): its tail already has an
//! explicit transition target (continue vs. exit) governed by the loop's
//! test, and splitting it further at internal yields would need its own
//! join logic the corpus's `pygears` scheduler does not model either.

use hwgears_core::template::bitw;
use hwgears_core::types::HwType;

use crate::ir::{Branch, Expr, NameCtx, ResValue, Stmt, UnaryOp};

/// Name of the synthesized state register, referenced by every broken
/// loop's transition statements.
pub const STATE_VAR: &str = "_state";

/// One clocked state of the scheduled gear body.
#[derive(Debug, Clone)]
pub struct State {
    pub index: u32,
    pub stmts: Vec<Stmt>,
}

/// The scheduler's output: every state, plus the bit width the `_state`
/// register needs to represent all of them.
#[derive(Debug, Clone)]
pub struct ScheduleResult {
    pub states: Vec<State>,
    pub state_width: u32,
}

/// Schedules a gear body into states. State `0` always exists (even for
/// a loop-free body, where it is simply the whole body run once per
/// cycle).
pub fn schedule(body: &[Stmt]) -> ScheduleResult {
    let mut counter = 0u32;
    let mut extra_states = Vec::new();
    let state0_stmts = break_sequence(body, &mut counter, &mut extra_states);

    let mut states = vec![State { index: 0, stmts: state0_stmts }];
    states.extend(extra_states);
    states.sort_by_key(|s| s.index);

    let state_width = state_register_width(states.len() as u32);
    tracing::debug!(num_states = states.len(), state_width, "scheduled gear body");
    ScheduleResult { states, state_width }
}

/// `Variable('_state', reg=true, initial=0)`'s bit width: `bitw(S-1)`
/// where `S` is the number of states, reusing the same `bitw` helper the
/// template evaluator exposes to gear bodies.
fn state_register_width(num_states: u32) -> u32 {
    bitw(num_states.saturating_sub(1) as i64) as u32
}

/// Lowers a `LoopBlock`'s own body: one pass over its statements, no
/// yield-splitting (see the module-level "Yield-splitting" note).
fn break_loops(stmts: &[Stmt], counter: &mut u32, extra_states: &mut Vec<State>) -> Vec<Stmt> {
    stmts.iter().map(|s| break_stmt(s, counter, extra_states)).collect()
}

/// Lowers a non-loop-body statement sequence: one pass over its
/// statements, then split into chained states at every `Yield`.
fn break_sequence(stmts: &[Stmt], counter: &mut u32, extra_states: &mut Vec<State>) -> Vec<Stmt> {
    let lowered = break_loops(stmts, counter, extra_states);
    split_on_yields(lowered, counter, extra_states)
}

/// Splits a lowered statement sequence at every top-level `Yield`: each
/// `Yield` closes out the current state with a transition to a freshly
/// allocated successor state, so `N` sequential yields (with no yields
/// between them other than themselves) schedule into `N` states chained
/// in source order, the last one transitioning back to state 0. A
/// sequence with no `Yield` at all is returned unchanged.
fn split_on_yields(lowered: Vec<Stmt>, counter: &mut u32, extra_states: &mut Vec<State>) -> Vec<Stmt> {
    if !lowered.iter().any(|s| matches!(s, Stmt::Yield(_))) {
        return lowered;
    }

    let mut segments: Vec<Vec<Stmt>> = vec![Vec::new()];
    for stmt in lowered {
        let is_yield = matches!(stmt, Stmt::Yield(_));
        segments.last_mut().expect("always has a current segment").push(stmt);
        if is_yield {
            segments.push(Vec::new());
        }
    }
    // A trailing empty segment means the last yield had nothing after it;
    // its transition-back-to-zero is folded into the prior segment instead
    // of spawning a state that would do nothing but transition.
    if segments.last().is_some_and(Vec::is_empty) {
        segments.pop();
    }

    let mut iter = segments.into_iter();
    let entry = iter.next().expect("at least one segment after a yield was found");
    let rest: Vec<Vec<Stmt>> = iter.collect();
    if rest.is_empty() {
        return entry;
    }

    let seg_states: Vec<u32> = rest
        .iter()
        .map(|_| {
            *counter += 1;
            *counter
        })
        .collect();

    let mut entry = entry;
    entry.push(assign_state(seg_states[0]));
    entry.push(Stmt::Await(bool_lit(false)));

    for (i, mut seg) in rest.into_iter().enumerate() {
        let next = seg_states.get(i + 1).copied().unwrap_or(0);
        seg.push(assign_state(next));
        seg.push(Stmt::Await(bool_lit(false)));
        extra_states.push(State { index: seg_states[i], stmts: seg });
    }

    entry
}

fn break_branches(branches: &[Branch], counter: &mut u32, extra_states: &mut Vec<State>) -> Vec<Branch> {
    branches
        .iter()
        .map(|b| Branch { test: b.test.clone(), stmts: break_sequence(&b.stmts, counter, extra_states) })
        .collect()
}

fn break_arms(
    arms: &[(Option<Expr>, Vec<Stmt>)],
    counter: &mut u32,
    extra_states: &mut Vec<State>,
) -> Vec<(Option<Expr>, Vec<Stmt>)> {
    arms.iter()
        .map(|(test, body)| (test.clone(), break_sequence(body, counter, extra_states)))
        .collect()
}

fn break_stmt(stmt: &Stmt, counter: &mut u32, extra_states: &mut Vec<State>) -> Stmt {
    match stmt {
        Stmt::LoopBlock { test, stmts } => {
            // Pre-order: the outer loop claims the next state number
            // before its body is walked, so nested loops always get a
            // strictly larger index than their enclosing loop.
            *counter += 1;
            let k = *counter;
            let broken_body = break_loops(stmts, counter, extra_states);
            let state_stmt = loop_state_stmt(test.clone(), broken_body, k);
            extra_states.push(State { index: k, stmts: vec![state_stmt.clone()] });
            state_stmt
        }
        Stmt::HDLBlock(branches) => Stmt::HDLBlock(break_branches(branches, counter, extra_states)),
        Stmt::ContainerBlock(arms) => Stmt::ContainerBlock(break_arms(arms, counter, extra_states)),
        Stmt::IntfBlock { interface, bind, stmts } => Stmt::IntfBlock {
            interface: interface.clone(),
            bind: bind.clone(),
            stmts: break_sequence(stmts, counter, extra_states),
        },
        Stmt::IntfLoop { interface, bind, stmts } => Stmt::IntfLoop {
            interface: interface.clone(),
            bind: bind.clone(),
            stmts: break_sequence(stmts, counter, extra_states),
        },
        Stmt::BaseBlock(inner) => Stmt::BaseBlock(break_sequence(inner, counter, extra_states)),
        other => other.clone(),
    }
}

/// Builds the two-armed `HDLBlock` a `LoopBlock` is rewritten into: keep
/// looping (run `body`, transition to state `k`) while `test` holds,
/// otherwise transition back to state 0.
fn loop_state_stmt(test: Expr, body: Vec<Stmt>, next_state: u32) -> Stmt {
    let mut continue_stmts = body;
    continue_stmts.push(assign_state(next_state));
    continue_stmts.push(Stmt::Await(bool_lit(false)));

    let exit_stmts = vec![assign_state(0), Stmt::Await(bool_lit(false))];

    Stmt::HDLBlock(vec![
        Branch { test: test.clone(), stmts: continue_stmts },
        Branch { test: negate(test), stmts: exit_stmts },
    ])
}

fn assign_state(value: u32) -> Stmt {
    Stmt::AssignValue {
        target: STATE_VAR.to_string(),
        value: Expr::Res { value: ResValue::Int(value as i64), dtype: HwType::uint(1) },
    }
}

fn bool_lit(v: bool) -> Expr {
    Expr::Res { value: ResValue::Bool(v), dtype: HwType::uint(1) }
}

fn negate(test: Expr) -> Expr {
    let dtype = test.dtype().clone();
    Expr::UnaryOp { op: UnaryOp::Not, operand: Box::new(test), dtype }
}
