//! Fixed-point type inference over a gear's parameter templates.
//!
//! Each pass resolves as many `TypeArg::Template` slots as the current
//! bindings allow (`hwgears_core::type_ops::subst`), then feeds the newly
//! resolved argument types back into the environment for the next pass.
//! The loop stops the moment a pass makes no further progress, or after
//! [`MAX_INFER_PASSES`] passes -- a bound the original does not need
//! (Python recursion naturally halts on these term sizes) but that a
//! non-recursive Rust loop must impose explicitly to guarantee
//! termination on a pathological template cycle (see DESIGN.md).

use hwgears_core::template::{Env, Value};
use hwgears_core::types::HwType;

/// Upper bound on fixed-point substitution passes. Chosen as
/// `params.len() + 1`: one pass to resolve each parameter in the worst
/// case where every parameter's template depends on exactly one other,
/// plus one extra pass to confirm the fixed point.
pub fn max_infer_passes(param_count: usize) -> u32 {
    param_count as u32 + 1
}

/// Runs substitution passes over `types` against `env` until a pass makes
/// no change, or until `max_passes` is reached. Returns the final
/// (possibly still partially templated) types, whether every type reached
/// `specified()`, and whether a fixed point was actually reached (`false`
/// means the pass budget ran out while substitution was still making
/// progress -- a genuinely different failure from a template that settled
/// on an unbound name, see [`crate::error::ElabError::InferenceDidNotConverge`]).
pub fn run_to_fixed_point(
    types: &[HwType],
    env: &mut Env,
    max_passes: u32,
) -> (Vec<HwType>, bool, bool) {
    let mut current: Vec<HwType> = types.to_vec();
    let mut passes_run = 0u32;
    let mut converged = false;
    for _ in 0..max_passes {
        passes_run += 1;
        let next: Vec<HwType> = current
            .iter()
            .map(|t| hwgears_core::type_ops::subst(t, env))
            .collect();
        let changed = next != current;
        current = next;
        if !changed {
            converged = true;
            break;
        }
    }
    let all_specified = current.iter().all(|t| t.specified());
    if !all_specified {
        tracing::debug!(passes_run, max_passes, converged, "template inference left unresolved types");
    }
    (current, all_specified, converged)
}

/// Expands a variadic parameter declared as `*name: T` into concrete
/// per-instance names `name0, name1, ..., name{n-1}` plus the aggregate
/// name itself, matching the original's variadic-gear call convention
/// (`*din` binds both `din0..dinN` and the tuple `din`).
pub fn expand_variadic(name: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{name}{i}")).collect()
}

/// Binds a plain (non-template) value into `env` under `name`.
pub fn bind_int(env: &mut Env, name: &str, value: i64) {
    env.insert(name.to_string(), Value::Int(value));
}

pub fn bind_type(env: &mut Env, name: &str, value: HwType) {
    env.insert(name.to_string(), Value::Type(value));
}
