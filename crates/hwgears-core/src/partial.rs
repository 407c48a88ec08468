//! Overload dispatch via buffered partial application.
//!
//! A gear definition with several registered alternatives (e.g. `qrange`
//! dispatching on whether it was called with one, two, or three integer
//! arguments) is modeled as a [`Partial`]: a buffer of already-supplied
//! positional/keyword arguments plus the list of candidate implementations.
//! Calling it extends the buffer, then classifies against every
//! alternative's declared arity (spec §4.2):
//!
//! - if at least one alternative now has enough positional args, each such
//!   alternative is tried in registration order and the first success wins;
//! - if every alternative is still short of args, the call returns a new,
//!   further-buffered [`Partial`] rather than an error (spec §8: `Partial(f)(a)`
//!   returns a partial);
//! - if every alternative that had enough args also failed its body (a type
//!   mismatch, a `false` `enablement`, ...), the failures are aggregated into
//!   one [`CoreError::MultiAlternative`] so the caller sees every reason, not
//!   just the last one.

use std::collections::HashMap;
use std::fmt;

use crate::error::CoreError;

/// A positional or keyword argument buffered on a [`Partial`] before the
/// call is actually dispatched.
#[derive(Debug, Clone)]
pub enum Arg<V> {
    Positional(V),
    Keyword(String, V),
}

/// One candidate implementation of an overloaded gear, with the minimum
/// positional arity it needs before its body can even be attempted.
pub struct Alternative<V, R> {
    pub name: String,
    pub arity: usize,
    pub func: Box<dyn Fn(&[V], &HashMap<String, V>) -> Result<R, CoreError>>,
}

impl<V, R> fmt::Debug for Alternative<V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alternative")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// The result of feeding a [`Partial`] another batch of arguments: either
/// the call resolved (some alternative had enough args and its body
/// succeeded), or every alternative is still short of arguments and the
/// caller gets back a further-buffered partial to keep feeding.
pub enum DispatchOutcome<V, R> {
    Complete(R),
    Incomplete(Partial<V, R>),
}

impl<V, R> DispatchOutcome<V, R> {
    pub fn complete(self) -> Option<R> {
        match self {
            DispatchOutcome::Complete(r) => Some(r),
            DispatchOutcome::Incomplete(_) => None,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, DispatchOutcome::Incomplete(_))
    }
}

/// Buffers arguments across one or more partial-application steps (the
/// `gear(a)(b)(c)` / pipe-chained calling convention) and dispatches to the
/// first alternative that accepts the fully-buffered argument list.
pub struct Partial<V, R> {
    positional: Vec<V>,
    keyword: HashMap<String, V>,
    alternatives: Vec<Alternative<V, R>>,
}

impl<V: Clone, R> Partial<V, R> {
    pub fn new(alternatives: Vec<Alternative<V, R>>) -> Self {
        Partial {
            positional: Vec::new(),
            keyword: HashMap::new(),
            alternatives,
        }
    }

    /// Buffers more arguments without dispatching.
    fn feed(mut self, args: Vec<Arg<V>>) -> Self {
        for a in args {
            match a {
                Arg::Positional(v) => self.positional.push(v),
                Arg::Keyword(k, v) => {
                    self.keyword.insert(k, v);
                }
            }
        }
        self
    }

    /// Buffers `args`, then classifies every alternative by arity (spec
    /// §4.2): alternatives with enough positional args are tried in
    /// registration order. Returns [`DispatchOutcome::Complete`] on the
    /// first success, [`DispatchOutcome::Incomplete`] (wrapping the
    /// extended partial) if every alternative is still short of arguments,
    /// or a [`CoreError::MultiAlternative`] once every arity-satisfied
    /// alternative has definitively failed.
    pub fn call(self, args: Vec<Arg<V>>) -> Result<DispatchOutcome<V, R>, CoreError> {
        let this = self.feed(args);
        let supplied = this.positional.len();
        let any_satisfied = this.alternatives.iter().any(|a| supplied >= a.arity);
        if !any_satisfied {
            return Ok(DispatchOutcome::Incomplete(this));
        }

        let mut failures = Vec::new();
        for alt in &this.alternatives {
            if supplied < alt.arity {
                continue;
            }
            match (alt.func)(&this.positional, &this.keyword) {
                Ok(r) => return Ok(DispatchOutcome::Complete(r)),
                Err(e) => failures.push((alt.name.clone(), e.to_string())),
            }
        }
        Err(CoreError::MultiAlternative(failures))
    }

    /// Convenience for the common case of a single, fully-applied call:
    /// dispatches and requires the result be [`DispatchOutcome::Complete`].
    pub fn call_complete(self, args: Vec<Arg<V>>) -> Result<R, CoreError> {
        match self.call(args)? {
            DispatchOutcome::Complete(r) => Ok(r),
            DispatchOutcome::Incomplete(_) => Err(CoreError::TypeMatch {
                reason: "call left every alternative arity-incomplete".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt(name: &str, arity: usize) -> Alternative<i64, i64> {
        Alternative {
            name: name.to_string(),
            arity,
            func: Box::new(move |pos, _kw| Ok(pos.iter().sum())),
        }
    }

    fn failing_alt(name: &str, arity: usize) -> Alternative<i64, i64> {
        let name_owned = name.to_string();
        Alternative {
            name: name.to_string(),
            arity,
            func: Box::new(move |_pos, _kw| {
                Err(CoreError::TypeMatch {
                    reason: format!("{name_owned} always fails"),
                })
            }),
        }
    }

    #[test]
    fn single_arg_alternative_fires_immediately() {
        let p = Partial::new(vec![alt("one_arg", 1), alt("two_arg", 2)]);
        let result = p.call_complete(vec![Arg::Positional(5)]).unwrap();
        assert_eq!(result, 5);
    }

    #[test]
    fn partial_call_a_then_b_equals_direct_call_ab() {
        // Partial(f)(a) returns a partial; Partial(f)(a)(b) == f(a,b) == Partial(f)(a,b).
        let step1 = Partial::new(vec![alt("two_arg", 2)])
            .call(vec![Arg::Positional(3)])
            .unwrap();
        assert!(step1.is_incomplete());
        let partial_after_a = match step1 {
            DispatchOutcome::Incomplete(p) => p,
            _ => panic!("expected incomplete"),
        };
        let chained = partial_after_a
            .call(vec![Arg::Positional(4)])
            .unwrap()
            .complete()
            .unwrap();

        let direct = Partial::new(vec![alt("two_arg", 2)])
            .call(vec![Arg::Positional(3), Arg::Positional(4)])
            .unwrap()
            .complete()
            .unwrap();

        assert_eq!(chained, 3 + 4);
        assert_eq!(chained, direct);
    }

    #[test]
    fn dispatch_falls_through_alternatives_by_arity() {
        let p = Partial::new(vec![alt("three_arg", 3), alt("one_arg", 1)]);
        let result = p.call_complete(vec![Arg::Positional(10)]).unwrap();
        assert_eq!(result, 10);
    }

    #[test]
    fn dispatch_aggregates_every_arity_satisfied_failure() {
        let p = Partial::new(vec![failing_alt("alt_a", 1), failing_alt("alt_b", 1)]);
        let err = p.call_complete(vec![Arg::Positional(1)]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("alt_a"));
        assert!(msg.contains("alt_b"));
    }

    #[test]
    fn arity_incomplete_alternatives_are_skipped_not_counted_as_failures() {
        // one_arg is satisfied and succeeds, so two_arg (arity-incomplete)
        // must never be invoked or contribute to a failure aggregate.
        let p = Partial::new(vec![alt("one_arg", 1), failing_alt("two_arg", 2)]);
        let result = p.call_complete(vec![Arg::Positional(5)]).unwrap();
        assert_eq!(result, 5);
    }
}
