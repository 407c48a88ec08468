//! Core error types for hwgears-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! type-algebra and hierarchy/port failure modes named in the error
//! taxonomy. Elaboration- and HLS-specific errors live in their own crates
//! and wrap `CoreError` via `#[from]`.

use thiserror::Error;

/// Errors produced by the hwgears-core crate: type algebra, partial
/// application, and hierarchy/port construction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unification or keyword-parameter inference failed, including an
    /// `enablement` evaluating to `false`.
    #[error("type match error: {reason}")]
    TypeMatch { reason: String },

    /// Template substitution received the wrong arity or an unknown field
    /// name.
    #[error("template arguments error: {reason}")]
    TemplateArguments { reason: String },

    /// Bitwidth (or another concrete property) was requested of a type that
    /// still has unresolved template arguments.
    #[error("templated type unspecified: {type_repr}")]
    TemplatedTypeUnspecified { type_repr: String },

    /// Attempted to register a name that already exists in some naming
    /// scope (module, hierarchy sibling, registry).
    #[error("duplicate name: '{name}'")]
    DuplicateName { name: String },

    /// A port id referenced a port that does not exist (already removed,
    /// or from a different hierarchy).
    #[error("port not found: {0}")]
    PortNotFound(String),

    /// Attempted to connect an interface to a port that already has a
    /// producer (for `OutPort`) or to set a second producer for an
    /// `Interface`.
    #[error("interface already connected: {reason}")]
    InterfaceAlreadyConnected { reason: String },

    /// Indexing (`t[i]` or `t[slice]`) was out of range for an enumerable
    /// type.
    #[error("index out of range: {index} for type of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Every alternative of an overloaded call failed; aggregates one
    /// error per alternative, in the order alternatives were tried.
    #[error("all {} alternatives failed: {}", .0.len(), summarize(.0))]
    MultiAlternative(Vec<(String, String)>),
}

fn summarize(errs: &[(String, String)]) -> String {
    errs.iter()
        .map(|(name, msg)| format!("{name}: {msg}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_alternative_message_lists_every_failure() {
        let err = CoreError::MultiAlternative(vec![
            ("alt_a".into(), "boom".into()),
            ("alt_b".into(), "kaboom".into()),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("alt_a: boom"));
        assert!(msg.contains("alt_b: kaboom"));
        assert!(msg.starts_with("all 2 alternatives failed"));
    }

    #[test]
    fn type_match_error_carries_reason() {
        let err = CoreError::TypeMatch {
            reason: "enablement condition failed".into(),
        };
        assert_eq!(
            err.to_string(),
            "type match error: enablement condition failed"
        );
    }
}
