//! Elaboration error types for hwgears-elab.

use hwgears_core::CoreError;
use thiserror::Error;

/// Errors produced while instantiating gears into a hierarchy.
#[derive(Debug, Error)]
pub enum ElabError {
    /// A gear's output type still has unresolved template arguments after
    /// every inference pass ran.
    #[error("gear '{gear}' output type not fully specified: {type_repr}")]
    GearTypeNotSpecified { gear: String, type_repr: String },

    /// A gear was called without enough arguments to bind its mandatory
    /// parameters, and no alternative or default covers the gap.
    #[error("gear '{gear}' missing required arguments: {missing}")]
    GearArgsNotSpecified { gear: String, missing: String },

    /// More positional arguments were supplied than the gear declares
    /// parameters for.
    #[error("gear '{gear}' received {got} arguments, expects at most {max}")]
    TooManyArguments { gear: String, got: usize, max: usize },

    /// Type inference did not converge within the configured pass budget.
    #[error("gear '{gear}' type inference did not converge after {passes} passes")]
    InferenceDidNotConverge { gear: String, passes: u32 },

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_converts_via_from() {
        let core: CoreError = CoreError::DuplicateName { name: "x".into() };
        let elab: ElabError = core.into();
        assert!(matches!(elab, ElabError::Core(_)));
    }
}
