//! HLS front-end/back-end error types for hwgears-hls.

use hwgears_elab::ElabError;
use thiserror::Error;

/// Errors produced while lowering a gear body to HDL code-shape.
#[derive(Debug, Error)]
pub enum HlsError {
    /// A gear body used a construct the restricted source AST does not
    /// support (arbitrary host control flow, per the spec's Non-goals).
    #[error("unsupported construct at {location}: {reason}")]
    Syntax { location: String, reason: String },

    /// The scheduler could not allocate states for the control-flow graph
    /// (e.g. a loop with no reachable exit edge).
    #[error("scheduling failed for '{gear}': {reason}")]
    Schedule { gear: String, reason: String },

    #[error(transparent)]
    Elab(#[from] ElabError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwgears_core::CoreError;

    #[test]
    fn elab_error_converts_via_from() {
        let elab: ElabError = CoreError::DuplicateName { name: "x".into() }.into();
        let hls: HlsError = elab.into();
        assert!(matches!(hls, HlsError::Elab(_)));
    }
}
