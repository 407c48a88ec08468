//! The elaboration context: owns the gear hierarchy and configuration for
//! one elaboration run.
//!
//! The original source reaches for a process-global `registry('CurrentHier')`
//! pointer and a module-level type registry. This crate replaces both with
//! one explicit, non-global struct created once per run and threaded
//! through by `&mut` reference -- nothing here is a `static`.

use hwgears_core::config::RegistryDefaults;
use hwgears_core::hier::{HierBuildGuard, Hierarchy};
use hwgears_core::id::HierId;

/// Owns the gear hierarchy and registry defaults for one elaboration run.
pub struct ElaborationContext {
    pub hierarchy: Hierarchy,
    pub config: RegistryDefaults,
}

impl Default for ElaborationContext {
    fn default() -> Self {
        ElaborationContext {
            hierarchy: Hierarchy::new(),
            config: RegistryDefaults::default(),
        }
    }
}

impl ElaborationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new hierarchy scope as a child of the current one. The
    /// returned [`HierScope`] is the RAII analog of the original's
    /// `create_hier` context manager: dropping it without `commit`
    /// rolls the node (and its current-scope membership) back out,
    /// exactly like every other `?`-propagated construction failure.
    pub fn enter(&mut self, name: impl Into<String>) -> HierScope<'_> {
        HierScope {
            guard: self
                .hierarchy
                .enter(name)
                .expect("Hierarchy::enter is infallible in the current implementation"),
        }
    }

    pub fn current(&self) -> Option<HierId> {
        self.hierarchy.current()
    }
}

/// Thin, elaboration-level name for [`HierBuildGuard`] -- kept as its own
/// type so `hwgears-elab` callers don't need to reach into
/// `hwgears_core::hier` directly for the common case.
pub struct HierScope<'a> {
    guard: HierBuildGuard<'a>,
}

impl<'a> HierScope<'a> {
    pub fn id(&self) -> HierId {
        self.guard.id()
    }

    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        self.guard.hierarchy_mut()
    }

    pub fn commit(self) -> HierId {
        self.guard.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_commit_registers_a_node() {
        let mut ctx = ElaborationContext::new();
        let top = ctx.enter("top").commit();
        assert_eq!(ctx.hierarchy.get(top).unwrap().name, "top");
    }

    #[test]
    fn dropped_scope_rolls_back() {
        let mut ctx = ElaborationContext::new();
        let mut top_scope = ctx.enter("top");
        {
            let _doomed = top_scope.hierarchy_mut().enter("doomed").unwrap();
        }
        let top = top_scope.commit();
        assert!(ctx.hierarchy.get(top).unwrap().children.is_empty());
    }
}
