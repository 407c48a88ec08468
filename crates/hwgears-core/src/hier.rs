//! Arena-based gear hierarchy.
//!
//! The hierarchy is a tree of [`HierNode`]s stored by index in a flat
//! `Vec` arena rather than as directly-linked parent/child references, so
//! nodes can be freely moved between collections without fighting the
//! borrow checker (Design Note §9's "arena of ids" pattern, the same one
//! `lmlang-core` uses for its `StableGraph` node/edge weights).
//!
//! Building a gear hierarchy is a two-phase commit: [`Hierarchy::enter`]
//! pushes a new node and returns a [`HierBuildGuard`] that, if dropped
//! without [`HierBuildGuard::commit`], removes the node again -- so a
//! gear whose body raises partway through elaboration doesn't leave a
//! half-built node behind (mirrors the "teardown unless committed" guard
//! used for scoped resource construction across the corpus).

use std::collections::HashSet;

use crate::error::CoreError;
use crate::id::{HierId, InterfaceId, PortId};
use crate::path::path_name;
use crate::port::{InPort, Interface, OutPort};
use crate::types::HwType;

/// Which side of a connection a [`PortConfig`] describes -- the external
/// contract spec.md §6 names (`port_configs`: each "direction, name,
/// dtype").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    In,
    Out,
}

/// One entry of a node's external port contract, as exposed to the (out
/// of scope) HDL emission backend per spec.md §6.
#[derive(Debug, Clone, PartialEq)]
pub struct PortConfig {
    pub direction: PortDirection,
    pub name: String,
    pub dtype: HwType,
}

/// One node of the gear hierarchy: a named gear instance, its parent (if
/// any), children, and the ports/interfaces that belong to it.
#[derive(Debug, Clone)]
pub struct HierNode {
    pub name: String,
    pub parent: Option<HierId>,
    pub children: Vec<HierId>,
    pub in_ports: Vec<PortId>,
    pub out_ports: Vec<PortId>,
    pub local_interfaces: Vec<InterfaceId>,
    /// `false` once [`Hierarchy::remove`] tombstones the slot; tombstoned
    /// ids are never reused.
    alive: bool,
}

/// Flat arena of [`HierNode`]s plus a stack tracking which node is
/// "current" -- the implicit parent new gears are built under, the way
/// the original tracks a thread-local current-hierarchy pointer.
#[derive(Debug, Default)]
pub struct Hierarchy {
    nodes: Vec<HierNode>,
    current_stack: Vec<HierId>,
    in_ports: Vec<InPort>,
    out_ports: Vec<OutPort>,
    interfaces: Vec<Interface>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Hierarchy::default()
    }

    /// The innermost currently-open hierarchy scope, or `None` at the
    /// root.
    pub fn current(&self) -> Option<HierId> {
        self.current_stack.last().copied()
    }

    pub fn get(&self, id: HierId) -> Option<&HierNode> {
        self.nodes.get(id.0 as usize).filter(|n| n.alive)
    }

    pub fn get_mut(&mut self, id: HierId) -> Option<&mut HierNode> {
        self.nodes.get_mut(id.0 as usize).filter(|n| n.alive)
    }

    /// Full dotted path from the root to `id`, e.g. `top.adder.carry`.
    pub fn path(&self, id: HierId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(node) = self.get(c) else { break };
            parts.push(node.name.clone());
            cur = node.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Disambiguates `name` against the existing children of `parent` by
    /// appending `_1`, `_2`, ... until the name is unique -- the gear
    /// hierarchy's answer to two sibling instances sharing a base name.
    pub fn disambiguate_name(&self, parent: Option<HierId>, name: &str) -> String {
        let siblings: HashSet<&str> = match parent {
            Some(p) => self
                .get(p)
                .map(|n| n.children.iter().filter_map(|c| self.get(*c)).map(|c| c.name.as_str()).collect())
                .unwrap_or_default(),
            None => HashSet::new(),
        };
        if !siblings.contains(name) {
            return name.to_string();
        }
        let mut i = 1;
        loop {
            let candidate = format!("{name}_{i}");
            if !siblings.contains(candidate.as_str()) {
                return candidate;
            }
            i += 1;
        }
    }

    /// Pushes a new node as a child of [`Hierarchy::current`] and opens it
    /// as the current scope, returning a guard that removes the node again
    /// on drop unless [`HierBuildGuard::commit`] is called first.
    pub fn enter(&mut self, name: impl Into<String>) -> Result<HierBuildGuard<'_>, CoreError> {
        let parent = self.current();
        let name = name.into();
        let disambiguated = self.disambiguate_name(parent, &name);
        let id = HierId(self.nodes.len() as u32);
        self.nodes.push(HierNode {
            name: disambiguated,
            parent,
            children: Vec::new(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            local_interfaces: Vec::new(),
            alive: true,
        });
        if let Some(p) = parent {
            if let Some(pn) = self.get_mut(p) {
                pn.children.push(id);
            }
        }
        self.current_stack.push(id);
        tracing::debug!(path = %self.path(id), "entered hierarchy scope");
        Ok(HierBuildGuard {
            hier: self,
            id,
            committed: false,
        })
    }

    /// Tombstones `id` and detaches it from its parent's children list.
    /// Child nodes are tombstoned too (removal is recursive); ids are
    /// never reused so stale [`HierId`]s held elsewhere simply miss on
    /// lookup rather than resolving to a different node.
    pub fn remove(&mut self, id: HierId) {
        let children = self.get(id).map(|n| n.children.clone()).unwrap_or_default();
        for c in children {
            self.remove(c);
        }
        self.disconnect_all_ports(id);
        let parent = self.nodes.get(id.0 as usize).and_then(|n| n.parent);
        if let Some(node) = self.nodes.get_mut(id.0 as usize) {
            node.alive = false;
            node.children.clear();
        }
        if let Some(p) = parent {
            if let Some(pn) = self.get_mut(p) {
                pn.children.retain(|c| *c != id);
            }
        }
    }

    /// Disconnects every `InPort`/`OutPort` belonging to `id` from the
    /// interfaces they reference. Called by [`remove`](Self::remove)
    /// before a node is tombstoned so no interface is left holding a
    /// reference to a port that no longer exists (spec.md §8: "`remove(M)`
    /// leaves zero dangling port references in the parent or in any
    /// connected interface").
    fn disconnect_all_ports(&mut self, id: HierId) {
        let Some(node) = self.get(id) else { return };
        let in_ports = node.in_ports.clone();
        let out_ports = node.out_ports.clone();
        for port_id in in_ports {
            if let Some(source) = self.in_ports.get(port_id.0 as usize).and_then(|p| p.source) {
                if let Some(intf) = self.interfaces.get_mut(source.0 as usize) {
                    intf.consumers.retain(|c| *c != port_id);
                }
            }
            if let Some(p) = self.in_ports.get_mut(port_id.0 as usize) {
                p.source = None;
            }
        }
        for port_id in out_ports {
            if let Some(target) = self.out_ports.get(port_id.0 as usize).and_then(|p| p.target) {
                if let Some(intf) = self.interfaces.get_mut(target.0 as usize) {
                    if intf.producer == Some(port_id) {
                        intf.producer = None;
                    }
                }
            }
            if let Some(p) = self.out_ports.get_mut(port_id.0 as usize) {
                p.target = None;
            }
        }
    }

    /// Allocates a new `InPort` owned by `owner`, registering it on the
    /// node's `in_ports` list. Not yet connected to any interface (spec.md
    /// §4.3 step (iii)/(iv) connects it separately via
    /// [`connect_in_port`](Self::connect_in_port)).
    pub fn alloc_in_port(&mut self, owner: HierId, name: impl Into<String>, dtype: HwType) -> PortId {
        let id = PortId(self.in_ports.len() as u32);
        self.in_ports.push(InPort::new(owner, name, dtype));
        if let Some(node) = self.get_mut(owner) {
            node.in_ports.push(id);
        }
        id
    }

    /// Allocates a new `OutPort` owned by `owner`, together with the one
    /// `Interface` it produces (spec.md §3: "`Interface` ... has exactly
    /// one producer port"; a gear's output always drives an interface,
    /// even before anything consumes it). Registers the port on the
    /// node's `out_ports` list.
    pub fn alloc_out_port(
        &mut self,
        owner: HierId,
        name: impl Into<String>,
        dtype: HwType,
    ) -> (PortId, InterfaceId) {
        let port_id = PortId(self.out_ports.len() as u32);
        self.out_ports.push(OutPort::new(owner, name, dtype));
        let intf_id = InterfaceId(self.interfaces.len() as u32);
        self.interfaces.push(Interface::default());
        self.interfaces[intf_id.0 as usize].producer = Some(port_id);
        self.out_ports[port_id.0 as usize].target = Some(intf_id);
        if let Some(node) = self.get_mut(owner) {
            node.out_ports.push(port_id);
        }
        (port_id, intf_id)
    }

    /// Connects `in_port_id` as a consumer of `interface_id` (spec.md
    /// §4.3 step (iv): "connects each argument interface to one" port).
    /// Fan-out safe: connecting the same port twice is a no-op, and
    /// multiple distinct in-ports may consume the same interface.
    pub fn connect_in_port(&mut self, in_port_id: PortId, interface_id: InterfaceId) -> Result<(), CoreError> {
        if self.interfaces.get(interface_id.0 as usize).is_none() {
            return Err(CoreError::PortNotFound(format!("interface {interface_id}")));
        }
        let Some(inp) = self.in_ports.get_mut(in_port_id.0 as usize) else {
            return Err(CoreError::PortNotFound(format!("in-port {in_port_id}")));
        };
        let intf = &mut self.interfaces[interface_id.0 as usize];
        intf.connect_consumer(in_port_id, interface_id, inp);
        Ok(())
    }

    pub fn in_port(&self, id: PortId) -> Option<&InPort> {
        self.in_ports.get(id.0 as usize)
    }

    pub fn out_port(&self, id: PortId) -> Option<&OutPort> {
        self.out_ports.get(id.0 as usize)
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.get(id.0 as usize)
    }

    /// The flattened, HDL-identifier-safe module name for `id`, per
    /// spec.md §6 (`path_name` mangling of the node's dotted hierarchy
    /// path).
    pub fn module_name(&self, id: HierId) -> String {
        path_name(&self.path(id))
    }

    /// The file an (out-of-scope) HDL backend would emit this node's
    /// body into. This crate does not decide a file extension -- that's
    /// the text-emission backend's call per spec.md §1's scope boundary
    /// -- so it is identical to [`module_name`](Self::module_name).
    pub fn file_basename(&self, id: HierId) -> String {
        self.module_name(id)
    }

    /// The external port contract spec.md §6 exposes to the HDL emitter:
    /// every `InPort` then every `OutPort` of `id`, each with its
    /// direction, name, and dtype.
    pub fn port_configs(&self, id: HierId) -> Vec<PortConfig> {
        let Some(node) = self.get(id) else { return Vec::new() };
        let mut configs = Vec::with_capacity(node.in_ports.len() + node.out_ports.len());
        for p in &node.in_ports {
            if let Some(port) = self.in_port(*p) {
                configs.push(PortConfig {
                    direction: PortDirection::In,
                    name: port.name.clone(),
                    dtype: port.dtype.clone(),
                });
            }
        }
        for p in &node.out_ports {
            if let Some(port) = self.out_port(*p) {
                configs.push(PortConfig {
                    direction: PortDirection::Out,
                    name: port.name.clone(),
                    dtype: port.dtype.clone(),
                });
            }
        }
        configs
    }
}

/// RAII guard returned by [`Hierarchy::enter`]. Dropping it without
/// calling [`commit`](HierBuildGuard::commit) rolls the node back out of
/// the hierarchy and pops the current-scope stack, so a gear body that
/// bails out partway through (an `Err` propagated with `?`) doesn't leave
/// a half-built node or a stuck "current hierarchy" pointer behind.
pub struct HierBuildGuard<'a> {
    hier: &'a mut Hierarchy,
    id: HierId,
    committed: bool,
}

impl<'a> HierBuildGuard<'a> {
    pub fn id(&self) -> HierId {
        self.id
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        self.hier
    }

    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        self.hier
    }

    /// Keeps the node permanently instead of rolling it back on drop.
    pub fn commit(mut self) -> HierId {
        self.committed = true;
        self.id
    }
}

impl<'a> Drop for HierBuildGuard<'a> {
    fn drop(&mut self) {
        self.hier.current_stack.pop();
        if !self.committed {
            tracing::warn!(path = %self.hier.path(self.id), "rolling back uncommitted hierarchy scope");
            self.hier.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_commit_builds_a_path() {
        let mut hier = Hierarchy::new();
        let mut top_guard = hier.enter("top").unwrap();
        let child;
        {
            let adder_guard = top_guard.hierarchy_mut().enter("adder").unwrap();
            assert_eq!(adder_guard.hierarchy().current(), Some(adder_guard.id()));
            child = adder_guard.commit();
        }
        let top = top_guard.commit();
        assert_eq!(hier.current(), None);
        assert_eq!(hier.path(child), "top.adder");
        assert_eq!(hier.get(top).unwrap().children, vec![child]);
    }

    #[test]
    fn uncommitted_guard_rolls_back_on_drop() {
        let mut hier = Hierarchy::new();
        let mut top_guard = hier.enter("top").unwrap();
        {
            let _doomed = top_guard.hierarchy_mut().enter("doomed").unwrap();
        }
        let top = top_guard.commit();
        assert!(hier.get(top).unwrap().children.is_empty());
    }

    #[test]
    fn disambiguate_name_appends_suffix() {
        let mut hier = Hierarchy::new();
        let mut top_guard = hier.enter("top").unwrap();
        {
            top_guard.hierarchy_mut().enter("add").unwrap().commit();
        }
        let second = {
            top_guard.hierarchy_mut().enter("add").unwrap().commit()
        };
        top_guard.commit();
        assert_eq!(hier.get(second).unwrap().name, "add_1");
    }

    #[test]
    fn remove_is_recursive() {
        let mut hier = Hierarchy::new();
        let mut top_guard = hier.enter("top").unwrap();
        let mid = {
            let mut mid_guard = top_guard.hierarchy_mut().enter("mid").unwrap();
            {
                mid_guard.hierarchy_mut().enter("leaf").unwrap().commit();
            }
            mid_guard.commit()
        };
        let top = top_guard.commit();
        hier.remove(mid);
        assert!(hier.get(mid).is_none());
        assert!(hier.get(top).unwrap().children.is_empty());
    }

    #[test]
    fn alloc_out_port_eagerly_creates_its_interface() {
        let mut hier = Hierarchy::new();
        let top = hier.enter("top").unwrap().commit();
        let (out_port, intf_id) = hier.alloc_out_port(top, "dout", HwType::uint(8));
        assert_eq!(hier.get(top).unwrap().out_ports, vec![out_port]);
        assert_eq!(hier.out_port(out_port).unwrap().target, Some(intf_id));
        assert_eq!(hier.interface(intf_id).unwrap().producer, Some(out_port));
    }

    #[test]
    fn connect_in_port_registers_consumer_on_both_sides() {
        let mut hier = Hierarchy::new();
        let producer = hier.enter("producer").unwrap().commit();
        let consumer = hier.enter("consumer").unwrap().commit();
        let (_, intf_id) = hier.alloc_out_port(producer, "dout", HwType::uint(8));
        let in_port = hier.alloc_in_port(consumer, "din", HwType::uint(8));

        hier.connect_in_port(in_port, intf_id).unwrap();

        assert_eq!(hier.in_port(in_port).unwrap().source, Some(intf_id));
        assert_eq!(hier.interface(intf_id).unwrap().consumers, vec![in_port]);
    }

    #[test]
    fn remove_disconnects_ports_from_their_interfaces() {
        let mut hier = Hierarchy::new();
        let producer = hier.enter("producer").unwrap().commit();
        let consumer = hier.enter("consumer").unwrap().commit();
        let (out_port, intf_id) = hier.alloc_out_port(producer, "dout", HwType::uint(8));
        let in_port = hier.alloc_in_port(consumer, "din", HwType::uint(8));
        hier.connect_in_port(in_port, intf_id).unwrap();

        hier.remove(consumer);
        assert_eq!(hier.interface(intf_id).unwrap().consumers, Vec::<PortId>::new());
        assert_eq!(hier.in_port(in_port).unwrap().source, None);

        hier.remove(producer);
        assert_eq!(hier.interface(intf_id).unwrap().producer, None);
        assert_eq!(hier.out_port(out_port).unwrap().target, None);
    }

    #[test]
    fn port_configs_lists_inputs_then_outputs() {
        let mut hier = Hierarchy::new();
        let top = hier.enter("top").unwrap().commit();
        hier.alloc_in_port(top, "a", HwType::uint(4));
        hier.alloc_in_port(top, "b", HwType::uint(4));
        hier.alloc_out_port(top, "dout", HwType::uint(4));

        let configs = hier.port_configs(top);
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[0].direction, PortDirection::In);
        assert_eq!(configs[0].name, "a");
        assert_eq!(configs[2].direction, PortDirection::Out);
        assert_eq!(configs[2].name, "dout");
    }

    #[test]
    fn module_name_uses_path_mangling() {
        let mut hier = Hierarchy::new();
        let mut top_guard = hier.enter("top").unwrap();
        let child = top_guard.hierarchy_mut().enter("adder").unwrap().commit();
        top_guard.commit();
        assert_eq!(hier.module_name(child), path_name(&hier.path(child)));
        assert_eq!(hier.file_basename(child), hier.module_name(child));
    }
}
