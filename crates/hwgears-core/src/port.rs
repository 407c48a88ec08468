//! Port and interface connectivity.
//!
//! A gear's `InPort`/`OutPort` pair is connected through an [`Interface`]:
//! the interface is produced by exactly one `OutPort` and consumed by
//! zero or more `InPort`s. Disconnecting is idempotent -- calling it twice
//! (or on a port that was never connected) is a no-op, not an error,
//! since teardown code routinely runs on paths that may have already torn
//! something down.

use crate::error::CoreError;
use crate::id::{HierId, InterfaceId, PortId};
use crate::types::HwType;

/// An input port: consumes one interface.
#[derive(Debug, Clone)]
pub struct InPort {
    pub owner: HierId,
    pub name: String,
    pub dtype: HwType,
    pub source: Option<InterfaceId>,
}

/// An output port: produces one interface.
#[derive(Debug, Clone)]
pub struct OutPort {
    pub owner: HierId,
    pub name: String,
    pub dtype: HwType,
    pub target: Option<InterfaceId>,
}

/// A connection point between exactly one producing [`OutPort`] and zero
/// or more consuming [`InPort`]s.
#[derive(Debug, Clone, Default)]
pub struct Interface {
    pub producer: Option<PortId>,
    pub consumers: Vec<PortId>,
}

impl InPort {
    pub fn new(owner: HierId, name: impl Into<String>, dtype: HwType) -> Self {
        InPort { owner, name: name.into(), dtype, source: None }
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }
}

impl OutPort {
    pub fn new(owner: HierId, name: impl Into<String>, dtype: HwType) -> Self {
        OutPort { owner, name: name.into(), dtype, target: None }
    }

    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }
}

impl Interface {
    /// Attaches `in_port` as an additional consumer of this interface
    /// (fan-out: several consumers may read the same interface).
    pub fn connect_consumer(&mut self, in_port: PortId, intf: InterfaceId, inp: &mut InPort) {
        if !self.consumers.contains(&in_port) {
            self.consumers.push(in_port);
        }
        inp.source = Some(intf);
    }

    /// Removes `in_port` from the consumer list. A no-op if it was never a
    /// consumer.
    pub fn disconnect_consumer(&mut self, in_port: PortId, inp: &mut InPort) {
        self.consumers.retain(|p| *p != in_port);
        inp.source = None;
    }

    /// Clears the producer slot. A no-op if there was none.
    pub fn disconnect_producer(&mut self, out: &mut OutPort) {
        self.producer = None;
        out.target = None;
    }
}

/// Wires `out_port` as the producer and `in_port` as a consumer of
/// `interface`, in one call -- the common case of a direct point-to-point
/// connection.
pub fn connect(
    interface: &mut Interface,
    interface_id: InterfaceId,
    out_port_id: PortId,
    out_port: &mut OutPort,
    in_port_id: PortId,
    in_port: &mut InPort,
) -> Result<(), CoreError> {
    if let Some(existing) = interface.producer {
        if existing != out_port_id {
            return Err(CoreError::InterfaceAlreadyConnected {
                reason: "interface already has a producer".into(),
            });
        }
    } else {
        interface.producer = Some(out_port_id);
    }
    out_port.target = Some(interface_id);
    interface.connect_consumer(in_port_id, interface_id, in_port);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_wires_producer_and_consumer() {
        let mut intf = Interface::default();
        let mut out = OutPort::new(HierId(0), "dout", HwType::uint(8));
        let mut inp = InPort::new(HierId(1), "din", HwType::uint(8));
        connect(&mut intf, InterfaceId(0), PortId(0), &mut out, PortId(1), &mut inp).unwrap();
        assert!(out.is_connected());
        assert!(inp.is_connected());
        assert_eq!(intf.consumers, vec![PortId(1)]);
    }

    #[test]
    fn connecting_second_producer_fails() {
        let mut intf = Interface::default();
        let mut out1 = OutPort::new(HierId(0), "a", HwType::uint(8));
        let mut out2 = OutPort::new(HierId(0), "b", HwType::uint(8));
        let mut inp = InPort::new(HierId(1), "din", HwType::uint(8));
        connect(&mut intf, InterfaceId(0), PortId(0), &mut out1, PortId(2), &mut inp).unwrap();
        let mut inp2 = InPort::new(HierId(1), "din2", HwType::uint(8));
        let result = connect(&mut intf, InterfaceId(0), PortId(1), &mut out2, PortId(3), &mut inp2);
        assert!(result.is_err());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut intf = Interface::default();
        let mut inp = InPort::new(HierId(1), "din", HwType::uint(8));
        intf.disconnect_consumer(PortId(9), &mut inp);
        intf.disconnect_consumer(PortId(9), &mut inp);
        assert!(!inp.is_connected());
    }

    #[test]
    fn fan_out_allows_multiple_consumers() {
        let mut intf = Interface::default();
        let mut inp1 = InPort::new(HierId(1), "a", HwType::uint(8));
        let mut inp2 = InPort::new(HierId(2), "b", HwType::uint(8));
        intf.connect_consumer(PortId(1), InterfaceId(0), &mut inp1);
        intf.connect_consumer(PortId(2), InterfaceId(0), &mut inp2);
        assert_eq!(intf.consumers.len(), 2);
    }
}
