//! Parametric hardware type algebra, gear hierarchy, and port model.
//!
//! This crate has no notion of elaboration order or scheduling -- it is
//! the structural substrate that `hwgears-elab` and `hwgears-hls` build
//! on: the fixed type-variant set ([`types`]), the restricted template
//! expression language ([`template`]) and the structural operations over
//! types it powers ([`type_ops`]), overload dispatch ([`partial`]), the
//! gear hierarchy arena ([`hier`]) and its port/interface connectivity
//! ([`port`]), and the ambient concerns every downstream crate shares:
//! ids ([`id`]), errors ([`error`]), configuration ([`config`]), path
//! mangling ([`path`]), and the cosimulation wire format ([`wire`]).

pub mod config;
pub mod error;
pub mod hier;
pub mod id;
pub mod partial;
pub mod path;
pub mod port;
pub mod template;
pub mod type_ops;
pub mod types;
pub mod wire;

pub use error::CoreError;
pub use hier::{PortConfig, PortDirection};
pub use id::{HierId, InterfaceId, PortId, Width};
pub use types::{Field, HwType, TypeArg};
