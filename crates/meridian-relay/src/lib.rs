//! # Meridian Relay
//!
//! Core of the Meridian UDP relay: a single non-blocking rendezvous socket
//! forwarding datagrams between two logical peers, "north" and "south".
//!
//! This crate provides:
//! - Non-blocking UDP socket lifecycle (create, configure, bind, release)
//! - Call-driven receive/send per direction with source-port classification
//! - A closed error enumeration returned as values, never panics
//! - A link-condition simulator (latency, loss, bandwidth, MTU) for
//!   benchmarking traffic through the relay
//!
//! The relay never loops or spawns threads internally; the caller drives it
//! with whatever polling or readiness scheme it prefers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod condition;
pub mod config;
pub mod error;
pub mod relay;
pub mod socket;
pub mod stats;

pub use condition::{Condition, ConditionConfig, ConditionError};
pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use relay::{Direction, Relay};
pub use socket::RelaySocket;
pub use stats::RelayStats;
