//! Port layer for a Modbus slave that serves one register map over two transports:
//! an RTU serial link and a Modbus/TCP socket.
//!
//! The protocol engine (framing, CRC, function codes, RTU character timing) is
//! supplied by the user through the [`ProtocolEngine`] trait. This crate provides
//! what sits underneath and around it:
//!
//! * [`RegisterStore`] - bit-packed coils and discrete inputs, word-packed input
//!   and holding registers, with range checks that run before any mutation
//! * [`TransportDispatcher`] - drives the TCP socket state machine and lends the
//!   engine to the TCP side for exactly one step per request, preserving the
//!   event the RTU side had pending
//! * [`SerialPort`] and [`TimeoutTimer`] - thin adapters over UART and timer
//!   primitives for the RTU side
//! * [`spawn_poll_task`] - runs the dispatcher on a Tokio runtime
//!
//! # Example
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use dualport::*;
//!
//! struct Engine;
//!
//! impl ProtocolEngine for Engine {
//!     fn step(&mut self, ctx: &mut EngineContext<'_>) {
//!         if let Some(Event::FrameReceived) = ctx.events().take() {
//!             // parse ctx.tcp_request(), execute against ctx.registers(),
//!             // then answer with ctx.send_tcp_response(..)
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let registers = RegisterStore::shared(RegisterMapConfig::default());
//!     let dispatcher = TransportDispatcher::new(
//!         HostSocketChip::new(IpAddr::V4(Ipv4Addr::LOCALHOST)),
//!         Engine,
//!         NetworkConfig::with_port(1502),
//!         registers.clone(),
//!         Arc::new(EventSlot::new()),
//!     );
//!
//!     let _handle = spawn_poll_task(dispatcher, Duration::from_millis(1));
//!     tokio::time::sleep(Duration::from_secs(60)).await;
//! }
//! ```

/// Public constant values related to the port layer
pub mod constants;

mod decode;
mod device;
mod dispatcher;
mod engine;
mod error;
mod event;
mod registers;
mod runtime;
mod serial;
mod tcp;
mod timer;
mod types;

#[cfg(test)]
mod mock;

pub use crate::decode::PhysDecodeLevel;
pub use crate::device::DeviceConfig;
pub use crate::dispatcher::{Exchange, Tick, TransportDispatcher};
pub use crate::engine::{EngineContext, ProtocolEngine};
pub use crate::error::*;
pub use crate::event::{Event, EventSlot};
pub use crate::registers::{RegisterMapConfig, RegisterStore, SharedRegisters, SpaceBounds};
pub use crate::runtime::{create_poll_task, spawn_poll_task, PollTaskHandle};
pub use crate::serial::*;
pub use crate::tcp::{
    ChipTimeout, HostSocketChip, NetInfo, NetworkConfig, SocketBuffers, SocketChip, SocketFlags,
    SocketStatus, TcpSocket,
};
pub use crate::timer::{Countdown, TimeoutTimer, TimerHardware, TokioTimer};
pub use crate::types::{RegisterSpace, TransportMode};
