use std::sync::{Arc, PoisonError};

use crate::decode::PhysDisplay;
use crate::engine::{EngineContext, ProtocolEngine};
use crate::error::TransportError;
use crate::event::{Event, EventSlot};
use crate::registers::SharedRegisters;
use crate::tcp::{NetworkConfig, SocketChip, SocketStatus, Step, TcpSocket};
use crate::types::TransportMode;

/// One TCP request serviced during a poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exchange {
    /// number of request bytes read from the socket
    pub request_len: usize,
    /// number of response bytes handed to the chip, `None` if the engine produced no response
    pub response_len: Option<usize>,
}

/// What happened during one call to [`TransportDispatcher::poll`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// socket status observed, `None` if the chip could not be initialised
    pub status: Option<SocketStatus>,
    /// logical connection state after the poll
    pub connected: bool,
    /// request serviced during the poll, if any
    pub exchange: Option<Exchange>,
    /// first recoverable error recorded during the poll
    pub fault: Option<TransportError>,
}

/// Multiplexes the RTU and TCP transports onto one protocol engine
///
/// The engine normally runs in RTU mode. When a TCP request arrives the
/// dispatcher saves the engine's pending event, switches to TCP mode for
/// exactly one engine step, then switches back and restores the event, so
/// work queued by the RTU side is neither lost nor misrouted.
pub struct TransportDispatcher<C, E> {
    chip: C,
    engine: E,
    socket: TcpSocket,
    mode: TransportMode,
    events: Arc<EventSlot>,
    registers: SharedRegisters,
}

impl<C, E> TransportDispatcher<C, E>
where
    C: SocketChip,
    E: ProtocolEngine,
{
    /// Create a dispatcher, the chip is initialised on the first poll
    pub fn new(
        chip: C,
        engine: E,
        network: NetworkConfig,
        registers: SharedRegisters,
        events: Arc<EventSlot>,
    ) -> Self {
        Self {
            chip,
            engine,
            socket: TcpSocket::new(network),
            mode: TransportMode::Rtu,
            events,
            registers,
        }
    }

    /// Advance the TCP side by one scheduler tick
    ///
    /// Never blocks and never fails, errors are recorded in the returned
    /// [`Tick`] and recovered from on the next poll.
    pub fn poll(&mut self) -> Tick {
        let mut tick = Tick::default();

        if let Err(err) = self.socket.ensure_ready(&mut self.chip) {
            tracing::warn!("chip initialisation failed: {}", err);
            tick.fault = Some(err);
            return tick;
        }

        if let Err(err) = self.socket.check_link(&mut self.chip) {
            tick.fault = Some(err);
        }

        match self.socket.step(&mut self.chip) {
            Ok(Step::Idle) => {}
            Ok(Step::Established { pending }) => {
                if pending > 0 {
                    let (exchange, fault) = self.service(pending);
                    tick.exchange = exchange;
                    tick.fault = tick.fault.or(fault);
                }
                let units = self.socket.config().keepalive_units();
                if let Err(err) = self.chip.set_keepalive(units) {
                    tracing::warn!("unable to program keepalive: {}", err);
                    tick.fault = tick.fault.or(Some(err));
                }
            }
            Err(err) => {
                tracing::warn!("socket operation failed: {}", err);
                tick.fault = tick.fault.or(Some(err));
            }
        }

        tick.status = Some(self.socket.status());
        tick.connected = self.socket.connected();
        tick
    }

    /// Run one engine step in RTU mode
    ///
    /// This is the RTU half of the scheduler tick. It never overlaps a TCP
    /// step because both run on the dispatcher's `&mut self`.
    pub fn poll_engine(&mut self) {
        debug_assert_eq!(self.mode, TransportMode::Rtu);
        let mut registers = self
            .registers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ctx = EngineContext::new(
            TransportMode::Rtu,
            &self.events,
            &mut registers,
            &mut self.socket,
        );
        self.engine.step(&mut ctx);
    }

    fn service(&mut self, pending: usize) -> (Option<Exchange>, Option<TransportError>) {
        let decode = self.socket.config().decode;
        let saved = self.events.take();

        let request_len = match self.socket.receive(&mut self.chip, pending) {
            Ok(request) => {
                if decode.enabled() {
                    tracing::info!("TCP RX - {}", PhysDisplay::new(decode, request));
                }
                request.len()
            }
            Err(err) => {
                tracing::warn!("unable to receive request: {}", err);
                self.events.restore(saved);
                return (None, Some(err));
            }
        };

        self.mode = TransportMode::Tcp;
        self.events.post(Event::FrameReceived);
        {
            let mut registers = self
                .registers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut ctx =
                EngineContext::new(self.mode, &self.events, &mut registers, &mut self.socket);
            self.engine.step(&mut ctx);
        }

        let (response_len, fault) = self.send_response();

        self.mode = TransportMode::Rtu;
        self.events.restore(saved);

        (
            Some(Exchange {
                request_len,
                response_len,
            }),
            fault,
        )
    }

    fn send_response(&mut self) -> (Option<usize>, Option<TransportError>) {
        let decode = self.socket.config().decode;
        let frame = match self.socket.take_response() {
            Some(frame) => frame,
            None => {
                tracing::warn!("engine produced no response to TCP request");
                return (None, Some(TransportError::Busy));
            }
        };

        if decode.enabled() {
            tracing::info!("TCP TX - {}", PhysDisplay::new(decode, frame));
        }

        let len = frame.len();
        match self.chip.send(frame) {
            Ok(count) => {
                let count = std::cmp::min(count, len);
                if count < len {
                    tracing::warn!("chip accepted {} of {} response bytes", count, len);
                }
                self.socket.mark_sent();
                (Some(count), None)
            }
            Err(err) => {
                tracing::warn!("unable to send response: {}", err);
                (None, Some(err))
            }
        }
    }

    /// Replace the network configuration, the chip is re-initialised on the next poll
    pub fn set_network_config(&mut self, config: NetworkConfig) {
        tracing::info!("network configuration changed");
        self.socket.reconfigure(config);
    }

    /// Transport the engine is currently bound to
    ///
    /// Always [`TransportMode::Rtu`] between polls.
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// State of the TCP socket
    pub fn socket(&self) -> &TcpSocket {
        &self.socket
    }

    /// The engine's event slot
    pub fn events(&self) -> &Arc<EventSlot> {
        &self.events
    }

    /// The shared register map
    pub fn registers(&self) -> &SharedRegisters {
        &self.registers
    }

    /// Access the chip
    pub fn chip(&self) -> &C {
        &self.chip
    }

    /// Mutable access to the chip
    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }

    /// Access the engine
    pub fn engine(&self) -> &E {
        &self.engine
    }
}
