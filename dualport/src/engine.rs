use crate::event::EventSlot;
use crate::registers::RegisterStore;
use crate::tcp::TcpSocket;
use crate::types::TransportMode;

/// The Modbus protocol engine driven by the dispatcher
///
/// The engine owns framing, CRC, exception generation and RTU character
/// timing. Each call to `step` consumes at most one event from the slot and
/// performs the matching work against the transport selected by the context.
pub trait ProtocolEngine: Send {
    /// Run one step of the engine's event loop
    fn step(&mut self, ctx: &mut EngineContext<'_>);
}

/// Everything an engine step may touch
///
/// A context is only alive for the duration of one step, which is what keeps
/// the transport mode from changing under a running engine.
pub struct EngineContext<'a> {
    mode: TransportMode,
    events: &'a EventSlot,
    registers: &'a mut RegisterStore,
    socket: &'a mut TcpSocket,
}

impl<'a> EngineContext<'a> {
    pub(crate) fn new(
        mode: TransportMode,
        events: &'a EventSlot,
        registers: &'a mut RegisterStore,
        socket: &'a mut TcpSocket,
    ) -> Self {
        Self {
            mode,
            events,
            registers,
            socket,
        }
    }

    /// Transport the engine's frame primitives talk to during this step
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// The engine's single-slot event queue
    pub fn events(&self) -> &EventSlot {
        self.events
    }

    /// The register map
    pub fn registers(&mut self) -> &mut RegisterStore {
        &mut *self.registers
    }

    /// The request received from the TCP peer, only available in TCP mode
    pub fn tcp_request(&self) -> Option<&[u8]> {
        match self.mode {
            TransportMode::Tcp => Some(self.socket.request()),
            TransportMode::Rtu => None,
        }
    }

    /// Queue the response to the TCP request
    ///
    /// Returns false outside of TCP mode or if the frame does not fit the
    /// transmit buffer. The frame is sent once the step returns.
    pub fn send_tcp_response(&mut self, frame: &[u8]) -> bool {
        if self.mode != TransportMode::Tcp {
            tracing::warn!("engine attempted a TCP response in {} mode", self.mode);
            return false;
        }

        match self.socket.queue_response(frame) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("{}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::tcp::MAX_FRAME_LENGTH;
    use crate::tcp::NetworkConfig;

    #[test]
    fn tcp_primitives_are_gated_by_mode() {
        let events = EventSlot::new();
        let mut registers = RegisterStore::default();
        let mut socket = TcpSocket::new(NetworkConfig::default());

        let mut ctx = EngineContext::new(TransportMode::Rtu, &events, &mut registers, &mut socket);
        assert_eq!(ctx.tcp_request(), None);
        assert!(!ctx.send_tcp_response(&[0x01]));
        assert!(!socket.tx_enabled());

        let mut ctx = EngineContext::new(TransportMode::Tcp, &events, &mut registers, &mut socket);
        assert_eq!(ctx.tcp_request(), Some(&[][..]));
        assert!(ctx.send_tcp_response(&[0x01, 0x02]));
        assert!(!ctx.send_tcp_response(&[0; MAX_FRAME_LENGTH + 1]));
        assert_eq!(socket.response(), &[0x01, 0x02]);
        assert!(socket.tx_enabled());
    }
}
