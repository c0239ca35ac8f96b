use crate::error::TransportError;
use crate::tcp::config::{ChipTimeout, NetInfo, SocketBuffers};

/// Socket status as reported by the chip's status register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketStatus {
    /// socket is released
    Closed,
    /// socket is open in TCP mode but not yet listening
    Init,
    /// waiting for a peer to connect
    Listen,
    /// a peer is connected
    Established,
    /// the peer requested a close
    CloseWait,
    /// any transitional status the port layer ignores
    Other(u8),
}

impl SocketStatus {
    const CLOSED: u8 = 0x00;
    const INIT: u8 = 0x13;
    const LISTEN: u8 = 0x14;
    const ESTABLISHED: u8 = 0x17;
    const CLOSE_WAIT: u8 = 0x1C;

    /// Decode a raw status register value
    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::CLOSED => SocketStatus::Closed,
            Self::INIT => SocketStatus::Init,
            Self::LISTEN => SocketStatus::Listen,
            Self::ESTABLISHED => SocketStatus::Established,
            Self::CLOSE_WAIT => SocketStatus::CloseWait,
            _ => SocketStatus::Other(value),
        }
    }

    /// Raw status register value
    pub fn to_u8(self) -> u8 {
        match self {
            SocketStatus::Closed => Self::CLOSED,
            SocketStatus::Init => Self::INIT,
            SocketStatus::Listen => Self::LISTEN,
            SocketStatus::Established => Self::ESTABLISHED,
            SocketStatus::CloseWait => Self::CLOSE_WAIT,
            SocketStatus::Other(x) => x,
        }
    }
}

impl std::fmt::Display for SocketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocketStatus::Closed => f.write_str("CLOSED"),
            SocketStatus::Init => f.write_str("INIT"),
            SocketStatus::Listen => f.write_str("LISTEN"),
            SocketStatus::Established => f.write_str("ESTABLISHED"),
            SocketStatus::CloseWait => f.write_str("CLOSE_WAIT"),
            SocketStatus::Other(x) => write!(f, "0x{x:02X}"),
        }
    }
}

/// Flags used when opening the Modbus socket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketFlags {
    /// send segments without waiting for the delayed ACK timer
    pub no_delay: bool,
    /// socket primitives return immediately instead of blocking
    pub non_blocking: bool,
}

impl SocketFlags {
    /// Flags the Modbus socket is always opened with
    pub const MODBUS: SocketFlags = SocketFlags {
        no_delay: true,
        non_blocking: true,
    };
}

/// The socket chip primitives the TCP transport is built on
///
/// Every operation addresses the single hardware socket reserved for Modbus
/// and must return without blocking.
pub trait SocketChip: Send {
    /// Software reset of the chip, discarding every socket
    fn reset(&mut self) -> Result<(), TransportError>;
    /// Divide buffer memory between the hardware sockets
    fn init_buffers(&mut self, buffers: &SocketBuffers) -> Result<(), TransportError>;
    /// Program the retransmission settings
    fn set_timeout(&mut self, timeout: &ChipTimeout) -> Result<(), TransportError>;
    /// Program the network addressing
    fn set_net_info(&mut self, info: &NetInfo);
    /// Read back the network addressing
    fn net_info(&self) -> NetInfo;
    /// Physical link status
    fn link_up(&self) -> bool;
    /// Status of the Modbus socket
    fn status(&mut self) -> SocketStatus;
    /// Open the socket in TCP mode on a local port
    fn open(&mut self, port: u16, flags: SocketFlags) -> Result<(), TransportError>;
    /// Start listening for a peer
    fn listen(&mut self) -> Result<(), TransportError>;
    /// Gracefully disconnect the peer
    fn disconnect(&mut self) -> Result<(), TransportError>;
    /// Release the socket immediately
    fn close(&mut self) -> Result<(), TransportError>;
    /// Number of received bytes waiting to be read
    fn received_size(&mut self) -> usize;
    /// Read received bytes into `buffer`, returning the number read
    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError>;
    /// Queue bytes for transmission, returning the number accepted
    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError>;
    /// Program the keepalive interval in units of 5 seconds
    fn set_keepalive(&mut self, units: u8) -> Result<(), TransportError>;
    /// Announce the configured address to the local segment
    ///
    /// Hardware chips send one UDP datagram from the device address to the
    /// broadcast address on the discard port so that peers refresh their ARP
    /// caches. The default does nothing.
    fn announce(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_status_register() {
        for status in [
            SocketStatus::Closed,
            SocketStatus::Init,
            SocketStatus::Listen,
            SocketStatus::Established,
            SocketStatus::CloseWait,
        ] {
            assert_eq!(SocketStatus::from_u8(status.to_u8()), status);
        }
        assert_eq!(SocketStatus::from_u8(0x17), SocketStatus::Established);
        assert_eq!(SocketStatus::from_u8(0x15), SocketStatus::Other(0x15));
        assert_eq!(SocketStatus::Other(0x15).to_string(), "0x15");
    }
}
