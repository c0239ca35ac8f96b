use std::net::Ipv4Addr;
use std::time::Duration;

use crate::constants;
use crate::decode::PhysDecodeLevel;

/// Addressing programmed into the chip
///
/// This is also what gets read back to verify that the chip accepted the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NetInfo {
    /// hardware address
    pub mac: [u8; 6],
    /// static IPv4 address
    pub ip: Ipv4Addr,
    /// subnet mask
    pub subnet: Ipv4Addr,
    /// default gateway
    pub gateway: Ipv4Addr,
    /// DNS server
    pub dns: Ipv4Addr,
}

impl Default for NetInfo {
    fn default() -> Self {
        Self {
            mac: [0x00, 0x08, 0xDC, 0x00, 0x00, 0xFF],
            ip: Ipv4Addr::new(192, 168, 1, 254),
            subnet: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(192, 168, 1, 1),
            dns: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// Per-socket transmit and receive buffer sizes in KiB
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SocketBuffers {
    /// transmit buffer of each hardware socket
    pub tx_kib: [u8; constants::chip::SOCKET_COUNT],
    /// receive buffer of each hardware socket
    pub rx_kib: [u8; constants::chip::SOCKET_COUNT],
}

impl Default for SocketBuffers {
    /// All buffer memory goes to socket 0, the Modbus socket
    fn default() -> Self {
        let mut sizes = [0; constants::chip::SOCKET_COUNT];
        sizes[0] = constants::chip::DEFAULT_SOCKET_BUFFER_KIB;
        Self {
            tx_kib: sizes,
            rx_kib: sizes,
        }
    }
}

/// Retransmission settings of the chip
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ChipTimeout {
    /// retransmissions before a segment is abandoned
    pub retry_count: u8,
    /// time between retransmissions
    pub retry_time: Duration,
}

impl ChipTimeout {
    /// Value of the chip's retry time register, in units of 100 µs
    pub fn retry_time_units(&self) -> u16 {
        let units = self.retry_time.as_micros() / constants::chip::RETRY_TIME_UNIT.as_micros();
        u16::try_from(units).unwrap_or(u16::MAX)
    }
}

impl Default for ChipTimeout {
    fn default() -> Self {
        Self {
            retry_count: constants::chip::DEFAULT_RETRY_COUNT,
            retry_time: constants::chip::DEFAULT_RETRY_TIME,
        }
    }
}

/// Everything needed to bring up the TCP side of the port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NetworkConfig {
    /// addressing programmed into the chip
    pub net_info: NetInfo,
    /// port the Modbus socket listens on
    pub port: u16,
    /// socket buffer sizing
    pub buffers: SocketBuffers,
    /// retransmission settings
    pub timeout: ChipTimeout,
    /// keepalive probe interval of the established socket
    pub keepalive: Duration,
    /// how frames moving through the socket are logged
    pub decode: PhysDecodeLevel,
}

impl NetworkConfig {
    /// Default configuration listening on a different port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Keepalive interval in the chip's units of 5 seconds, never less than one
    pub fn keepalive_units(&self) -> u8 {
        let units = self.keepalive.as_secs() / constants::tcp::KEEPALIVE_UNIT.as_secs();
        u8::try_from(units).unwrap_or(u8::MAX).max(1)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            net_info: NetInfo::default(),
            port: constants::tcp::DEFAULT_PORT,
            buffers: SocketBuffers::default(),
            timeout: ChipTimeout::default(),
            keepalive: constants::tcp::DEFAULT_KEEPALIVE,
            decode: PhysDecodeLevel::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_device() {
        let config = NetworkConfig::default();
        assert_eq!(config.port, 502);
        assert_eq!(config.net_info.mac, [0x00, 0x08, 0xDC, 0x00, 0x00, 0xFF]);
        assert_eq!(config.net_info.ip, Ipv4Addr::new(192, 168, 1, 254));
        assert_eq!(config.buffers.tx_kib, [16, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(config.timeout.retry_count, 5);
        assert_eq!(config.timeout.retry_time_units(), 2000);
    }

    #[test]
    fn keepalive_is_programmed_in_five_second_units() {
        assert_eq!(NetworkConfig::default().keepalive_units(), 1);

        let mut config = NetworkConfig::default();
        config.keepalive = Duration::from_secs(30);
        assert_eq!(config.keepalive_units(), 6);

        config.keepalive = Duration::from_secs(1);
        assert_eq!(config.keepalive_units(), 1);
    }
}
