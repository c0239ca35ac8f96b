/// Modbus/TCP socket constants
pub mod tcp {
    use std::time::Duration;

    /// Registered Modbus/TCP port
    pub const DEFAULT_PORT: u16 = 502;
    /// Size of the request and response frame buffers
    pub const MAX_FRAME_LENGTH: usize = 256;
    /// UDP discard port used to announce the device after the chip is configured
    pub const DISCARD_PORT: u16 = 9;
    /// The chip programs keepalive probes in multiples of this period
    pub const KEEPALIVE_UNIT: Duration = Duration::from_secs(5);
    /// Default keepalive probe interval
    pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(5);
}

/// Ethernet chip bring-up constants
pub mod chip {
    use std::time::Duration;

    /// Number of hardware sockets on the chip
    pub const SOCKET_COUNT: usize = 8;
    /// Transmit/receive buffer given to the Modbus socket, in KiB
    pub const DEFAULT_SOCKET_BUFFER_KIB: u8 = 16;
    /// Number of retransmissions before the chip gives up on a segment
    pub const DEFAULT_RETRY_COUNT: u8 = 5;
    /// Retransmission timeout, 5 retries x 200 ms = 1 s total
    pub const DEFAULT_RETRY_TIME: Duration = Duration::from_millis(200);
    /// Resolution of the retransmission timeout register
    pub const RETRY_TIME_UNIT: Duration = Duration::from_micros(100);
}

/// Serial line constants
pub mod serial {
    use std::time::Duration;

    /// Upper bound on a single byte transfer
    pub const BYTE_TIMEOUT: Duration = Duration::from_millis(1);
    /// Default RTU baud rate
    pub const DEFAULT_BAUD_RATE: u32 = 9600;
    /// Highest assignable unicast slave address
    pub const MAX_SLAVE_ADDRESS: u8 = 247;
    /// Lowest assignable unicast slave address
    pub const MIN_SLAVE_ADDRESS: u8 = 1;
}

/// RTU timer constants
pub mod timer {
    use std::time::Duration;

    /// Fixed period of the hardware countdown
    pub const TICK: Duration = Duration::from_micros(50);
}

/// Default layout of the register map
pub mod map {
    /// First discrete input address
    pub const DISCRETE_INPUT_START: u16 = 1;
    /// Number of discrete inputs
    pub const DISCRETE_INPUT_QTY: u16 = 8;
    /// First coil address
    pub const COIL_START: u16 = 1;
    /// Number of coils
    pub const COIL_QTY: u16 = 8;
    /// First input register address
    pub const INPUT_REG_START: u16 = 1;
    /// Number of input registers
    pub const INPUT_REG_QTY: u16 = 2048;
    /// First holding register address
    pub const HOLDING_REG_START: u16 = 1;
    /// Number of holding registers
    pub const HOLDING_REG_QTY: u16 = 2048;
}
