use crate::types::RegisterSpace;

/// Errors returned by the register store
///
/// Every variant is detected before the backing storage is touched,
/// so a failed operation never partially applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The requested range falls outside the declared bounds of the space
    NoSuchRegister {
        /// space that was addressed
        space: RegisterSpace,
        /// first address of the request
        address: u16,
        /// number of objects requested
        count: u16,
    },
    /// The caller supplied a buffer that cannot hold the request
    BufferTooSmall {
        /// number of elements the request needs
        required: usize,
        /// number of elements supplied
        actual: usize,
    },
}

impl RegisterError {
    /// true if the error is an address range violation
    pub fn is_range_error(&self) -> bool {
        matches!(self, RegisterError::NoSuchRegister { .. })
    }
}

impl std::error::Error for RegisterError {}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::NoSuchRegister {
                space,
                address,
                count,
            } => write!(
                f,
                "no such register: {space} start == {address} count == {count} is outside the map"
            ),
            RegisterError::BufferTooSmall { required, actual } => write!(
                f,
                "buffer of {actual} elements cannot hold the {required} elements of the request"
            ),
        }
    }
}

/// Errors that occur while servicing the TCP side of the port
///
/// None of these are fatal, the dispatcher recovers from all of them on the next poll.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The network configuration read back from the chip did not match what was written
    Initialization,
    /// The physical link dropped while a peer was connected
    LinkLost,
    /// The protocol engine did not produce a response during its step
    Busy,
    /// A response did not fit in the transmit buffer
    FrameTooLarge(usize),
    /// An I/O error reported by the socket primitives
    Io(std::io::ErrorKind),
}

impl std::error::Error for TransportError {}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Initialization => {
                f.write_str("network configuration was not accepted by the chip")
            }
            TransportError::LinkLost => f.write_str("physical link lost while connected"),
            TransportError::Busy => {
                f.write_str("protocol engine did not produce a response during its step")
            }
            TransportError::FrameTooLarge(size) => write!(
                f,
                "response of {} bytes exceeds the frame buffer of {} bytes",
                size,
                crate::constants::tcp::MAX_FRAME_LENGTH
            ),
            TransportError::Io(kind) => write!(f, "socket I/O error: {kind}"),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.kind())
    }
}

/// Errors reported by the serial byte port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialError {
    /// The byte was not transferred within the hardware timeout
    Timeout,
    /// The port could not be opened
    Open(String),
    /// Any other I/O error
    Io(std::io::ErrorKind),
}

impl std::error::Error for SerialError {}

impl std::fmt::Display for SerialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerialError::Timeout => f.write_str("timeout during single byte transfer"),
            SerialError::Open(details) => write!(f, "unable to open serial port: {details}"),
            SerialError::Io(kind) => write!(f, "serial I/O error: {kind}"),
        }
    }
}

impl From<std::io::Error> for SerialError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => SerialError::Timeout,
            kind => SerialError::Io(kind),
        }
    }
}

/// Errors reported by the timeout timer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A countdown of zero ticks can never expire
    InvalidTimeout,
    /// The timer hardware requires a Tokio runtime and none is running
    NoRuntime,
}

impl std::error::Error for TimerError {}

impl std::fmt::Display for TimerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerError::InvalidTimeout => f.write_str("timer countdown must be at least one tick"),
            TimerError::NoRuntime => f.write_str("no Tokio runtime available for the timer"),
        }
    }
}

/// Errors returned by the device property store
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceConfigError {
    /// Slave address outside of 1..=247
    InvalidSlaveAddress(u8),
    /// Baud rate of zero
    InvalidBaudRate(u32),
}

impl std::error::Error for DeviceConfigError {}

impl std::fmt::Display for DeviceConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceConfigError::InvalidSlaveAddress(address) => write!(
                f,
                "slave address {} is outside the range {}..={}",
                address,
                crate::constants::serial::MIN_SLAVE_ADDRESS,
                crate::constants::serial::MAX_SLAVE_ADDRESS
            ),
            DeviceConfigError::InvalidBaudRate(rate) => write!(f, "invalid baud rate: {rate}"),
        }
    }
}
