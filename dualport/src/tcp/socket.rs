use crate::constants::tcp::MAX_FRAME_LENGTH;
use crate::error::TransportError;
use crate::tcp::chip::{SocketChip, SocketFlags, SocketStatus};
use crate::tcp::config::NetworkConfig;

/// Fixed-size request or response frame
#[derive(Clone)]
pub(crate) struct FrameBuffer {
    data: [u8; MAX_FRAME_LENGTH],
    len: usize,
}

impl FrameBuffer {
    pub(crate) const fn new() -> Self {
        Self {
            data: [0; MAX_FRAME_LENGTH],
            len: 0,
        }
    }

    pub(crate) fn get(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub(crate) fn set(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > MAX_FRAME_LENGTH {
            return Err(TransportError::FrameTooLarge(bytes.len()));
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
        Ok(())
    }

    /// Fill from the chip, reading at most `available` bytes
    pub(crate) fn fill<C>(&mut self, chip: &mut C, available: usize) -> Result<usize, TransportError>
    where
        C: SocketChip + ?Sized,
    {
        let max = std::cmp::min(available, MAX_FRAME_LENGTH);
        let count = chip.recv(&mut self.data[..max])?;
        self.len = std::cmp::min(count, max);
        Ok(self.len)
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer").field("len", &self.len).finish()
    }
}

/// Outcome of one pass through the socket state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// nothing for the dispatcher to do
    Idle,
    /// a peer is connected and `pending` bytes are waiting
    Established { pending: usize },
}

/// State of the Modbus TCP socket
///
/// Created once from a [`NetworkConfig`] and advanced one transition per poll.
/// Everything except the configuration is reset whenever the chip is
/// re-initialised.
#[derive(Debug, Clone)]
pub struct TcpSocket {
    config: NetworkConfig,
    ready: bool,
    phy_connected: bool,
    status: SocketStatus,
    connected: bool,
    tx_enabled: bool,
    tx_sent: bool,
    rx_enabled: bool,
    rx_received: bool,
    rx: FrameBuffer,
    tx: FrameBuffer,
}

impl TcpSocket {
    /// Create a socket that initialises the chip on its first poll
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ready: false,
            phy_connected: false,
            status: SocketStatus::Closed,
            connected: false,
            tx_enabled: false,
            tx_sent: false,
            rx_enabled: false,
            rx_received: false,
            rx: FrameBuffer::new(),
            tx: FrameBuffer::new(),
        }
    }

    /// Configuration programmed into the chip
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// true once the chip accepted the configuration
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Physical link status observed on the last poll
    pub fn phy_connected(&self) -> bool {
        self.phy_connected
    }

    /// Socket status observed on the last poll
    pub fn status(&self) -> SocketStatus {
        self.status
    }

    /// true while a peer is connected
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// true while a response is waiting to be sent
    pub fn tx_enabled(&self) -> bool {
        self.tx_enabled
    }

    /// true once a response has been handed to the chip
    pub fn tx_sent(&self) -> bool {
        self.tx_sent
    }

    /// true while requests are accepted from the socket
    pub fn rx_enabled(&self) -> bool {
        self.rx_enabled
    }

    /// true once a request has been read from the socket
    pub fn rx_received(&self) -> bool {
        self.rx_received
    }

    /// Most recently received request
    pub fn request(&self) -> &[u8] {
        self.rx.get()
    }

    /// Most recently queued response
    pub fn response(&self) -> &[u8] {
        self.tx.get()
    }

    /// Replace the configuration, forcing a chip re-initialisation on the next poll
    pub(crate) fn reconfigure(&mut self, config: NetworkConfig) {
        self.config = config;
        self.ready = false;
    }

    /// Queue a response, it is sent once the engine step returns
    pub(crate) fn queue_response(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.tx.set(frame)?;
        self.tx_enabled = true;
        self.tx_sent = false;
        Ok(())
    }

    pub(crate) fn take_response(&mut self) -> Option<&[u8]> {
        if !self.tx_enabled {
            return None;
        }
        self.tx_enabled = false;
        Some(self.tx.get())
    }

    pub(crate) fn mark_sent(&mut self) {
        self.tx_sent = true;
    }

    pub(crate) fn receive<C>(&mut self, chip: &mut C, pending: usize) -> Result<&[u8], TransportError>
    where
        C: SocketChip + ?Sized,
    {
        self.rx_received = false;
        self.rx.fill(chip, pending)?;
        self.rx_received = true;
        Ok(self.rx.get())
    }

    fn reset(&mut self) {
        let config = self.config;
        *self = Self::new(config);
    }

    /// Bring up the chip unless it already accepted the configuration
    ///
    /// On a readback mismatch the socket stays unusable and the next call
    /// starts over.
    pub(crate) fn ensure_ready<C>(&mut self, chip: &mut C) -> Result<(), TransportError>
    where
        C: SocketChip + ?Sized,
    {
        if self.ready {
            return Ok(());
        }

        self.reset();

        chip.reset()?;
        chip.set_timeout(&self.config.timeout)?;
        chip.init_buffers(&self.config.buffers)?;
        chip.set_net_info(&self.config.net_info);

        if chip.net_info() != self.config.net_info {
            tracing::warn!("chip did not accept the network configuration");
            return Err(TransportError::Initialization);
        }

        if let Err(err) = chip.announce() {
            tracing::warn!("unable to announce address: {}", err);
        }

        self.ready = true;
        self.rx_enabled = true;
        tracing::info!(
            "chip initialised - ip: {} port: {}",
            self.config.net_info.ip,
            self.config.port
        );
        Ok(())
    }

    /// Release the socket if the link dropped under a connected peer
    pub(crate) fn check_link<C>(&mut self, chip: &mut C) -> Result<(), TransportError>
    where
        C: SocketChip + ?Sized,
    {
        let was_up = self.phy_connected;
        self.phy_connected = chip.link_up();

        if self.phy_connected != was_up {
            tracing::debug!("physical link up: {}", self.phy_connected);
        }

        if !self.phy_connected && self.connected {
            tracing::warn!("physical link lost, releasing socket");
            if let Err(err) = chip.close() {
                tracing::warn!("unable to release socket: {}", err);
            }
            self.connected = false;
            return Err(TransportError::LinkLost);
        }

        Ok(())
    }

    /// Advance the state machine by one transition from the chip-reported status
    pub(crate) fn step<C>(&mut self, chip: &mut C) -> Result<Step, TransportError>
    where
        C: SocketChip + ?Sized,
    {
        let status = chip.status();
        if status != self.status {
            tracing::debug!("socket status: {} -> {}", self.status, status);
        }
        self.status = status;

        match status {
            SocketStatus::Closed => {
                if self.connected {
                    tracing::info!("peer disconnected");
                }
                self.connected = false;
                chip.open(self.config.port, SocketFlags::MODBUS)?;
                Ok(Step::Idle)
            }
            SocketStatus::Init => {
                chip.listen()?;
                tracing::info!("listening on port {}", self.config.port);
                Ok(Step::Idle)
            }
            SocketStatus::Listen => Ok(Step::Idle),
            SocketStatus::Established => {
                if !self.connected {
                    tracing::info!("peer connected");
                }
                self.connected = true;
                Ok(Step::Established {
                    pending: chip.received_size(),
                })
            }
            SocketStatus::CloseWait => {
                chip.disconnect()?;
                Ok(Step::Idle)
            }
            SocketStatus::Other(_) => Ok(Step::Idle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Command, MockChip};

    #[test]
    fn ensure_ready_programs_the_chip_once() {
        let mut chip = MockChip::default();
        let mut socket = TcpSocket::new(NetworkConfig::default());

        socket.ensure_ready(&mut chip).unwrap();
        socket.ensure_ready(&mut chip).unwrap();

        assert!(socket.is_ready());
        assert_eq!(
            chip.commands,
            vec![
                Command::Reset,
                Command::SetTimeout(NetworkConfig::default().timeout),
                Command::InitBuffers(NetworkConfig::default().buffers),
                Command::SetNetInfo(NetworkConfig::default().net_info),
                Command::Announce,
            ]
        );
    }

    #[test]
    fn readback_mismatch_leaves_socket_unusable() {
        let mut chip = MockChip {
            corrupt_readback: true,
            ..Default::default()
        };
        let mut socket = TcpSocket::new(NetworkConfig::default());

        assert_eq!(
            socket.ensure_ready(&mut chip),
            Err(TransportError::Initialization)
        );
        assert!(!socket.is_ready());
        assert!(!chip.commands.contains(&Command::Announce));
    }

    #[test]
    fn drives_chip_from_reported_status() {
        let mut chip = MockChip::default();
        let mut socket = TcpSocket::new(NetworkConfig::with_port(1502));

        chip.script([
            SocketStatus::Closed,
            SocketStatus::Init,
            SocketStatus::Listen,
            SocketStatus::CloseWait,
            SocketStatus::Other(0x15),
        ]);

        for _ in 0..5 {
            assert_eq!(socket.step(&mut chip), Ok(Step::Idle));
        }

        assert_eq!(
            chip.commands,
            vec![
                Command::Open(1502, SocketFlags::MODBUS),
                Command::Listen,
                Command::Disconnect,
            ]
        );
    }

    #[test]
    fn established_reports_pending_bytes() {
        let mut chip = MockChip::default();
        chip.rx.extend([1, 2, 3]);
        chip.script([SocketStatus::Established]);

        let mut socket = TcpSocket::new(NetworkConfig::default());
        assert_eq!(socket.step(&mut chip), Ok(Step::Established { pending: 3 }));
        assert!(socket.connected());

        assert_eq!(socket.receive(&mut chip, 3), Ok(&[1u8, 2, 3][..]));
        assert!(socket.rx_received());
    }

    #[test]
    fn oversized_response_is_rejected() {
        let mut socket = TcpSocket::new(NetworkConfig::default());
        let frame = [0u8; MAX_FRAME_LENGTH + 1];
        assert_eq!(
            socket.queue_response(&frame),
            Err(TransportError::FrameTooLarge(MAX_FRAME_LENGTH + 1))
        );
        assert!(!socket.tx_enabled());

        socket.queue_response(&frame[..MAX_FRAME_LENGTH]).unwrap();
        assert!(socket.tx_enabled());
        assert_eq!(socket.take_response().map(|x| x.len()), Some(MAX_FRAME_LENGTH));
        assert!(!socket.tx_enabled());
        assert_eq!(socket.take_response(), None);
    }

    #[test]
    fn link_loss_while_connected_releases_socket() {
        let mut chip = MockChip::default();
        chip.script([SocketStatus::Established]);
        let mut socket = TcpSocket::new(NetworkConfig::default());

        socket.check_link(&mut chip).unwrap();
        socket.step(&mut chip).unwrap();
        assert!(socket.connected());

        chip.link = false;
        assert_eq!(socket.check_link(&mut chip), Err(TransportError::LinkLost));
        assert!(!socket.connected());
        assert!(!socket.phy_connected());
        assert_eq!(chip.commands.last(), Some(&Command::Close));

        // no peer, nothing to release
        assert_eq!(socket.check_link(&mut chip), Ok(()));
    }
}
