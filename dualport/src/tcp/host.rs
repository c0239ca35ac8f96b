use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::task::{Context, Poll, Waker};

use crate::constants;
use crate::error::TransportError;
use crate::tcp::chip::{SocketChip, SocketFlags, SocketStatus};
use crate::tcp::config::{ChipTimeout, NetInfo, SocketBuffers};

const READ_CHUNK: usize = 1024;

enum State {
    Closed,
    Init(std::net::TcpListener),
    Listen(tokio::net::TcpListener),
    Established(tokio::net::TcpStream),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Init(_) => "init",
            State::Listen(_) => "listen",
            State::Established(_) => "established",
        }
    }
}

/// [`SocketChip`] over the host's TCP stack
///
/// Behaves like a single hardware socket: it listens, accepts one peer,
/// stops listening while that peer is connected, and must be re-opened once
/// the peer is gone. Every primitive polls Tokio sockets without blocking, so
/// the chip must be used from within a Tokio runtime.
pub struct HostSocketChip {
    bind_ip: IpAddr,
    state: State,
    flags: SocketFlags,
    local_addr: Option<SocketAddr>,
    pending: Vec<u8>,
    rx_capacity: usize,
    peer_closed: bool,
    net_info: NetInfo,
    link: bool,
    keepalive_units: u8,
    announce: bool,
}

impl std::fmt::Debug for HostSocketChip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSocketChip")
            .field("bind_ip", &self.bind_ip)
            .field("state", &self.state.name())
            .field("local_addr", &self.local_addr)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl HostSocketChip {
    /// Create a chip whose socket binds to a local address
    pub fn new(bind_ip: IpAddr) -> Self {
        Self {
            bind_ip,
            state: State::Closed,
            flags: SocketFlags::default(),
            local_addr: None,
            pending: Vec::new(),
            rx_capacity: rx_capacity(&SocketBuffers::default()),
            peer_closed: false,
            net_info: NetInfo::default(),
            link: true,
            keepalive_units: 0,
            announce: false,
        }
    }

    /// Broadcast a datagram on the discard port after every initialisation
    pub fn with_announce(mut self, enabled: bool) -> Self {
        self.announce = enabled;
        self
    }

    /// Simulate the physical link going up or down
    pub fn set_link(&mut self, up: bool) {
        self.link = up;
    }

    /// Address the socket is bound to while open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Last keepalive interval programmed, in units of 5 seconds
    pub fn keepalive_units(&self) -> u8 {
        self.keepalive_units
    }

    fn release(&mut self) {
        self.state = State::Closed;
        self.local_addr = None;
        self.pending.clear();
        self.peer_closed = false;
    }

    fn try_accept(&mut self) {
        let listener = match &self.state {
            State::Listen(listener) => listener,
            _ => return,
        };

        let mut cx = Context::from_waker(Waker::noop());
        match listener.poll_accept(&mut cx) {
            Poll::Pending => {}
            Poll::Ready(Ok((stream, addr))) => {
                if let Err(err) = stream.set_nodelay(self.flags.no_delay) {
                    tracing::warn!("unable to set no-delay: {}", err);
                }
                tracing::info!("accepted connection from: {}", addr);
                // one peer per socket, stop listening until re-opened
                self.state = State::Established(stream);
                self.pending.clear();
                self.peer_closed = false;
            }
            Poll::Ready(Err(err)) => {
                tracing::warn!("error accepting connection: {}", err);
            }
        }
    }

    fn fill_pending(&mut self) {
        let stream = match &self.state {
            State::Established(stream) => stream,
            _ => return,
        };

        if self.peer_closed {
            return;
        }

        // bounded like the chip's receive memory, the rest stays in the OS socket
        let mut buffer = [0u8; READ_CHUNK];
        loop {
            let room = self.rx_capacity.saturating_sub(self.pending.len());
            if room == 0 {
                return;
            }
            match stream.try_read(&mut buffer[..std::cmp::min(room, READ_CHUNK)]) {
                Ok(0) => {
                    self.peer_closed = true;
                    return;
                }
                Ok(count) => self.pending.extend_from_slice(&buffer[..count]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => return,
                Err(err) => {
                    tracing::warn!("read error: {}", err);
                    self.peer_closed = true;
                    return;
                }
            }
        }
    }
}

fn rx_capacity(buffers: &SocketBuffers) -> usize {
    usize::from(buffers.rx_kib[0]) * 1024
}

impl SocketChip for HostSocketChip {
    fn reset(&mut self) -> Result<(), TransportError> {
        self.release();
        Ok(())
    }

    fn init_buffers(&mut self, buffers: &SocketBuffers) -> Result<(), TransportError> {
        self.rx_capacity = rx_capacity(buffers);
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: &ChipTimeout) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_net_info(&mut self, info: &NetInfo) {
        self.net_info = *info;
    }

    fn net_info(&self) -> NetInfo {
        self.net_info
    }

    fn link_up(&self) -> bool {
        self.link
    }

    fn status(&mut self) -> SocketStatus {
        self.try_accept();
        self.fill_pending();

        match &self.state {
            State::Closed => SocketStatus::Closed,
            State::Init(_) => SocketStatus::Init,
            State::Listen(_) => SocketStatus::Listen,
            State::Established(_) => {
                if self.peer_closed && self.pending.is_empty() {
                    SocketStatus::CloseWait
                } else {
                    SocketStatus::Established
                }
            }
        }
    }

    fn open(&mut self, port: u16, flags: SocketFlags) -> Result<(), TransportError> {
        self.release();

        let listener = std::net::TcpListener::bind(SocketAddr::new(self.bind_ip, port))?;
        listener.set_nonblocking(flags.non_blocking)?;
        self.local_addr = Some(listener.local_addr()?);
        self.flags = flags;
        self.state = State::Init(listener);
        Ok(())
    }

    fn listen(&mut self) -> Result<(), TransportError> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Init(listener) => {
                if tokio::runtime::Handle::try_current().is_err() {
                    self.release();
                    return Err(TransportError::Io(ErrorKind::Unsupported));
                }
                listener.set_nonblocking(true)?;
                self.state = State::Listen(tokio::net::TcpListener::from_std(listener)?);
                Ok(())
            }
            other => {
                self.state = other;
                Err(TransportError::Io(ErrorKind::InvalidInput))
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if let State::Established(_) = &self.state {
            tracing::info!("closing connection");
        }
        // dropping the stream sends FIN
        self.release();
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.release();
        Ok(())
    }

    fn received_size(&mut self) -> usize {
        self.fill_pending();
        self.pending.len()
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        self.fill_pending();
        let count = std::cmp::min(buffer.len(), self.pending.len());
        buffer[..count].copy_from_slice(&self.pending[..count]);
        self.pending.drain(..count);
        Ok(count)
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let stream = match &self.state {
            State::Established(stream) => stream,
            _ => return Err(TransportError::Io(ErrorKind::NotConnected)),
        };

        let mut written = 0;
        while written < data.len() {
            match stream.try_write(&data[written..]) {
                Ok(0) => break,
                Ok(count) => written += count,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(written)
    }

    fn set_keepalive(&mut self, units: u8) -> Result<(), TransportError> {
        self.keepalive_units = units;
        Ok(())
    }

    fn announce(&mut self) -> Result<(), TransportError> {
        if !self.announce {
            return Ok(());
        }

        let socket = std::net::UdpSocket::bind(SocketAddr::new(self.bind_ip, 0))?;
        socket.set_broadcast(true)?;
        socket.send_to(
            b"0\0",
            SocketAddr::new(
                IpAddr::V4(Ipv4Addr::BROADCAST),
                constants::tcp::DISCARD_PORT,
            ),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn wait_for(chip: &mut HostSocketChip, status: SocketStatus) {
        for _ in 0..200 {
            if chip.status() == status {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("chip never reached {status}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn accepts_one_peer_and_exchanges_bytes() {
        let mut chip = HostSocketChip::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(chip.status(), SocketStatus::Closed);

        chip.open(0, SocketFlags::MODBUS).unwrap();
        assert_eq!(chip.status(), SocketStatus::Init);
        chip.listen().unwrap();
        assert_eq!(chip.status(), SocketStatus::Listen);

        let addr = chip.local_addr().unwrap();
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        wait_for(&mut chip, SocketStatus::Established).await;

        client.write_all(&[0x01, 0x02, 0x03]).await.unwrap();
        for _ in 0..200 {
            if chip.received_size() == 3 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let mut buffer = [0u8; 2];
        assert_eq!(chip.recv(&mut buffer), Ok(2));
        assert_eq!(buffer, [0x01, 0x02]);
        assert_eq!(chip.received_size(), 1);

        assert_eq!(chip.send(&[0xAA, 0xBB]), Ok(2));
        let mut reply = [0u8; 2];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0xAA, 0xBB]);

        drop(client);
        let mut rest = [0u8; 4];
        assert_eq!(chip.recv(&mut rest), Ok(1));
        wait_for(&mut chip, SocketStatus::CloseWait).await;

        chip.disconnect().unwrap();
        assert_eq!(chip.status(), SocketStatus::Closed);
        assert_eq!(chip.local_addr(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn receive_queue_is_bounded_by_the_socket_buffer() {
        let mut chip = HostSocketChip::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut buffers = SocketBuffers::default();
        buffers.rx_kib[0] = 1;
        chip.init_buffers(&buffers).unwrap();

        chip.open(0, SocketFlags::MODBUS).unwrap();
        chip.listen().unwrap();
        let addr = chip.local_addr().unwrap();
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        wait_for(&mut chip, SocketStatus::Established).await;

        client.write_all(&[0x55; 4096]).await.unwrap();

        let mut size = 0;
        for _ in 0..200 {
            size = chip.received_size();
            assert!(size <= 1024);
            if size == 1024 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(size, 1024);

        // draining makes room for the rest
        let mut buffer = [0u8; 256];
        let mut total = 0;
        for _ in 0..400 {
            assert!(chip.received_size() <= 1024);
            total += chip.recv(&mut buffer).unwrap();
            if total == 4096 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        assert_eq!(total, 4096);
    }

    #[test]
    fn send_without_peer_fails() {
        let mut chip = HostSocketChip::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(
            chip.send(&[0x00]),
            Err(TransportError::Io(ErrorKind::NotConnected))
        );
    }
}
