use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{EngineContext, ProtocolEngine};
use crate::error::{SerialError, TimerError, TransportError};
use crate::event::Event;
use crate::registers::RegisterStore;
use crate::serial::Uart;
use crate::tcp::{ChipTimeout, NetInfo, SocketBuffers, SocketChip, SocketFlags, SocketStatus};
use crate::timer::{Countdown, TimerHardware};
use crate::types::{RegisterSpace, TransportMode};

/// Commands issued to the mock chip, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Reset,
    InitBuffers(SocketBuffers),
    SetTimeout(ChipTimeout),
    SetNetInfo(NetInfo),
    Open(u16, SocketFlags),
    Listen,
    Disconnect,
    Close,
    SetKeepalive(u8),
    Announce,
}

/// Chip that reports a scripted sequence of statuses and records every command
///
/// Once the script runs out the last status keeps being reported.
#[derive(Debug)]
pub(crate) struct MockChip {
    pub(crate) statuses: VecDeque<SocketStatus>,
    pub(crate) current: SocketStatus,
    pub(crate) net_info: NetInfo,
    pub(crate) link: bool,
    pub(crate) corrupt_readback: bool,
    pub(crate) fail_keepalive: bool,
    pub(crate) commands: Vec<Command>,
    pub(crate) rx: VecDeque<u8>,
    pub(crate) sent: Vec<u8>,
}

impl Default for MockChip {
    fn default() -> Self {
        Self {
            statuses: VecDeque::new(),
            current: SocketStatus::Closed,
            net_info: NetInfo::default(),
            link: true,
            corrupt_readback: false,
            fail_keepalive: false,
            commands: Vec::new(),
            rx: VecDeque::new(),
            sent: Vec::new(),
        }
    }
}

impl MockChip {
    pub(crate) fn script<I>(&mut self, statuses: I)
    where
        I: IntoIterator<Item = SocketStatus>,
    {
        self.statuses.extend(statuses);
    }
}

impl SocketChip for MockChip {
    fn reset(&mut self) -> Result<(), TransportError> {
        self.commands.push(Command::Reset);
        Ok(())
    }

    fn init_buffers(&mut self, buffers: &SocketBuffers) -> Result<(), TransportError> {
        self.commands.push(Command::InitBuffers(*buffers));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: &ChipTimeout) -> Result<(), TransportError> {
        self.commands.push(Command::SetTimeout(*timeout));
        Ok(())
    }

    fn set_net_info(&mut self, info: &NetInfo) {
        self.commands.push(Command::SetNetInfo(*info));
        self.net_info = *info;
    }

    fn net_info(&self) -> NetInfo {
        let mut info = self.net_info;
        if self.corrupt_readback {
            info.mac[0] ^= 0xFF;
        }
        info
    }

    fn link_up(&self) -> bool {
        self.link
    }

    fn status(&mut self) -> SocketStatus {
        if let Some(next) = self.statuses.pop_front() {
            self.current = next;
        }
        self.current
    }

    fn open(&mut self, port: u16, flags: SocketFlags) -> Result<(), TransportError> {
        self.commands.push(Command::Open(port, flags));
        Ok(())
    }

    fn listen(&mut self) -> Result<(), TransportError> {
        self.commands.push(Command::Listen);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.commands.push(Command::Disconnect);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.commands.push(Command::Close);
        Ok(())
    }

    fn received_size(&mut self) -> usize {
        self.rx.len()
    }

    fn recv(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        let count = std::cmp::min(buffer.len(), self.rx.len());
        for (dest, src) in buffer.iter_mut().zip(self.rx.drain(..count)) {
            *dest = src;
        }
        Ok(count)
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.sent.extend_from_slice(data);
        Ok(data.len())
    }

    fn set_keepalive(&mut self, units: u8) -> Result<(), TransportError> {
        if self.fail_keepalive {
            return Err(TransportError::Io(std::io::ErrorKind::TimedOut));
        }
        self.commands.push(Command::SetKeepalive(units));
        Ok(())
    }

    fn announce(&mut self) -> Result<(), TransportError> {
        self.commands.push(Command::Announce);
        Ok(())
    }
}

/// Engine that records every step and answers TCP requests
///
/// By default the request is echoed back. With `read_holding` set the
/// response is the wire form of that holding register instead.
#[derive(Debug)]
pub(crate) struct ScriptedEngine {
    pub(crate) steps: Vec<(TransportMode, Option<Event>)>,
    pub(crate) respond: bool,
    pub(crate) read_holding: Option<u16>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            respond: true,
            read_holding: None,
        }
    }
}

impl ProtocolEngine for ScriptedEngine {
    fn step(&mut self, ctx: &mut EngineContext<'_>) {
        let event = ctx.events().take();
        self.steps.push((ctx.mode(), event));

        if ctx.mode() != TransportMode::Tcp || !self.respond {
            return;
        }

        let response = match self.read_holding {
            Some(address) => {
                let mut out = [0u8; 2];
                match read_holding(ctx.registers(), address, &mut out) {
                    Ok(()) => out.to_vec(),
                    Err(_) => return,
                }
            }
            None => ctx.tcp_request().map(|x| x.to_vec()).unwrap_or_default(),
        };

        ctx.send_tcp_response(&response);
    }
}

fn read_holding(
    registers: &RegisterStore,
    address: u16,
    out: &mut [u8],
) -> Result<(), crate::error::RegisterError> {
    registers.read(RegisterSpace::HoldingRegister, address, 1, out)?;
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct MockUart {
    pub(crate) interrupts: (bool, bool),
    pub(crate) rx: VecDeque<u8>,
    pub(crate) tx: Vec<u8>,
    pub(crate) fail_writes: bool,
}

impl Uart for MockUart {
    fn set_interrupts(&mut self, rx: bool, tx: bool) {
        self.interrupts = (rx, tx);
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SerialError> {
        if self.fail_writes {
            return Err(SerialError::Timeout);
        }
        self.tx.push(byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, SerialError> {
        self.rx.pop_front().ok_or(SerialError::Timeout)
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockTimer {
    pub(crate) period: Option<Duration>,
    pub(crate) countdown: Option<Arc<Countdown>>,
    pub(crate) running: bool,
}

impl MockTimer {
    /// Deliver one hardware tick, returning true if the countdown expired
    pub(crate) fn tick(&self) -> bool {
        match &self.countdown {
            Some(countdown) if self.running => countdown.tick(),
            _ => false,
        }
    }
}

impl TimerHardware for MockTimer {
    fn init(&mut self, period: Duration, countdown: Arc<Countdown>) -> Result<(), TimerError> {
        self.period = Some(period);
        self.countdown = Some(countdown);
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
