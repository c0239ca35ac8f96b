mod chip;
mod config;
mod host;
mod socket;

pub use chip::*;
pub use config::*;
pub use host::HostSocketChip;
pub use socket::TcpSocket;

pub(crate) use socket::Step;
