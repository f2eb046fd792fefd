//! Engine side of the adapter: line codec, socket handling and request correlation.

pub mod codec;
mod connection;
pub mod correlator;

pub use codec::{LineBuffer, RemoteCommand, RemoteEvent, StackFrameDescriptor};
pub use connection::{authenticate, connect, spawn_reader, ReaderEvent, RemoteWriter};
pub use correlator::{Correlator, PendingEval};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("cannot resolve address {0}")]
    Resolve(String),
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("Wrong Password")]
    WrongPassword,
    #[error("Timeout: no handshake answer within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("connection closed by remote")]
    Closed,
    #[error("not connected")]
    NotConnected,
}

/// Destination of engine commands.
pub trait CommandSink {
    fn send(&self, cmd: &RemoteCommand) -> Result<(), Error>;
}
