//! Control errors

use std::net::SocketAddr;

use binsim_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Cannot bind control socket {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Undecodable OSC packet from {from}: {reason}")]
    Packet { from: SocketAddr, reason: String },

    #[error("{addr}: {reason}")]
    Malformed { addr: String, reason: String },

    #[error("Unknown OSC address: {0}")]
    UnknownAddress(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

pub type ControlResult<T> = Result<T, ControlError>;
