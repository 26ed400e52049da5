#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod handler;
pub(crate) mod heartbeat;

pub use config::{ConnectionConfig, ReconnectLimit};
pub use connection::{ConnectionManager, ConnectionState};
pub use envelope::Envelope;
pub use error::{Error, Kind};
pub use handler::{ConnectionHandler, NoopHandler};

pub type Result<T> = std::result::Result<T, Error>;
