//! Connection to the office process: bridge protocol, launcher, and the
//! resolve/spawn/retry state machine.

pub mod connect;
pub mod endpoint;
mod error;
mod logging;
pub mod launcher;
pub mod protocol;

pub use connect::{connect, BridgeResolver, ConnectionState, Connector, Resolver};
pub use endpoint::{accept_argument, SCRIPT_LIBRARY_CONTAINER};
pub use error::OfficeError;
pub use launcher::{Launcher, OfficeLauncher};
pub use logging::init_tracing;
pub use protocol::{
    dispatch, serve_connection, BridgeRequest, BridgeResponse, Session, READ_TIMEOUT,
};
