//! Live task output streaming.
//!
//! [`transport::Connection`] owns one socket at a time and reconnects after
//! unintentional closes. Decoded frames are answered by [`keepalive`] or fanned
//! out through [`router::MessageRouter`]. [`session::TaskStreamSession`] ties a
//! connection to a single running task and merges its REST snapshot with the
//! live chunks.

pub mod keepalive;
pub mod memory;
pub mod router;
pub mod session;
pub mod transport;

pub use keepalive::KEEPALIVE_ACK;
pub use memory::{MemoryConnector, ServerSocket};
pub use router::{HandlerId, MessageRouter, StreamEvent, Subscription, Topic};
pub use session::{OutputLog, SessionDeps, SessionRegistry, TaskStreamSession};
pub use transport::{Connection, ConnectionState, Connector, Socket, WsConnector};
