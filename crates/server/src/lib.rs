//! Redis-protocol server over the typed store
//!
//! A thin router: parse RESP frames, dispatch by command name to the
//! per-type handler modules, encode the reply. Per-connection state is the
//! `SELECT`ed database; FIFO ordering per connection comes from the
//! connection task itself.

pub mod cmd;
pub mod config;
pub mod server;
pub mod session;

pub use config::Config;
pub use server::{spawn_ttl_sweeper, Server};
pub use session::Session;
