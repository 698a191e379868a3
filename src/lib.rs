//! A small, embeddable WebSocket client.
//!
//! This library offers a synchronous, thread-based implementation for
//! connecting to a WebSocket server: a single background thread drives the
//! handshake and framing for each connection, and the host interacts with
//! it entirely through a cheaply cloneable [`Handle`], polling state and
//! registering callbacks rather than calling directly into any async
//! runtime. It implements the client side of the
//! [WebSocket Protocol RFC](https://datatracker.ietf.org/doc/html/rfc6455):
//! the HTTP/1.1 Upgrade handshake, masked frame encoding, and fragmented
//! message reassembly.
//!
//! `wss://` (TLS) is not supported by this build.
//!
//! The worker thread emits `log` records (state transitions at `debug!`,
//! per-frame traffic at `trace!`, recoverable conditions at `warn!`, and the
//! error behind a terminal transition at `error!`, right before
//! `on_disconnected` fires). This crate never calls `env_logger::init()` or
//! installs any other logger itself — that's the embedding application's
//! call to make, same as any other library.

mod callbacks;
mod config;
pub mod error;
pub mod frame;
mod handle;
pub mod handshake;
mod queue;
mod reassemble;
mod sigpipe;
mod state;
mod transport;
mod worker;

pub use config::WebSocketConfig;
pub use error::Error;
pub use frame::OpCode;
pub use handle::Handle;
pub use state::State;
