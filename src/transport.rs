//! The byte pipe the worker reads from and writes to. `spec.md` §1 calls
//! out that although this build only speaks plaintext `ws://`, the core
//! should be "structured so a transport layer could be substituted" for a
//! future `wss://` build. This trait is that seam: everything past the
//! initial TCP connect in `worker.rs` goes through `Transport`, never
//! `TcpStream` directly, so a TLS-wrapping implementation could be dropped
//! in behind [`crate::handle::ConnectParams`] without touching the state
//! machine, codec, or reassembly logic above it.

use std::io::{Read, Write};
use std::net::TcpStream;

pub(crate) trait Transport: Read + Write + Send {
    /// Flip the underlying socket nonblocking (or not), matching
    /// `TcpStream::set_nonblocking`'s contract.
    fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()>;
}

impl Transport for TcpStream {
    fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
        TcpStream::set_nonblocking(self, nonblocking)
    }
}
