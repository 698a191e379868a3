//! Embedding hosts that never run Rust's own `fn main` startup (a cdylib
//! loaded into a non-Rust process) don't get the SIG_IGN the standard
//! runtime installs for you. A peer that resets the connection mid-write
//! would otherwise deliver a real `SIGPIPE` and take the whole host process
//! down instead of a plain `EPIPE` on the write call.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install `SIG_IGN` for `SIGPIPE` exactly once, no matter how many
/// connections get spawned. A no-op on non-unix targets.
pub(crate) fn ignore_once() {
    #[cfg(unix)]
    INIT.call_once(|| unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    });
    #[cfg(not(unix))]
    INIT.call_once(|| {});
}
