//! The connection's lifecycle and the single-slot command channel the host
//! uses to direct the worker. Both live inside one `Mutex<WorkState>` —
//! `work_mutex` in the design doc's terms — so a snapshot of "what should I
//! do, and what state am I in" is always consistent.

use crate::error::Error;
use std::thread::JoinHandle;

/// Host-visible lifecycle state (§3 of the design doc). `Connecting` covers
/// both TCP connect and the HTTP handshake — see [`Phase`] for the
/// worker's finer-grained private view of the same period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// The worker's own bookkeeping, strictly finer-grained than [`State`].
/// `Handshaking` maps to `State::Connecting` for anything host-visible —
/// see SPEC_FULL.md §4.D for why the two enums don't line up 1:1.
///
/// `Closed` is itself a phase the worker idles in (per spec §4.D's "closed |
/// host command = end | (terminal; worker exits)" row): reaching it releases
/// the socket and send queue right away, but the thread keeps ticking,
/// asleep, until it observes `Command::End` — see `worker.rs::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Connecting,
    Handshaking,
    Open,
    Closing,
    Closed,
}

impl Phase {
    pub(crate) fn as_state(self) -> State {
        match self {
            Phase::Connecting | Phase::Handshaking => State::Connecting,
            Phase::Open => State::Open,
            Phase::Closing => State::Closing,
            Phase::Closed => State::Closed,
        }
    }
}

/// A single-slot directive from host to worker. Posting a new command
/// overwrites whatever was there; the worker only ever reads the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    None,
    /// Initiate (or, during connect/handshake, abort into) a graceful
    /// close.
    Disconnect,
    /// The worker has released its resources and reached `Closed`, but is
    /// still ticking (idle) waiting to be told it may exit; observed at the
    /// top of the next tick, which breaks the run loop.
    End,
}

/// Everything guarded by `work_mutex`: the host-visible state, the pending
/// command, the most recent error, and whether a worker thread has ever
/// been spawned for this handle.
pub struct WorkState {
    pub state: State,
    pub command: Command,
    pub last_error: Option<Error>,
    pub worker: Option<JoinHandle<()>>,
}

impl WorkState {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            command: Command::None,
            last_error: None,
            worker: None,
        }
    }
}

impl Default for WorkState {
    fn default() -> Self {
        Self::new()
    }
}
