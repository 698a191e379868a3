//! The public, thread-safe surface a host embeds: configure, connect, send,
//! observe, and release. Every method here takes a bounded-duration lock
//! and returns; none of them ever touches the socket directly — that's the
//! worker's job (see `worker.rs`).

use crate::callbacks::Callbacks;
use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::frame::{self, OpCode};
use crate::queue::SendQueue;
use crate::state::{Command, State, WorkState};
use crate::worker;
use std::sync::{Arc, Mutex};

/// Parameters the host sets up before `connect()`. Held under one mutex so
/// setters can cheaply check "are we still idle" and write atomically.
struct ConnectionConfig<T> {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    callbacks: Callbacks<T>,
    ws_config: WebSocketConfig,
}

impl<T> ConnectionConfig<T> {
    fn new() -> Self {
        Self {
            scheme: "ws".to_string(),
            host: None,
            port: None,
            path: None,
            callbacks: Callbacks::new(),
            ws_config: WebSocketConfig::default(),
        }
    }
}

/// Resolved, validated parameters handed to the worker at spawn time. The
/// worker owns this outright; nothing else ever touches it.
pub(crate) struct ConnectParams {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub ws_config: WebSocketConfig,
}

pub(crate) struct Shared<T> {
    config: Mutex<ConnectionConfig<T>>,
    pub(crate) work: Mutex<WorkState>,
    pub(crate) send_queue: SendQueue,
    user_data: Arc<T>,
}

/// A cloneable, thread-safe reference to one WebSocket connection. `T` is
/// the host's own opaque user-data payload (the spec's "user-opaque
/// pointer"); most hosts can ignore it and use the default `Handle<()>`.
pub struct Handle<T = ()> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Handle<()> {
    pub fn new() -> Self {
        Self::with_user_data(())
    }
}

impl Default for Handle<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Handle<T> {
    pub fn with_user_data(user_data: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: Mutex::new(ConnectionConfig::new()),
                work: Mutex::new(WorkState::new()),
                send_queue: SendQueue::new(),
                user_data: Arc::new(user_data),
            }),
        }
    }

    pub fn user_data(&self) -> &T {
        &self.shared.user_data
    }

    fn is_idle(&self) -> bool {
        self.shared.work.lock().unwrap().state == State::Idle
    }

    // --- setters: no-ops once connect() has been called ---

    pub fn set_scheme(&self, scheme: impl Into<String>) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().scheme = scheme.into();
    }

    pub fn set_host(&self, host: impl Into<String>) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().host = Some(host.into());
    }

    pub fn set_port(&self, port: u16) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().port = Some(port);
    }

    pub fn set_path(&self, path: impl Into<String>) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().path = Some(path.into());
    }

    /// A `fragment_threshold` of `0` would make `send_text`/`send_binary`
    /// panic on `chunks(0)`; clamp it to `1` rather than propagating that
    /// footgun into `send()`.
    pub fn set_config(&self, mut config: WebSocketConfig) {
        if !self.is_idle() {
            return;
        }
        config.fragment_threshold = config.fragment_threshold.max(1);
        self.shared.config.lock().unwrap().ws_config = config;
    }

    pub fn set_on_connected(&self, f: impl Fn(&Handle<T>) + Send + Sync + 'static) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().callbacks.on_connected = Some(Box::new(f));
    }

    pub fn set_on_disconnected(&self, f: impl Fn(&Handle<T>) + Send + Sync + 'static) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().callbacks.on_disconnected = Some(Box::new(f));
    }

    /// `bytes` are UTF-8 per RFC 6455 but this library does not validate
    /// them — that's the host's responsibility, same as for binary frames.
    pub fn set_on_recvd_text(&self, f: impl Fn(&Handle<T>, &[u8]) + Send + Sync + 'static) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().callbacks.on_recvd_text = Some(Box::new(f));
    }

    pub fn set_on_recvd_bin(&self, f: impl Fn(&Handle<T>, &[u8], bool) + Send + Sync + 'static) {
        if !self.is_idle() {
            return;
        }
        self.shared.config.lock().unwrap().callbacks.on_recvd_bin = Some(Box::new(f));
    }

    /// Parse a `ws://host[:port]/path` URL and populate scheme/host/port/
    /// path from it in one call. A convenience on top of the discrete
    /// setters above; `wss://` is rejected immediately since this build
    /// only speaks plaintext.
    pub fn set_url(&self, url: &str) -> Result<(), Error> {
        if !self.is_idle() {
            return Ok(());
        }
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::MissedParameter(e.to_string()))?;

        let default_port = match parsed.scheme() {
            "ws" => 80,
            "wss" => return Err(Error::TlsNotSupported),
            _ => return Err(Error::MissedParameter("scheme must be ws".into())),
        };
        let host = parsed.host_str().ok_or(Error::MissedParameter("host".into()))?;
        let port = parsed.port().unwrap_or(default_port);
        let path = if let Some(query) = parsed.query() {
            format!("{}?{}", parsed.path(), query)
        } else {
            parsed.path().to_string()
        };

        let mut cfg = self.shared.config.lock().unwrap();
        cfg.scheme = parsed.scheme().to_string();
        cfg.host = Some(host.to_string());
        cfg.port = Some(port);
        cfg.path = Some(path);
        Ok(())
    }

    /// Validate the configured parameters and spawn the background worker.
    /// A second call while already connecting/open/closing is a silent
    /// no-op (this library has no reconnect policy — a disconnected handle
    /// is terminal).
    pub fn connect(&self) -> Result<(), Error> {
        let mut work = self.shared.work.lock().unwrap();
        if work.state != State::Idle {
            return Ok(());
        }

        let mut cfg = self.shared.config.lock().unwrap();
        if cfg.scheme != "ws" {
            return Err(Error::TlsNotSupported);
        }
        let host = cfg.host.clone().ok_or(Error::MissedParameter("host".into()))?;
        if host.is_empty() {
            return Err(Error::MissedParameter("host".into()));
        }
        let port = cfg.port.unwrap_or(80);
        if port == 0 {
            return Err(Error::MissedParameter("port".into()));
        }
        let path = cfg.path.clone().ok_or(Error::MissedParameter("path".into()))?;
        if !path.starts_with('/') {
            return Err(Error::MissedParameter("path must begin with '/'".into()));
        }
        if cfg.callbacks.is_empty() {
            return Err(Error::MissedParameter("callback".into()));
        }

        let params = ConnectParams {
            scheme: cfg.scheme.clone(),
            host,
            port,
            path,
            ws_config: cfg.ws_config.clone(),
        };
        let callbacks = std::mem::take(&mut cfg.callbacks);
        drop(cfg);

        work.state = State::Connecting;

        let handle_for_worker = self.clone();
        let join = std::thread::Builder::new()
            .name("wsclient-worker".into())
            .spawn(move || worker::run(handle_for_worker, params, callbacks))
            .expect("failed to spawn worker thread");
        work.worker = Some(join);

        Ok(())
    }

    /// Enqueue a text message, splitting it into continuation frames above
    /// the configured fragmentation threshold. Accepted silently (queued)
    /// on any non-`Closed` connection, including one that hasn't finished
    /// connecting yet — the spec sides with queue-until-open.
    pub fn send_text(&self, text: &str) -> Result<(), Error> {
        self.send(OpCode::Text, text.as_bytes())
    }

    /// Enqueue a binary message, splitting it the same way as
    /// [`Handle::send_text`].
    pub fn send_binary(&self, data: &[u8]) -> Result<(), Error> {
        self.send(OpCode::Binary, data)
    }

    fn send(&self, opcode: OpCode, payload: &[u8]) -> Result<(), Error> {
        {
            let work = self.shared.work.lock().unwrap();
            if work.state == State::Closed {
                return Err(Error::ReadWriteSocket(
                    "connection is closed, nothing left to drain the queue".into(),
                ));
            }
        }

        let threshold = self
            .shared
            .config
            .lock()
            .unwrap()
            .ws_config
            .fragment_threshold;

        if payload.is_empty() {
            self.shared
                .send_queue
                .push(frame::encode(true, opcode, payload));
            return Ok(());
        }

        let chunks: Vec<&[u8]> = payload.chunks(threshold).collect();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.into_iter().enumerate() {
            let this_opcode = if i == 0 { opcode } else { OpCode::Continuation };
            let fin = i == last;
            self.shared
                .send_queue
                .push(frame::encode(fin, this_opcode, chunk));
        }
        Ok(())
    }

    /// Snapshot of whether the connection is currently `Open`.
    pub fn is_connected(&self) -> bool {
        self.shared.send_queue.is_connected()
    }

    /// The full host-visible lifecycle state, not just the `Open` snapshot
    /// `is_connected()` gives you.
    pub fn state(&self) -> State {
        self.shared.work.lock().unwrap().state
    }

    /// A snapshot of the most recently recorded error, if any.
    pub fn last_error(&self) -> Option<Error> {
        self.shared.work.lock().unwrap().last_error.clone()
    }

    /// Non-blocking: posts a directive to the worker and returns
    /// immediately. If no worker was ever started, releases the handle's
    /// resources inline. Do not call this from within a callback — the
    /// worker thread that would process the command is the same thread
    /// running your callback.
    pub fn disconnect_and_release(&self) {
        let mut work = self.shared.work.lock().unwrap();
        match work.state {
            State::Idle => {
                // No worker exists; there's nothing to release beyond what
                // dropping this handle already does.
            }
            State::Closed => {
                work.command = Command::End;
            }
            _ => {
                work.command = Command::Disconnect;
            }
        }
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        // If this is the last host-held clone (only the worker's own
        // internal clone would remain, if a worker was ever spawned), post
        // the same directive `disconnect_and_release` would. This is the
        // Rust-idiomatic replacement for the C original's "worker frees the
        // handle on its last tick": Arc's refcount does the bookkeeping the
        // original had to do by hand.
        if Arc::strong_count(&self.shared) <= 2 {
            self.disconnect_and_release();
        }
    }
}
