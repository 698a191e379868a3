//! The background thread: one per connection, spawned by `Handle::connect`
//! and driving the whole lifecycle from TCP connect through the close
//! handshake. Nothing in here is ever called from a host thread.

use bytes::{Buf, BytesMut};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{debug, error, trace, warn};

use crate::callbacks::Callbacks;
use crate::error::Error;
use crate::frame::{self, Decoded, Frame, OpCode};
use crate::handle::{ConnectParams, Handle};
use crate::handshake::{self, ResponseOutcome};
use crate::reassemble::Reassembler;
use crate::state::{Command, Phase, State};
use crate::transport::Transport;

/// Entry point spawned by `Handle::connect`. Keeps ticking through every
/// phase up to and including `Closed` (releasing resources and firing
/// `on_disconnected` on the way in), then idles until the host posts
/// `Command::End` — see spec §4.D's `closed | end | worker exits` row.
pub(crate) fn run<T>(handle: Handle<T>, params: ConnectParams, callbacks: Callbacks<T>) {
    crate::sigpipe::ignore_once();
    Worker::new(handle, params, callbacks).run();
}

struct Worker<T> {
    handle: Handle<T>,
    params: ConnectParams,
    callbacks: Callbacks<T>,
    phase: Phase,
    stream: Option<Box<dyn Transport>>,
    recv_buf: BytesMut,
    reassembler: Reassembler,
    pending_write: Option<(Vec<u8>, usize)>,
    expected_accept: String,
    closing_since: Option<Instant>,
}

impl<T> Worker<T> {
    fn new(handle: Handle<T>, params: ConnectParams, callbacks: Callbacks<T>) -> Self {
        Self {
            handle,
            params,
            callbacks,
            phase: Phase::Connecting,
            stream: None,
            recv_buf: BytesMut::new(),
            reassembler: Reassembler::new(),
            pending_write: None,
            expected_accept: String::new(),
            closing_since: None,
        }
    }

    fn run(&mut self) {
        loop {
            let command = self.handle.shared.work.lock().unwrap().command;
            if command == Command::End {
                break;
            }

            let keep_going = match self.phase {
                Phase::Connecting => self.tick_connecting(command),
                Phase::Handshaking => self.tick_handshaking(command),
                Phase::Open => self.tick_open(command),
                Phase::Closing => self.tick_closing(command),
                // Resources are already released; just wait for `End`.
                Phase::Closed => true,
            };

            if !keep_going {
                break;
            }

            std::thread::sleep(self.params.ws_config.tick_interval);
        }
    }

    // --- phase: connecting ---

    /// A single blocking attempt: resolve, `connect_timeout`, set
    /// nonblocking, write the opening request. All of this is small and
    /// fast enough to do inline rather than spread across ticks.
    fn tick_connecting(&mut self, command: Command) -> bool {
        if command == Command::Disconnect {
            self.finish(None);
            return true;
        }

        let addr = format!("{}:{}", self.params.host, self.params.port);
        debug!("idle->connecting: resolving {addr}");
        let resolved = match addr
            .to_socket_addrs()
            .ok()
            .and_then(|mut it| it.next())
        {
            Some(a) => a,
            None => {
                self.finish(Some(Error::Connect(format!(
                    "could not resolve {addr}"
                ))));
                return true;
            }
        };

        let stream = match TcpStream::connect_timeout(&resolved, Duration::from_secs(10)) {
            Ok(s) => s,
            Err(e) => {
                self.finish(Some(Error::Connect(e.to_string())));
                return true;
            }
        };
        debug!("connecting->handshaking: TCP connected to {resolved}");
        if let Err(e) = stream.set_nodelay(true) {
            self.finish(Some(Error::Connect(e.to_string())));
            return true;
        }

        self.stream = Some(Box::new(stream));

        let request = handshake::build_request(
            &self.params.scheme,
            &self.params.host,
            self.params.port,
            &self.params.path,
        );
        if let Err(e) = self.write_all_blocking(&request.bytes) {
            self.finish(Some(e));
            return true;
        }
        if let Err(e) = self
            .stream
            .as_mut()
            .expect("just connected")
            .set_nonblocking(true)
        {
            self.finish(Some(Error::Connect(e.to_string())));
            return true;
        }

        self.expected_accept = request.expected_accept;
        self.phase = Phase::Handshaking;
        true
    }

    // --- phase: handshaking ---

    fn tick_handshaking(&mut self, command: Command) -> bool {
        if command == Command::Disconnect {
            self.finish(None);
            return true;
        }

        if let Err(e) = self.read_available() {
            self.finish(Some(e));
            return true;
        }

        const MAX_HANDSHAKE_BYTES: usize = 16 * 1024;
        if self.recv_buf.len() > MAX_HANDSHAKE_BYTES {
            self.finish(Some(Error::parse_handshake(
                "handshake response exceeded the maximum header size",
            )));
            return true;
        }

        match handshake::parse_response(&self.recv_buf, &self.expected_accept) {
            ResponseOutcome::NeedMore => true,
            ResponseOutcome::Rejected(e) => {
                self.finish(Some(e));
                true
            }
            ResponseOutcome::Accepted { consumed } => {
                self.recv_buf.advance(consumed);
                self.phase = Phase::Open;
                {
                    let mut work = self.handle.shared.work.lock().unwrap();
                    work.state = self.phase.as_state();
                }
                self.handle.shared.send_queue.set_connected(true);
                debug!("handshaking->open: Sec-WebSocket-Accept validated");
                if let Some(cb) = &self.callbacks.on_connected {
                    cb(&self.handle);
                }
                true
            }
        }
    }

    // --- phase: open ---

    fn tick_open(&mut self, command: Command) -> bool {
        if command == Command::Disconnect {
            debug!("open->closing: host requested disconnect");
            self.begin_closing(Vec::new());
            return true;
        }

        if let Err(e) = self.flush_writes() {
            self.finish(Some(e));
            return true;
        }

        if let Err(e) = self.read_available() {
            self.finish(Some(e));
            return true;
        }

        loop {
            match frame::decode_next(&self.recv_buf, self.params.ws_config.max_frame_size) {
                Decoded::NeedMore => break,
                Decoded::Err(e) => {
                    self.finish(Some(e));
                    return true;
                }
                Decoded::Frame { frame, consumed } => {
                    self.recv_buf.advance(consumed);
                    if let Err(e) = self.dispatch(frame) {
                        self.finish(Some(e));
                        return true;
                    }
                    if self.phase != Phase::Open {
                        return true;
                    }
                }
            }
        }
        true
    }

    fn dispatch(&mut self, frame: Frame) -> Result<(), Error> {
        trace!(
            "recv frame: opcode={:?} fin={} len={}",
            frame.opcode,
            frame.fin,
            frame.payload.len()
        );
        match frame.opcode {
            OpCode::Ping => {
                self.handle
                    .shared
                    .send_queue
                    .push(frame::encode(true, OpCode::Pong, &frame.payload));
                Ok(())
            }
            OpCode::Pong => Ok(()),
            OpCode::Close => {
                let payload = frame.payload;
                debug!("open->closing: close frame received from peer");
                self.begin_closing(payload);
                Ok(())
            }
            OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                match self.reassembler.accept(frame)? {
                    None => {
                        if self.reassembler.current_len() > self.params.ws_config.max_message_size
                        {
                            return Err(Error::ProtocolError(
                                "reassembled message exceeded the configured maximum".into(),
                            ));
                        }
                        Ok(())
                    }
                    Some(msg) => {
                        if msg.payload.len() > self.params.ws_config.max_message_size {
                            return Err(Error::ProtocolError(
                                "reassembled message exceeded the configured maximum".into(),
                            ));
                        }
                        match msg.opcode {
                            OpCode::Text => {
                                if let Some(cb) = &self.callbacks.on_recvd_text {
                                    cb(&self.handle, &msg.payload);
                                }
                            }
                            OpCode::Binary => {
                                if let Some(cb) = &self.callbacks.on_recvd_bin {
                                    cb(&self.handle, &msg.payload, true);
                                }
                            }
                            _ => unreachable!("reassembler only ever yields Text or Binary"),
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    /// Enqueue an echoing close frame and move to `Closing`. Used both for
    /// a host-initiated disconnect (empty payload) and a peer-initiated
    /// close (echoing the peer's own code/reason back, per RFC 6455).
    fn begin_closing(&mut self, payload: Vec<u8>) {
        self.handle
            .shared
            .send_queue
            .push(frame::encode(true, OpCode::Close, &payload));
        self.handle.shared.send_queue.set_connected(false);
        self.phase = Phase::Closing;
        {
            let mut work = self.handle.shared.work.lock().unwrap();
            work.state = self.phase.as_state();
        }
        self.closing_since = Some(Instant::now());
    }

    // --- phase: closing ---

    fn tick_closing(&mut self, _command: Command) -> bool {
        if let Err(e) = self.flush_writes() {
            self.finish(Some(e));
            return true;
        }

        if self.handle.shared.send_queue.is_empty() && self.pending_write.is_none() {
            self.finish(None);
            return true;
        }

        let elapsed = self
            .closing_since
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO);
        if elapsed >= self.params.ws_config.close_timeout {
            self.finish(None);
            return true;
        }

        true
    }

    // --- shared helpers ---

    /// Resume any partial write, then drain the send queue. Nonblocking:
    /// a `WouldBlock` stashes the remainder in `pending_write` for the
    /// next tick rather than spinning.
    fn flush_writes(&mut self) -> Result<(), Error> {
        loop {
            if self.pending_write.is_none() {
                match self.handle.shared.send_queue.pop_front() {
                    Some(frame) => self.pending_write = Some((frame, 0)),
                    None => return Ok(()),
                }
            }

            let (frame, offset) = self.pending_write.take().unwrap();
            let stream = self.stream.as_mut().expect("socket exists once connected");
            match stream.write(&frame[offset..]) {
                Ok(0) => return Err(Error::ReadWriteSocket("socket closed mid-write".into())),
                Ok(n) => {
                    let new_offset = offset + n;
                    if new_offset < frame.len() {
                        warn!(
                            "short write ({new_offset}/{} bytes), resuming next tick",
                            frame.len()
                        );
                        self.pending_write = Some((frame, new_offset));
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    self.pending_write = Some((frame, offset));
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Blocking write used only for the handshake request, before the
    /// socket is flipped nonblocking for the rest of the connection.
    fn write_all_blocking(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let stream = self.stream.as_mut().expect("socket exists once connected");
        stream.write_all(bytes)?;
        Ok(())
    }

    /// Drain whatever the socket currently has into `recv_buf`. A
    /// `WouldBlock` with nothing read yet is not an error, just nothing to
    /// do this tick; a clean EOF before any bytes arrived this call is
    /// only an error once we're past the handshake, since the handshake
    /// path re-polls on `NeedMore` regardless.
    fn read_available(&mut self) -> Result<(), Error> {
        let stream = self.stream.as_mut().expect("socket exists once connected");
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(Error::ReadWriteSocket(
                        "peer closed the connection without a close handshake".into(),
                    ))
                }
                Ok(n) => {
                    self.recv_buf.extend_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Terminal transition: record the error (if any), flip to `Closed`,
    /// drop the socket, fire `on_disconnected`, and clear the send queue.
    /// The run loop keeps ticking after this (idle, see `Phase::Closed`)
    /// until the host posts `Command::End` — via an explicit
    /// `disconnect_and_release()` call, or via `Handle`'s `Drop` impl once
    /// the last host-held clone goes away.
    fn finish(&mut self, error: Option<Error>) {
        match &error {
            Some(e) => error!("->closed: terminating with error: {e}"),
            None => debug!("->closed: terminating cleanly"),
        }
        self.stream = None;
        self.handle.shared.send_queue.clear();
        self.handle.shared.send_queue.set_connected(false);
        self.phase = Phase::Closed;
        {
            let mut work = self.handle.shared.work.lock().unwrap();
            work.last_error = error;
            work.state = State::Closed;
        }
        if let Some(cb) = &self.callbacks.on_disconnected {
            cb(&self.handle);
        }
    }
}
