//! The callback set a host registers before `connect()`. All four are
//! invoked from the worker thread only, in server delivery order, and are
//! never called concurrently with each other (the worker is single
//! threaded) — see SPEC_FULL.md §5.

use crate::handle::Handle;

type OnConnected<T> = Box<dyn Fn(&Handle<T>) + Send + Sync>;
type OnDisconnected<T> = Box<dyn Fn(&Handle<T>) + Send + Sync>;
// `bytes are UTF-8 but validation is the host's responsibility` (spec §6) —
// raw bytes are handed through uninterpreted, same as the binary callback.
type OnRecvdText<T> = Box<dyn Fn(&Handle<T>, &[u8]) + Send + Sync>;
type OnRecvdBin<T> = Box<dyn Fn(&Handle<T>, &[u8], bool) + Send + Sync>;

pub struct Callbacks<T> {
    pub on_connected: Option<OnConnected<T>>,
    pub on_disconnected: Option<OnDisconnected<T>>,
    pub on_recvd_text: Option<OnRecvdText<T>>,
    pub on_recvd_bin: Option<OnRecvdBin<T>>,
}

impl<T> Callbacks<T> {
    pub fn new() -> Self {
        Self {
            on_connected: None,
            on_disconnected: None,
            on_recvd_text: None,
            on_recvd_bin: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.on_connected.is_none()
            && self.on_disconnected.is_none()
            && self.on_recvd_text.is_none()
            && self.on_recvd_bin.is_none()
    }
}

// Written by hand rather than `#[derive(Default)]`: the derive macro adds a
// `T: Default` bound even though every field here is an `Option`, which
// would force that bound onto every generic call site in `handle.rs`.
impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}
