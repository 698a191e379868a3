//! End-to-end scenarios 3 and 4 from `spec.md` §8: a handshake that
//! completes with the wrong `Sec-WebSocket-Accept`, and one that never gets
//! past an HTTP error status.

mod support;

use std::sync::mpsc;
use std::time::Duration;

use wsclient_core::{Error, Handle};

#[test]
fn bad_accept_value_disconnects_with_parse_handshake_error() {
    let url = support::spawn_server(|mut stream| {
        let _key = support::read_request_key(&stream);
        support::write_upgrade_with_accept(&mut stream, "not-the-right-value");
    });

    let (tx, rx) = mpsc::channel();
    let handle = Handle::new();
    handle.set_url(&url).unwrap();
    handle.set_on_connected(|_h| panic!("must not connect on a bad accept value"));
    handle.set_on_disconnected(move |h| {
        let _ = tx.send(h.last_error());
    });
    handle.connect().unwrap();

    let error = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    match error {
        Some(Error::ParseHandshake { .. }) => {}
        other => panic!("expected ParseHandshake, got {other:?}"),
    }
}

#[test]
fn http_404_disconnects_with_parse_handshake_and_status() {
    let url = support::spawn_server(|mut stream| {
        let _key = support::read_request_key(&stream);
        support::write_404(&mut stream);
    });

    let (tx, rx) = mpsc::channel();
    let handle = Handle::new();
    handle.set_url(&url).unwrap();
    handle.set_on_connected(|_h| panic!("must not connect on a 404"));
    handle.set_on_disconnected(move |h| {
        let _ = tx.send(h.last_error());
    });
    handle.connect().unwrap();

    let error = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(error.and_then(|e| e.http_status()), Some(404));
}
