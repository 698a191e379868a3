//! A minimal, hand-written loopback WebSocket peer for the end-to-end
//! scenarios in `spec.md` §8. Deliberately does not use this crate's own
//! frame encoder/decoder or handshake builder: the point of these tests is
//! to exercise `wsclient_core::Handle` against bytes assembled
//! independently of the code under test, the same way a real server on the
//! wire would be independent of it.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Read the client's opening HTTP request off `stream` up to the blank
/// line, and return the `Sec-WebSocket-Key` header value.
pub fn read_request_key(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut key = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some(rest) = line
            .strip_prefix("Sec-WebSocket-Key:")
            .or_else(|| line.strip_prefix("sec-websocket-key:"))
        {
            key = Some(rest.trim().to_string());
        }
    }
    key.expect("client request carried a Sec-WebSocket-Key header")
}

pub fn accept_value(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// Write a valid `101 Switching Protocols` response whose
/// `Sec-WebSocket-Accept` matches the client's key.
pub fn write_valid_upgrade(stream: &mut TcpStream, key: &str) {
    let accept = accept_value(key);
    write_upgrade_with_accept(stream, &accept);
}

pub fn write_upgrade_with_accept(stream: &mut TcpStream, accept: &str) {
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\
         \r\n"
    );
    stream.write_all(response.as_bytes()).unwrap();
}

pub fn write_404(stream: &mut TcpStream) {
    stream
        .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
        .unwrap();
}

/// Build one unmasked server->client frame (server frames must not be
/// masked per RFC 6455).
pub fn server_frame(fin: bool, opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 10);
    out.push(((fin as u8) << 7) | opcode);
    let len = payload.len();
    if len <= 125 {
        out.push(len as u8);
    } else if len <= 65_535 {
        out.push(126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }
    out.extend_from_slice(payload);
    out
}

/// Read one masked client->server frame off `stream` and return its
/// (fin, opcode, unmasked payload). Blocks until a full frame arrives.
pub fn read_client_frame(stream: &mut TcpStream) -> (bool, u8, Vec<u8>) {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).unwrap();
    let fin = header[0] & 0x80 != 0;
    let opcode = header[0] & 0x0F;
    let masked = header[1] & 0x80 != 0;
    assert!(masked, "client frames must be masked");
    let len7 = header[1] & 0x7F;

    let len: u64 = match len7 {
        126 => {
            let mut ext = [0u8; 2];
            stream.read_exact(&mut ext).unwrap();
            u16::from_be_bytes(ext) as u64
        }
        127 => {
            let mut ext = [0u8; 8];
            stream.read_exact(&mut ext).unwrap();
            u64::from_be_bytes(ext)
        }
        n => n as u64,
    };

    let mut mask = [0u8; 4];
    stream.read_exact(&mut mask).unwrap();

    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).unwrap();
    for (i, b) in payload.iter_mut().enumerate() {
        *b ^= mask[i % 4];
    }

    (fin, opcode, payload)
}

/// Read client frames until one with `fin` set completes a (possibly
/// fragmented) message, and return (first frame's opcode, concatenated
/// payload). Control frames read mid-fragmentation are returned as-is
/// without being folded into the accumulation (mirrors the crate's own
/// reassembly rule that control frames bypass it).
pub fn read_client_message(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let (fin, opcode, mut payload) = read_client_frame(stream);
    if fin {
        return (opcode, payload);
    }
    loop {
        let (fin, cont_opcode, chunk) = read_client_frame(stream);
        assert_eq!(cont_opcode, 0x0, "expected a continuation frame");
        payload.extend_from_slice(&chunk);
        if fin {
            return (opcode, payload);
        }
    }
}

/// Spin up a listener on an OS-assigned port and hand the accepted stream
/// to `server` on a background thread. Returns the `ws://127.0.0.1:<port>`
/// URL the client side should connect to.
pub fn spawn_server<F>(server: F) -> String
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        server(stream);
    });
    format!("ws://127.0.0.1:{port}/")
}
