//! The client side of the HTTP/1.1 Upgrade handshake: building the request
//! and validating the server's `101 Switching Protocols` response,
//! including the `Sec-WebSocket-Accept` challenge.

use crate::error::Error;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use rand::random;
use sha1::{Digest, Sha1};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const MAX_RESPONSE_HEADERS: usize = 32;
const USER_AGENT: &str = concat!("wsclient-core/", env!("CARGO_PKG_VERSION"));

fn generate_key() -> String {
    let bytes: [u8; 16] = random();
    BASE64_STANDARD.encode(bytes)
}

fn expected_accept_value(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// An opening request ready to write to the socket, paired with the accept
/// value the response must echo back.
pub struct HandshakeRequest {
    pub bytes: Vec<u8>,
    pub expected_accept: String,
}

/// Build the client opening handshake request. The port is included in the
/// `Host`/`Origin` headers only when it differs from the scheme's default
/// (80 for `ws`; this build does not speak `wss`).
pub fn build_request(scheme: &str, host: &str, port: u16, path: &str) -> HandshakeRequest {
    let key = generate_key();
    let expected_accept = expected_accept_value(&key);

    let host_header = if port == 80 {
        host.to_string()
    } else {
        format!("{host}:{port}")
    };

    let request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host_header}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Origin: {scheme}://{host_header}\r\n\
         User-Agent: {USER_AGENT}\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Protocol: chat, superchat\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    );

    HandshakeRequest {
        bytes: request.into_bytes(),
        expected_accept,
    }
}

/// Outcome of feeding more response bytes to [`parse_response`].
pub enum ResponseOutcome {
    /// Not enough bytes yet to see a full `\r\n\r\n`-terminated header block.
    NeedMore,
    /// Handshake accepted; `consumed` is the number of leading bytes of the
    /// buffer the header block used (anything past it is frame-stream
    /// bytes and must be retained).
    Accepted { consumed: usize },
    /// The response was well-formed HTTP but failed validation, or wasn't
    /// well-formed HTTP at all.
    Rejected(Error),
}

/// Validate a server response against the spec's checklist: `101` status,
/// case-insensitive `Upgrade: websocket` and `Connection: Upgrade`, and a
/// byte-exact (after trimming) `Sec-WebSocket-Accept` match.
pub fn parse_response(buf: &[u8], expected_accept: &str) -> ResponseOutcome {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    match response.parse(buf) {
        Ok(httparse::Status::Partial) => ResponseOutcome::NeedMore,
        Err(e) => ResponseOutcome::Rejected(Error::parse_handshake(format!(
            "malformed HTTP response: {e}"
        ))),
        Ok(httparse::Status::Complete(consumed)) => {
            let code = response.code.unwrap_or(0);
            if code != 101 {
                return ResponseOutcome::Rejected(Error::parse_handshake_with_status(
                    "server did not upgrade the connection",
                    code,
                ));
            }

            if !header_equals_ci(response.headers, "Upgrade", "websocket") {
                return ResponseOutcome::Rejected(Error::parse_handshake_with_status(
                    "missing or invalid Upgrade header",
                    code,
                ));
            }
            if !header_equals_ci(response.headers, "Connection", "Upgrade") {
                return ResponseOutcome::Rejected(Error::parse_handshake_with_status(
                    "missing or invalid Connection header",
                    code,
                ));
            }

            match header_value(response.headers, "Sec-WebSocket-Accept") {
                None => ResponseOutcome::Rejected(Error::parse_handshake_with_status(
                    "missing Sec-WebSocket-Accept header",
                    code,
                )),
                Some(actual) if actual.trim() == expected_accept => {
                    ResponseOutcome::Accepted { consumed }
                }
                Some(_) => ResponseOutcome::Rejected(Error::parse_handshake_with_status(
                    "Sec-WebSocket-Accept did not match the expected value",
                    code,
                )),
            }
        }
    }
}

fn header_value<'a>(headers: &'a [httparse::Header<'a>], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .and_then(|h| std::str::from_utf8(h.value).ok())
}

fn header_equals_ci(headers: &[httparse::Header], name: &str, expected: &str) -> bool {
    header_value(headers, name)
        .map(|v| v.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_default_port() {
        let req = build_request("ws", "example.com", 80, "/chat");
        let text = String::from_utf8(req.bytes).unwrap();
        assert!(text.starts_with("GET /chat HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(!text.contains("example.com:80"));
        assert!(text.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn request_includes_non_default_port() {
        let req = build_request("ws", "example.com", 8080, "/");
        let text = String::from_utf8(req.bytes).unwrap();
        assert!(text.contains("Host: example.com:8080\r\n"));
        assert!(text.contains("Origin: ws://example.com:8080\r\n"));
    }

    #[test]
    fn request_carries_a_user_agent_header() {
        let req = build_request("ws", "example.com", 80, "/chat");
        let text = String::from_utf8(req.bytes).unwrap();
        assert!(text.contains(&format!("User-Agent: {USER_AGENT}\r\n")));
    }

    fn accept_response(key_based_accept: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {key_based_accept}\r\n\
             \r\n"
        )
        .into_bytes()
    }

    #[test]
    fn accepts_valid_101_response() {
        let req = build_request("ws", "example.com", 80, "/");
        let response = accept_response(&req.expected_accept);
        match parse_response(&response, &req.expected_accept) {
            ResponseOutcome::Accepted { consumed } => assert_eq!(consumed, response.len()),
            _ => panic!("expected acceptance"),
        }
    }

    #[test]
    fn retains_trailing_bytes_past_the_header_block() {
        let req = build_request("ws", "example.com", 80, "/");
        let mut response = accept_response(&req.expected_accept);
        response.extend_from_slice(b"\x82\x00"); // a frame already in the buffer
        match parse_response(&response, &req.expected_accept) {
            ResponseOutcome::Accepted { consumed } => {
                assert_eq!(&response[consumed..], b"\x82\x00");
            }
            _ => panic!("expected acceptance"),
        }
    }

    #[test]
    fn needs_more_on_partial_headers() {
        let partial = b"HTTP/1.1 101 Switching Proto";
        assert!(matches!(parse_response(partial, "anything"), ResponseOutcome::NeedMore));
    }

    #[test]
    fn rejects_wrong_status() {
        let response = b"HTTP/1.1 404 Not Found\r\n\r\n";
        match parse_response(response, "anything") {
            ResponseOutcome::Rejected(e) => assert_eq!(e.http_status(), Some(404)),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn rejects_mismatched_accept() {
        let response = accept_response("not-the-right-value");
        match parse_response(&response, "the-expected-value") {
            ResponseOutcome::Rejected(e) => assert_eq!(e.http_status(), Some(101)),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let req = build_request("ws", "example.com", 80, "/");
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             upgrade: WebSocket\r\n\
             connection: upgrade\r\n\
             sec-websocket-accept: {}\r\n\
             \r\n",
            req.expected_accept
        )
        .into_bytes();
        assert!(matches!(
            parse_response(&response, &req.expected_accept),
            ResponseOutcome::Accepted { .. }
        ));
    }
}
