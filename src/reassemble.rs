//! Fragment reassembly: accumulates `fin=0` frames until a `fin=1` frame
//! completes the logical message. Control frames never pass through here —
//! the worker dispatches them inline, interleaved with an in-progress
//! fragmented message, per RFC 6455.

use crate::error::Error;
use crate::frame::{Frame, OpCode};

#[derive(Default)]
pub struct Reassembler {
    in_progress: Option<(OpCode, Vec<u8>)>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one data frame (`Text`/`Binary`/`Continuation`) in. Returns
    /// `Ok(None)` while the message is still being assembled, or
    /// `Ok(Some(frame))` — with `fin` set and `opcode` equal to the first
    /// fragment's opcode — once it completes.
    pub fn accept(&mut self, frame: Frame) -> Result<Option<Frame>, Error> {
        match frame.opcode {
            OpCode::Continuation => match self.in_progress.take() {
                None => Err(Error::ProtocolError(
                    "continuation frame with no message in progress".into(),
                )),
                Some((opcode, mut payload)) => {
                    payload.extend_from_slice(&frame.payload);
                    if frame.fin {
                        Ok(Some(Frame {
                            fin: true,
                            opcode,
                            masked: false,
                            payload,
                        }))
                    } else {
                        self.in_progress = Some((opcode, payload));
                        Ok(None)
                    }
                }
            },
            OpCode::Text | OpCode::Binary => {
                if self.in_progress.is_some() {
                    return Err(Error::ProtocolError(
                        "received a new message before the previous fragmented one finished"
                            .into(),
                    ));
                }
                if frame.fin {
                    Ok(Some(frame))
                } else {
                    self.in_progress = Some((frame.opcode, frame.payload));
                    Ok(None)
                }
            }
            OpCode::Close | OpCode::Ping | OpCode::Pong => Err(Error::ProtocolError(
                "control frames must be dispatched inline, not reassembled".into(),
            )),
        }
    }

    /// Whether a fragmented message is currently being accumulated. Useful
    /// for the worker to decide whether an interleaved control frame is
    /// legal mid-fragmentation (it always is — this is only used for
    /// logging/diagnostics).
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Bytes accumulated so far for an in-progress fragmented message.
    /// Lets the worker enforce `WebSocketConfig::max_message_size` without
    /// this module needing to know about configuration at all.
    pub fn current_len(&self) -> usize {
        self.in_progress.as_ref().map_or(0, |(_, p)| p.len())
    }
}
