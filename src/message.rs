use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on one encoded frame, delimiter included. Messages that do
/// not fit are rejected outright rather than truncated.
pub const MAX_FRAME_LEN: usize = 1000;

/// One unit of chat traffic: who sent it and what they typed. The text
/// keeps its trailing newline so the sending side's line is reproduced
/// verbatim on the receiving side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame of {len} bytes exceeds the {MAX_FRAME_LEN}-byte limit")]
    Oversized { len: usize },
    #[error("frame ends in the middle of a message")]
    Truncated,
    #[error("malformed frame: {0}")]
    Malformed(serde_json::Error),
}

/// Encodes a message as one newline-delimited JSON frame. Interior newlines
/// in the text are escaped by JSON, so the frame delimiter stays unambiguous.
pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    let mut frame = serde_json::to_vec(message).map_err(CodecError::Malformed)?;
    frame.push(b'\n');
    if frame.len() > MAX_FRAME_LEN {
        return Err(CodecError::Oversized { len: frame.len() });
    }
    Ok(frame)
}

/// Decodes one frame back into a message. The trailing delimiter is
/// tolerated but not required.
pub fn decode(frame: &[u8]) -> Result<Message, CodecError> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(CodecError::Oversized { len: frame.len() });
    }
    serde_json::from_slice(frame).map_err(|err| {
        if err.is_eof() {
            CodecError::Truncated
        } else {
            CodecError::Malformed(err)
        }
    })
}
