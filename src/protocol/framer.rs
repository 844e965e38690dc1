//! Request-line framing.
//!
//! A Gopher request is a single selector line terminated by CR, LF, or CRLF.
//! The framer pulls one such line out of the connection's accumulating input
//! buffer, bounded at a maximum selector length. A peer that never sends a
//! terminator is cut off at the bound: the first `max_len` bytes are taken
//! verbatim and everything beyond them is discarded, which bounds memory and
//! guarantees forward progress.

use bytes::BytesMut;

/// One framed request line.
///
/// `terminated` records whether a CR/LF was actually observed. Lines taken
/// via the length-bound escape carry `terminated: false`, which the resolver
/// uses to classify them as malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Line bytes, excluding any terminator.
    pub bytes: Vec<u8>,
    /// Whether a CR or LF ended the line.
    pub terminated: bool,
}

/// Framing result.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameResult {
    /// A complete request line is available.
    Complete(RequestLine),
    /// No terminator yet and the length bound not reached.
    Incomplete,
}

/// Try to frame one request line from `input`.
///
/// On `Complete`, the entire input buffer is consumed: remaining bytes are
/// dropped, since exactly one request is processed per connection.
pub fn frame(input: &mut BytesMut, max_len: usize) -> FrameResult {
    let window = max_len.min(input.len());

    if let Some(pos) = input[..window].iter().position(|&b| b == b'\r' || b == b'\n') {
        let line = RequestLine {
            bytes: input[..pos].to_vec(),
            terminated: true,
        };
        input.clear();
        return FrameResult::Complete(line);
    }

    if input.len() >= max_len {
        // Length-bound escape: take the first max_len bytes verbatim.
        let line = RequestLine {
            bytes: input[..max_len].to_vec(),
            terminated: false,
        };
        input.clear();
        return FrameResult::Complete(line);
    }

    FrameResult::Incomplete
}
