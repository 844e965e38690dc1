//! Gopher protocol implementation.
//!
//! The protocol is a single request line per TCP connection: the client
//! sends one selector terminated by CR, LF, or CRLF, the server answers
//! with raw resource bytes or one error item, then closes. Processing is
//! split into three pure-ish stages used by the runtime event loop:
//!
//! - `framer`: extract one bounded request line from the input buffer
//! - `resolver`: map the line to root listing / named resource / malformed
//! - `response`: produce the payload or a formatted Gopher error item

pub mod framer;
pub mod resolver;
pub mod response;

use crate::protocol::framer::RequestLine;
use crate::protocol::response::ResponseOutcome;
use std::path::Path;
use tracing::debug;

/// Resolve a framed request line and build its response.
///
/// Runs synchronously inside the readiness callback; resolution and
/// filesystem access block the event loop for their duration.
pub fn process(line: &RequestLine, root: &Path, listing_file: &str) -> ResponseOutcome {
    let target = resolver::resolve(line);
    debug!(?target, "Resolved selector");
    response::build(&target, root, listing_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::fs;
    use tempfile::TempDir;

    fn process_raw(raw: &[u8], root: &Path) -> Vec<u8> {
        let mut input = BytesMut::from(raw);
        match framer::frame(&mut input, 4096) {
            framer::FrameResult::Complete(line) => {
                process(&line, root, ".selectors").into_bytes()
            }
            other => panic!("request did not frame: {:?}", other),
        }
    }

    #[test]
    fn test_root_selector_serves_listing_verbatim() {
        let dir = TempDir::new().unwrap();
        // 42 bytes, served back exactly.
        let listing = b"0about\tabout.txt\tlocalhost\t70\r\n1sub\tsub\r\n";
        assert_eq!(listing.len(), 42);
        fs::write(dir.path().join(".selectors"), listing).unwrap();

        assert_eq!(process_raw(b"\r\n", dir.path()), listing.to_vec());
    }

    #[test]
    fn test_missing_file_error_line() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            process_raw(b"missing.txt\r\n", dir.path()),
            b"3'missing.txt' does not exist (no handler found)\t\terror.host\t1\r\n".to_vec()
        );
    }

    #[test]
    fn test_unterminated_oversized_request_is_malformed() {
        let dir = TempDir::new().unwrap();
        let raw = vec![b'a'; 5000];
        assert_eq!(
            process_raw(&raw, dir.path()),
            b"3Malformed request\t\terror.host\t1\r\n".to_vec()
        );
    }

    #[test]
    fn test_named_resource_roundtrip() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..1000u32).flat_map(|n| n.to_le_bytes()).collect();
        fs::write(dir.path().join("data.bin"), &content).unwrap();

        assert_eq!(process_raw(b"data.bin\r\n", dir.path()), content);
    }
}
