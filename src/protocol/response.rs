//! Response building.
//!
//! Turns a resolved target into the bytes queued for the peer: the full
//! contents of the listing file or named resource, or a single Gopher error
//! item. Error items use item type `3` with placeholder selector, host, and
//! port fields, since no redirect is intended:
//!
//! ```text
//! 3<message>\t\terror.host\t1\r\n
//! ```
//!
//! No end-of-listing `.` line is appended; payloads and error items end
//! where their bytes end.

use crate::protocol::resolver::ResolvedTarget;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Placeholder host field for error items.
const ERROR_HOST: &str = "error.host";

/// Placeholder port field for error items.
const ERROR_PORT: &str = "1";

/// Outcome of building a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Full contents of the opened resource; length was known up front.
    Payload(Vec<u8>),
    /// A single formatted Gopher error item.
    Error(Vec<u8>),
}

impl ResponseOutcome {
    /// The bytes to queue for the peer.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ResponseOutcome::Payload(bytes) | ResponseOutcome::Error(bytes) => bytes,
        }
    }
}

/// Format a single Gopher error item.
pub fn error_item(message: &str) -> Vec<u8> {
    format!("3{message}\t\t{ERROR_HOST}\t{ERROR_PORT}\r\n").into_bytes()
}

/// Build the response for a resolved target.
///
/// `root` is the serving root directory; `listing_file` is the name of the
/// operator-maintained root listing resource. Filesystem access is
/// synchronous, and any handle acquired on a failure path is released before
/// returning.
pub fn build(target: &ResolvedTarget, root: &Path, listing_file: &str) -> ResponseOutcome {
    match target {
        ResolvedTarget::RootListing => match read_resource(&root.join(listing_file)) {
            Ok(bytes) => ResponseOutcome::Payload(bytes),
            Err(e) => {
                debug!(listing_file, error = %e, "Root listing unavailable");
                ResponseOutcome::Error(error_item("No listing resource available."))
            }
        },
        ResolvedTarget::NamedResource(selector) => {
            let path = root.join(selector);
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    debug!(selector, error = %e, "Open failed");
                    return ResponseOutcome::Error(error_item(&format!(
                        "'{selector}' does not exist (no handler found)"
                    )));
                }
            };
            match read_opened(file) {
                Ok(bytes) => ResponseOutcome::Payload(bytes),
                Err(e) => {
                    debug!(selector, error = %e, "Stat or read failed");
                    ResponseOutcome::Error(error_item(&format!("'{selector}' is unreadable")))
                }
            }
        }
        ResolvedTarget::Malformed => ResponseOutcome::Error(error_item("Malformed request")),
    }
}

/// Open and read a resource in one step (root listing path).
fn read_resource(path: &Path) -> io::Result<Vec<u8>> {
    read_opened(File::open(path)?)
}

/// Read the full byte range `[0, size)` of an already-opened file.
fn read_opened(mut file: File) -> io::Result<Vec<u8>> {
    let size = file.metadata()?.len() as usize;
    let mut bytes = Vec::with_capacity(size);
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn serving_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".selectors"), b"0readme\treadme.txt\tlocalhost\t70\r\n").unwrap();
        fs::write(dir.path().join("readme.txt"), b"hello from burrow\n").unwrap();
        dir
    }

    #[test]
    fn test_error_item_format() {
        assert_eq!(
            error_item("Malformed request"),
            b"3Malformed request\t\terror.host\t1\r\n".to_vec()
        );
    }

    #[test]
    fn test_build_root_listing() {
        let dir = serving_root();
        let outcome = build(&ResolvedTarget::RootListing, dir.path(), ".selectors");
        assert_eq!(
            outcome,
            ResponseOutcome::Payload(b"0readme\treadme.txt\tlocalhost\t70\r\n".to_vec())
        );
    }

    #[test]
    fn test_build_root_listing_missing() {
        let dir = TempDir::new().unwrap();
        let outcome = build(&ResolvedTarget::RootListing, dir.path(), ".selectors");
        assert_eq!(
            outcome,
            ResponseOutcome::Error(b"3No listing resource available.\t\terror.host\t1\r\n".to_vec())
        );
    }

    #[test]
    fn test_build_named_resource_roundtrip() {
        let dir = serving_root();
        let target = ResolvedTarget::NamedResource("readme.txt".to_string());
        let outcome = build(&target, dir.path(), ".selectors");
        assert_eq!(
            outcome,
            ResponseOutcome::Payload(b"hello from burrow\n".to_vec())
        );
    }

    #[test]
    fn test_build_named_resource_binary_exact_bytes() {
        let dir = serving_root();
        let blob: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        fs::write(dir.path().join("blob.bin"), &blob).unwrap();

        let target = ResolvedTarget::NamedResource("blob.bin".to_string());
        match build(&target, dir.path(), ".selectors") {
            ResponseOutcome::Payload(bytes) => {
                assert_eq!(bytes.len(), blob.len());
                assert_eq!(bytes, blob);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_build_named_resource_missing() {
        let dir = serving_root();
        let target = ResolvedTarget::NamedResource("missing.txt".to_string());
        let outcome = build(&target, dir.path(), ".selectors");
        assert_eq!(
            outcome,
            ResponseOutcome::Error(
                b"3'missing.txt' does not exist (no handler found)\t\terror.host\t1\r\n".to_vec()
            )
        );
    }

    #[test]
    fn test_build_malformed() {
        let dir = serving_root();
        let outcome = build(&ResolvedTarget::Malformed, dir.path(), ".selectors");
        assert_eq!(
            outcome,
            ResponseOutcome::Error(b"3Malformed request\t\terror.host\t1\r\n".to_vec())
        );
    }

    #[test]
    fn test_build_idempotent_across_calls() {
        let dir = serving_root();
        let target = ResolvedTarget::NamedResource("readme.txt".to_string());
        let first = build(&target, dir.path(), ".selectors");
        let second = build(&target, dir.path(), ".selectors");
        assert_eq!(first, second);
    }
}
