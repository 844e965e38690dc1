//! Selector resolution.
//!
//! Maps a framed request line to the action the server should take: serve
//! the root listing, serve a named resource, or report a malformed request.

use crate::protocol::framer::RequestLine;

/// What a request line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Serve the server-configured listing resource.
    RootListing,
    /// Serve the resource named by the selector, relative to the serving root.
    NamedResource(String),
    /// No terminator found within the length bound.
    Malformed,
}

/// Resolve a request line to a target.
///
/// An empty line, or a line whose first byte is LF, CR, or TAB, is the root
/// selector. The first-byte check runs before the terminator check, so an
/// unterminated line starting with TAB still resolves to the root listing.
/// No escaping or canonicalization is applied to the selector; path
/// interpretation is left to the filesystem.
pub fn resolve(line: &RequestLine) -> ResolvedTarget {
    match line.bytes.first() {
        None | Some(b'\n') | Some(b'\r') | Some(b'\t') => return ResolvedTarget::RootListing,
        Some(_) => {}
    }

    // Defensive re-trim at the first CR/LF in case one slipped into the
    // framed bytes.
    let end = line
        .bytes
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(line.bytes.len());

    if end == line.bytes.len() && !line.terminated {
        return ResolvedTarget::Malformed;
    }

    let selector = String::from_utf8_lossy(&line.bytes[..end]).into_owned();
    ResolvedTarget::NamedResource(selector)
}
