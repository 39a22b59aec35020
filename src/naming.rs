//! Percent-encoding of server names used as path segments.
//!
//! Registry names are namespaced identifiers like `io.github.acme/tools`,
//! so the `/` (and any other URI-reserved character) must be escaped before
//! a name can become a single directory component of the output tree. The
//! escape set matches what JavaScript's `encodeURIComponent` produces —
//! alphanumerics and `- _ . ! ~ * ' ( )` pass through, everything else is
//! `%XX`-escaped — because published registries already use those paths and
//! clients construct them the same way.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Everything except alphanumerics and the `encodeURIComponent` survivors.
const SEGMENT_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encode a server name into a single path segment.
///
/// `io.github.acme/tools` → `io.github.acme%2Ftools`
pub fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, SEGMENT_ESCAPES).to_string()
}

/// Decode a path segment back into a server name.
///
/// Returns `None` if the escapes do not decode to valid UTF-8.
pub fn decode_segment(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|cow| cow.into_owned())
}
