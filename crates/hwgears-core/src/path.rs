//! Hierarchical path name mangling for generated HDL identifiers.
//!
//! A gear's dotted hierarchy path (`top.adder.carry`) is turned into a
//! flat identifier by replacing `.`/`/` with `_`. Long paths are
//! compressed in the middle with an 8-hex-digit SHA1 prefix of the full
//! path so generated names stay within typical HDL identifier length
//! limits while remaining stable and collision-resistant across runs.

use sha1::{Digest, Sha1};

const MAX_LEN: usize = 100;
const HEAD_KEEP: usize = 40;
const TAIL_KEEP: usize = 40;

/// Converts a hierarchy path into a flat HDL-safe identifier.
///
/// Paths no longer than [`MAX_LEN`] characters are mangled in full
/// (`/` and `.` become `_`). Longer paths keep their first and last
/// segments of [`HEAD_KEEP`]/[`TAIL_KEEP`] characters and splice an
/// 8-hex-digit SHA1 digest of the *entire original path* between them, so
/// two different long paths that happen to share a prefix/suffix still
/// produce distinct names.
pub fn path_name(path: &str) -> String {
    let mangled: String = path
        .chars()
        .map(|c| if c == '/' || c == '.' { '_' } else { c })
        .collect();
    if mangled.len() <= MAX_LEN {
        return mangled;
    }
    let digest = sha1_hex8(&mangled);
    let head = &mangled[..HEAD_KEEP];
    let tail = &mangled[mangled.len() - TAIL_KEEP..];
    format!("{head}_{digest}_{tail}")
}

fn sha1_hex8(s: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
