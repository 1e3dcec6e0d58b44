//! Path clamping utilities.
//!
//! Keeps joined paths lexically under a workspace root. This is a safety clamp
//! against `..` prefixes, not full sanitization: symlinks are not resolved and
//! nothing touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize `sub` and join it onto `root`.
///
/// - `.` components and repeated separators are dropped.
/// - `a/../b` collapses to `b`.
/// - Absolute arguments are treated as relative to `root`.
/// - If the normalized path still begins with `..` (it would escape `root`),
///   the whole argument is discarded and `root` is returned unchanged.
pub fn clamp_join(root: &Path, sub: &str) -> PathBuf {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(sub).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return root.to_path_buf();
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    let mut joined = root.to_path_buf();
    joined.extend(parts);
    joined
}
