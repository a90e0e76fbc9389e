//! File name matching for backend route modules.
//!
//! # Design Decisions
//! - Equivalent to the glob `**/*.backend.*` with dotfiles excluded
//! - No regex; a name check per directory entry
//! - Directories that never hold route modules are pruned during the walk

use std::ffi::OsStr;
use std::path::Path;

/// Directory names never descended into.
const PRUNED_DIRS: &[&str] = &["node_modules", "target"];

/// Returns true if `file_name` matches `*.backend.*`.
pub fn is_backend_module(file_name: &str) -> bool {
    !file_name.starts_with('.') && file_name.contains(".backend.")
}

/// Returns true if the walk should descend into the directory `name`.
pub fn is_searchable_dir(name: &OsStr) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    !name.starts_with('.') && !PRUNED_DIRS.contains(&name)
}

/// Route modules Flight can mount: TOML manifests.
pub fn is_manifest(path: &Path) -> bool {
    path.extension().and_then(OsStr::to_str) == Some("toml")
}
