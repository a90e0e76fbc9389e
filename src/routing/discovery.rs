//! Route module discovery.
//!
//! # Responsibilities
//! - Walk the app home for `**/*.backend.*`
//! - Parse TOML manifests, keep those with a default export
//! - Log every file found and every file skipped

use std::fs;
use std::path::{Path, PathBuf};

use crate::routing::manifest::{BackendManifest, BackendModule};
use crate::routing::matcher::{is_backend_module, is_manifest, is_searchable_dir};

/// A manifest with a default export, ready to mount.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub source: PathBuf,
    pub module: BackendModule,
}

/// All files under `root` matching `**/*.backend.*`, sorted.
pub fn find_backend_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = ?dir, error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let name = entry.file_name();
            if file_type.is_dir() {
                if is_searchable_dir(&name) {
                    pending.push(entry.path());
                }
            } else if file_type.is_file() && name.to_str().is_some_and(is_backend_module) {
                found.push(entry.path());
            }
        }
    }

    found.sort();
    found
}

/// Discover and parse route modules under `root`.
pub fn load_modules(root: &Path) -> Vec<LoadedModule> {
    let mut modules = Vec::new();

    for path in find_backend_files(root) {
        tracing::info!(file = %path.display(), "Found backend file");

        if !is_manifest(&path) {
            tracing::warn!(file = %path.display(), "Unsupported route module type, skipped");
            continue;
        }

        match read_manifest(&path) {
            Ok(BackendManifest { default: Some(module) }) => {
                modules.push(LoadedModule { source: path, module });
            }
            Ok(BackendManifest { default: None }) => {
                tracing::debug!(file = %path.display(), "No default export, not mounted");
            }
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "Invalid route module, skipped");
            }
        }
    }

    modules
}

fn read_manifest(path: &Path) -> Result<BackendManifest, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_find_backend_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/components/todos/todos.backend.toml", "");
        write(root, "app/components/users.backend.ts", "");
        write(root, "app/components/todos/Todo.vue", "");
        write(root, "node_modules/pkg/x.backend.toml", "");
        write(root, ".cache/y.backend.toml", "");
        write(root, "root.backend.toml", "");

        let found: Vec<_> = find_backend_files(root)
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            found,
            vec![
                PathBuf::from("app/components/todos/todos.backend.toml"),
                PathBuf::from("app/components/users.backend.ts"),
                PathBuf::from("root.backend.toml"),
            ]
        );
    }

    #[test]
    fn test_only_default_exports_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "a.backend.toml",
            r#"
            [default]
            prefix = "/a"
            [[default.routes]]
            path = "/"
            respond = { body = "a" }
            "#,
        );
        write(root, "b.backend.toml", "[other]\nx = 1\n");
        write(root, "c.backend.toml", "this is = not toml [");
        write(root, "d.backend.js", "export default {}");

        let modules = load_modules(root);
        assert_eq!(modules.len(), 1);
        assert!(modules[0].source.ends_with("a.backend.toml"));
        assert_eq!(modules[0].module.prefix, "/a");
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        assert!(load_modules(Path::new("/no/such/flight/home")).is_empty());
    }
}
