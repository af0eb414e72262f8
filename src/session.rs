use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Container formats the pipeline accepts as input.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

/// Case-insensitive check against [`ALLOWED_EXTENSIONS`].
pub fn extension_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Scratch directory for one processing job, with a unique name so concurrent
/// jobs never collide. Removed on drop unless [`SessionDir::persist`] was
/// called.
pub struct SessionDir {
    root: PathBuf,
    keep: bool,
}

impl SessionDir {
    pub fn create(base: &Path) -> std::io::Result<Self> {
        let root = base.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&root)?;
        debug!(dir = %root.display(), "created session directory");
        Ok(Self { root, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Where to stage the uploaded input, keeping its extension.
    pub fn input_path(&self, extension: &str) -> PathBuf {
        self.root.join(format!("input.{extension}"))
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join("output.mp4")
    }

    pub fn landmarks_path(&self) -> PathBuf {
        self.root.join("landmarks.json")
    }

    /// Keeps the directory past drop and hands back its path.
    pub fn persist(mut self) -> PathBuf {
        self.keep = true;
        self.root.clone()
    }
}

impl Drop for SessionDir {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.root.display(), error = %e, "could not remove session directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_whitelist_is_case_insensitive() {
        assert!(extension_allowed(Path::new("clip.mp4")));
        assert!(extension_allowed(Path::new("clip.MOV")));
        assert!(extension_allowed(Path::new("dir.v2/clip.webm")));
        assert!(!extension_allowed(Path::new("clip.gif")));
        assert!(!extension_allowed(Path::new("clip")));
    }

    #[test]
    fn session_dir_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let root = {
            let session = SessionDir::create(base.path()).unwrap();
            fs::write(session.input_path("mp4"), b"stub").unwrap();
            session.path().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn persisted_session_dir_survives_drop() {
        let base = tempfile::tempdir().unwrap();
        let session = SessionDir::create(base.path()).unwrap();
        let root = session.persist();
        assert!(root.exists());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn concurrent_sessions_get_distinct_directories() {
        let base = tempfile::tempdir().unwrap();
        let a = SessionDir::create(base.path()).unwrap();
        let b = SessionDir::create(base.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
