use anyhow::{Context, Result};
use std::path::PathBuf;

/// Resolves fixture, mapping, and session paths under a single data root.
/// The root defaults to the directory holding the executable, so the tool
/// finds its fixture tree no matter where it is invoked from; CSV arguments
/// stay relative to the caller's working directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self> {
        let root = match data_dir {
            Some(dir) => dir,
            None => std::env::current_exe()
                .context("Failed to locate executable")?
                .parent()
                .context("Executable has no parent directory")?
                .to_path_buf(),
        };
        Ok(Self { root })
    }

    pub fn pooled_dir(&self) -> PathBuf {
        self.root.join("fixtures").join("pooled")
    }

    pub fn user_dir(&self, username: &str) -> PathBuf {
        self.root.join("fixtures").join("users").join(username)
    }

    pub fn shared_mappings(&self) -> PathBuf {
        self.root.join("migrations").join("shared_mappings.yaml")
    }

    pub fn user_mappings(&self, username: &str) -> PathBuf {
        self.root
            .join("migrations")
            .join(username)
            .join("user_mappings.yaml")
    }

    pub fn sessions_dir(&self, username: &str) -> PathBuf {
        self.root.join("sessions").join(username)
    }

    pub fn default_db(&self) -> PathBuf {
        self.root.join("rinkadmin.sqlite3")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_paths_under_explicit_root() {
        let paths = DataPaths::resolve(Some(PathBuf::from("/data"))).unwrap();
        assert_eq!(paths.user_dir("sparkles"), Path::new("/data/fixtures/users/sparkles"));
        assert_eq!(
            paths.user_mappings("sparkles"),
            Path::new("/data/migrations/sparkles/user_mappings.yaml")
        );
        assert_eq!(paths.sessions_dir("sparkles"), Path::new("/data/sessions/sparkles"));
    }
}
