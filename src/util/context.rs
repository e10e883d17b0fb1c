//! Global context for Rigging operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{self, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Merged global and project configuration
    config: Config,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let config = config::load_config(
            config::global_config_path().as_deref(),
            &config::project_config_path(&cwd),
        );
        GlobalContext { cwd, config }
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Install prefix: explicit flag, then config, then `/usr/local/<package>`.
    pub fn install_prefix(&self, explicit: Option<&Path>, package: &str) -> PathBuf {
        if let Some(prefix) = explicit {
            return self.resolve_path(prefix);
        }
        match self.config.build.prefix {
            Some(ref prefix) => self.resolve_path(prefix),
            None => PathBuf::from("/usr/local").join(package),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_config_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".rigging");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[build]\njobs = 3\n").unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        assert_eq!(ctx.config().build.jobs, Some(3));
    }

    #[test]
    fn test_install_prefix_precedence() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.build.prefix = Some(PathBuf::from("install"));
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_config(config);

        assert_eq!(
            ctx.install_prefix(Some(Path::new("/opt/vtk")), "vtk"),
            PathBuf::from("/opt/vtk")
        );
        assert_eq!(ctx.install_prefix(None, "vtk"), tmp.path().join("install"));

        let bare = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_config(Config::default());
        assert_eq!(bare.install_prefix(None, "vtk"), PathBuf::from("/usr/local/vtk"));
    }
}
