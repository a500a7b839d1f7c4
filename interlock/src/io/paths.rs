//! Canonical `.interlock/` layout and first-run scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::io::config::{InterlockConfig, write_config};

/// All canonical paths within `.interlock/` for a project root.
#[derive(Debug, Clone)]
pub struct InterlockPaths {
    pub root: PathBuf,
    pub interlock_dir: PathBuf,
    pub config_path: PathBuf,
}

impl InterlockPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let interlock_dir = root.join(".interlock");
        Self {
            root: root.clone(),
            interlock_dir: interlock_dir.clone(),
            config_path: interlock_dir.join("config.toml"),
        }
    }

    /// Resolve a configured path against the project root.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Options for [`init_interlock`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Overwrite an existing `config.toml`.
    pub force: bool,
}

/// Create `.interlock/` with a default `config.toml`.
///
/// Fails if the config already exists unless `options.force` is set.
pub fn init_interlock(root: &Path, options: &InitOptions) -> Result<InterlockPaths> {
    let paths = InterlockPaths::new(root);
    if paths.interlock_dir.exists() && !paths.interlock_dir.is_dir() {
        return Err(anyhow!(
            "interlock init: .interlock exists but is not a directory"
        ));
    }
    if paths.config_path.exists() && !options.force {
        return Err(anyhow!(
            "interlock init: {} already exists (use --force to overwrite)",
            paths.config_path.display()
        ));
    }
    fs::create_dir_all(&paths.interlock_dir)
        .with_context(|| format!("create directory {}", paths.interlock_dir.display()))?;
    write_config(&paths.config_path, &InterlockConfig::default())?;
    Ok(paths)
}
