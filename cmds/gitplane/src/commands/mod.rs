pub mod cluster;
pub mod kustomize;
pub mod scaffold;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use gitplane::config::Config;

/// `--config` when given, otherwise the nearest `.gitplane.yaml` above `dir`.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<Config> {
	match explicit {
		Some(path) => Config::load_from_file(path),
		None => Config::load_from_directory(dir)
			.with_context(|| format!("loading configuration for {}", dir.display())),
	}
}
