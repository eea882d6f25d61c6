//! Kustomize command handler.

use std::{
	io::Write,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args;
use gitplane::kustomize::{save_deploy_config, KUSTOMIZATION_FILE};

#[derive(Args)]
pub struct KustomizeArgs {
	/// Path to the product configuration checkout
	pub path: PathBuf,
}

/// Run the kustomize command.
pub fn run<W: Write>(args: KustomizeArgs, config: Option<&Path>, mut writer: W) -> Result<()> {
	let config = super::load_config(config, &args.path)?;
	let nodes = restree::load(&args.path, &config.load.file_options())
		.with_context(|| format!("loading {}", args.path.display()))?;
	save_deploy_config(&nodes, config.default_project())?;

	let written = args.path.join(config.default_project()).join(KUSTOMIZATION_FILE);
	writeln!(writer, "{}", written.display())?;
	Ok(())
}
