//! Validate command handler.

use std::{
	io::Write,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args;
use gitplane::{
	k8s::{KubeLookup, OfflineLookup},
	operators::product_operators,
};
use restree::{naming, CompareOptions, ReferenceLookup, Validator};
use tracing::info;

#[derive(Args)]
pub struct ValidateArgs {
	/// Path to the product configuration checkout
	pub path: PathBuf,

	/// Numeric id of the product group
	#[arg(long)]
	pub product: u64,

	/// Check external references against the Kubernetes cluster of the
	/// current kubeconfig
	#[arg(long)]
	pub kube: bool,
}

/// Run the validate command.
pub async fn run<W: Write>(args: ValidateArgs, config: Option<&Path>, mut writer: W) -> Result<()> {
	let config = super::load_config(config, &args.path)?;
	let layout = config.layout();
	let validator = Validator::new(layout.clone(), product_operators(&layout, &config.git.git_type));

	let nodes = restree::load(&args.path, &config.load.file_options())
		.with_context(|| format!("loading {}", args.path.display()))?;
	let lookup: Box<dyn ReferenceLookup> = if args.kube {
		Box::new(
			KubeLookup::connect(config.nautes.namespace.clone())
				.await
				.context("connecting to Kubernetes")?,
		)
	} else {
		Box::new(OfflineLookup)
	};

	let product_name = naming::product_name(args.product);
	let options = CompareOptions {
		nodes: &nodes,
		product_name: &product_name,
		local_project_path: &args.path,
	};
	validator.compare(&options, lookup.as_ref()).await?;

	let resources = nodes.files().filter(|node| node.kind.is_some()).count();
	info!(resources, "validation passed");
	writeln!(writer, "{resources} resources are valid")?;
	Ok(())
}
