//! Scaffold command handler.

use std::{io::Write, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use gitplane::{
	config::GitConfig,
	operators::{product_operators, ClusterOperator},
};
use restree::{yaml, Kind, Layout};

#[derive(Args)]
pub struct ScaffoldArgs {
	/// Resource kind, e.g. CodeRepo or Environment
	pub kind: String,

	/// Resource name
	pub name: String,
}

/// Run the scaffold command.
pub fn run<W: Write>(args: ScaffoldArgs, mut writer: W) -> Result<()> {
	let kind: Kind = args.kind.parse()?;
	let operators =
		product_operators(&Layout::default(), &GitConfig::default().git_type).with(Arc::new(ClusterOperator));
	let operator = operators
		.get(kind)
		.with_context(|| format!("{kind} resources are not managed by gitplane"))?;
	let resource = operator.create_resource(&args.name);
	write!(writer, "{}", yaml::to_manifest(&resource)?)?;
	Ok(())
}
