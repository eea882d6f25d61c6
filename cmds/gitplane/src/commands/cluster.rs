//! Cluster command handlers.

use std::{
	fs,
	io::Write,
	path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use gitplane::cluster::{ClusterRegistration, ClusterRegistrationParam, Traefik, VclusterParam};
use restree::Resource;

#[derive(Args)]
pub struct ClusterArgs {
	#[command(subcommand)]
	pub command: ClusterCommands,
}

#[derive(Subcommand)]
pub enum ClusterCommands {
	/// Render a cluster registration into a local tenant checkout
	Render(RenderArgs),
}

#[derive(Args)]
pub struct RenderArgs {
	/// Path to the cluster template checkout
	#[arg(long)]
	pub template: PathBuf,

	/// Path to the tenant configuration checkout
	#[arg(long)]
	pub tenant: PathBuf,

	/// Cluster resource file
	#[arg(long)]
	pub cluster: PathBuf,

	/// Clone URL of the tenant repository, rendered into the templates
	#[arg(long, default_value = "")]
	pub repo_url: String,

	/// Host name of the runtime's argocd, derived from the API server when unset
	#[arg(long)]
	pub argocd_host: Option<String>,

	#[arg(long)]
	pub traefik_http_node_port: Option<String>,

	#[arg(long)]
	pub traefik_https_node_port: Option<String>,

	/// Node port of a virtual cluster, the API server port when unset
	#[arg(long)]
	pub vcluster_https_node_port: Option<String>,

	/// Remove the cluster instead of saving it
	#[arg(long)]
	pub remove: bool,
}

/// Run a cluster subcommand.
pub async fn run<W: Write>(args: ClusterArgs, config: Option<&Path>, writer: W) -> Result<()> {
	match args.command {
		ClusterCommands::Render(args) => render(args, config, writer).await,
	}
}

async fn render<W: Write>(args: RenderArgs, config: Option<&Path>, mut writer: W) -> Result<()> {
	let config = super::load_config(config, &args.tenant)?;
	let text = fs::read_to_string(&args.cluster)
		.with_context(|| format!("reading {}", args.cluster.display()))?;
	let Some(Resource::Cluster(cluster)) = Resource::from_yaml(&text)
		.with_context(|| format!("parsing {}", args.cluster.display()))?
	else {
		bail!("{} does not hold a Cluster resource", args.cluster.display());
	};

	let traefik = match (args.traefik_http_node_port, args.traefik_https_node_port) {
		(None, None) => None,
		(http, https) => Some(Traefik {
			http_node_port: http.unwrap_or_default(),
			https_node_port: https.unwrap_or_default(),
		}),
	};
	let vcluster = args
		.vcluster_https_node_port
		.map(|https_node_port| VclusterParam { https_node_port });

	let registration = ClusterRegistration::initialize(
		ClusterRegistrationParam::builder()
			.cluster(cluster)
			.template_repo(args.template)
			.tenant_repo(args.tenant)
			.repo_url(args.repo_url)
			.maybe_argocd_host(args.argocd_host)
			.maybe_traefik(traefik)
			.maybe_vcluster(vcluster)
			.nautes(config.nautes)
			.git(config.git)
			.build(),
	)?;
	if args.remove {
		registration.remove()?;
		writeln!(writer, "removed cluster {}", registration.name())?;
	} else {
		registration.save().await?;
		writeln!(writer, "saved cluster {}", registration.name())?;
	}
	Ok(())
}
