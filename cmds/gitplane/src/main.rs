use std::{io, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

#[derive(Parser)]
#[command(name = "gitplane")]
#[command(about = "Offline tools for git-backed platform configuration", long_about = None)]
#[command(version = env!("GITPLANE_VERSION"))]
struct Cli {
	/// Log level (possible values: error, warn, info, debug, trace)
	#[arg(long, global = true)]
	log_level: Option<Level>,

	/// Configuration file, `.gitplane.yaml` above the target directory when unset
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Load a product repository and run the global validation
	Validate(commands::validate::ValidateArgs),

	/// Regenerate the kustomization of a product repository
	Kustomize(commands::kustomize::KustomizeArgs),

	/// Work with cluster registrations
	Cluster(commands::cluster::ClusterArgs),

	/// Print an empty resource of the given kind
	Scaffold(commands::scaffold::ScaffoldArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	gitplane::telemetry::init(cli.log_level)?;

	let config = cli.config.as_deref();
	let stdout = io::stdout().lock();
	match cli.command {
		Commands::Validate(args) => commands::validate::run(args, config, stdout).await,
		Commands::Kustomize(args) => commands::kustomize::run(args, config, stdout),
		Commands::Cluster(args) => commands::cluster::run(args, config, stdout).await,
		Commands::Scaffold(args) => commands::scaffold::run(args, stdout),
	}
}
