use std::{
	path::{Path, PathBuf},
	sync::LazyLock,
};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, instrument};
use url::Url;

use super::{CloneParam, GitRepository};
use crate::{Error, Result};

static REPO_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.+/(.+)\.git$").unwrap());

/// Directory name `git clone` picks for `url`.
pub fn repo_dir_name(url: &str) -> Option<&str> {
	REPO_NAME
		.captures(url)
		.and_then(|c| c.get(1))
		.map(|m| m.as_str())
}

/// Runs the `git` binary. Child processes are killed when the calling future
/// is dropped, so a cancelled request does not leave git running.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

/// Combined stdout and stderr of a finished command, and whether it succeeded.
struct Output {
	success: bool,
	text: String,
}

impl GitCli {
	pub fn new() -> Self {
		Self
	}

	#[instrument(skip_all, fields(dir = %dir.display(), command = %redacted(args)))]
	async fn run(&self, dir: &Path, args: &[&str]) -> Result<Output> {
		let output = Command::new("git")
			.args(args)
			.current_dir(dir)
			.kill_on_drop(true)
			.output()
			.await
			.map_err(Error::io(dir))?;
		let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
		text.push_str(&String::from_utf8_lossy(&output.stderr));
		debug!(status = %output.status, "git finished");
		Ok(Output {
			success: output.status.success(),
			text,
		})
	}

	async fn unmerged_paths(&self, path: &Path) -> Vec<String> {
		match self.run(path, &["diff", "--name-only", "--diff-filter=U"]).await {
			Ok(out) if out.success => out.text.lines().map(str::to_owned).collect(),
			_ => Vec::new(),
		}
	}
}

/// `args` joined for logging, with url passwords masked.
fn redacted(args: &[&str]) -> String {
	args.iter()
		.map(|arg| match Url::parse(arg) {
			Ok(mut url) if url.password().is_some() => {
				let _ = url.set_password(Some("***"));
				url.to_string()
			}
			_ => (*arg).to_owned(),
		})
		.collect::<Vec<_>>()
		.join(" ")
}

fn authenticated_url(param: &CloneParam) -> Result<Url> {
	let invalid = |message: String| Error::Clone {
		url: param.url.clone(),
		message,
	};
	let mut url = Url::parse(&param.url).map_err(|e| invalid(e.to_string()))?;
	url.set_username(&param.user)
		.and_then(|()| url.set_password(Some(&param.token)))
		.map_err(|()| invalid("the url cannot carry credentials".to_owned()))?;
	Ok(url)
}

#[async_trait]
impl GitRepository for GitCli {
	#[instrument(skip_all, fields(url = %param.url))]
	async fn clone_repo(&self, parent: &Path, param: &CloneParam) -> Result<PathBuf> {
		let name = repo_dir_name(&param.url).ok_or_else(|| Error::Clone {
			url: param.url.clone(),
			message: "cannot derive the repository name".to_owned(),
		})?;
		let url = authenticated_url(param)?;
		let out = self.run(parent, &["clone", "--verbose", url.as_str()]).await?;
		if !out.success {
			return Err(Error::Clone {
				url: param.url.clone(),
				message: out.text.replace(&param.token, "***"),
			});
		}

		let path = parent.join(name);
		for (key, value) in [("user.name", &param.user), ("user.email", &param.email)] {
			let out = self.run(&path, &["config", key, value]).await?;
			if !out.success {
				return Err(Error::Clone {
					url: param.url.clone(),
					message: out.text,
				});
			}
		}
		Ok(path)
	}

	async fn fetch(&self, path: &Path, remote: Option<&str>) -> Result<()> {
		let mut args = vec!["fetch"];
		args.extend(remote);
		let out = self.run(path, &args).await?;
		if !out.success {
			return Err(Error::Fetch {
				path: path.to_owned(),
				message: out.text,
			});
		}
		Ok(())
	}

	async fn diff(&self, path: &Path, from: &str, to: &str) -> Result<String> {
		let out = self.run(path, &["diff", from, to]).await?;
		if !out.success {
			return Err(Error::Diff {
				path: path.to_owned(),
				message: out.text,
			});
		}
		Ok(out.text)
	}

	async fn is_dirty(&self, path: &Path) -> Result<bool> {
		let out = self.run(path, &["status", "--porcelain"]).await?;
		if !out.success {
			return Err(Error::Diff {
				path: path.to_owned(),
				message: out.text,
			});
		}
		Ok(!out.text.trim().is_empty())
	}

	async fn commit(&self, path: &Path, message: &str) -> Result<()> {
		for args in [&["add", "."][..], &["commit", "-m", message][..]] {
			let out = self.run(path, args).await?;
			if !out.success {
				return Err(Error::Commit {
					path: path.to_owned(),
					message: out.text,
				});
			}
		}
		Ok(())
	}

	async fn merge(&self, path: &Path) -> Result<()> {
		let out = self.run(path, &["merge"]).await?;
		if !out.success {
			return Err(Error::Merge {
				message: out.text,
				conflicts: self.unmerged_paths(path).await,
			});
		}
		Ok(())
	}

	async fn push(&self, path: &Path) -> Result<()> {
		let out = self.run(path, &["push"]).await?;
		if !out.success {
			return Err(Error::Push {
				path: path.to_owned(),
				message: out.text,
			});
		}
		Ok(())
	}
}
