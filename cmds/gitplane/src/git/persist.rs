use std::{path::Path, sync::Arc, time::Duration};

use tracing::{debug, info, instrument, warn};

use super::GitRepository;
use crate::{config::Config, Error, Result};

const FAST_FORWARD_MESSAGE: &str = "api: saved configuration file";
const MERGE_MESSAGE: &str = "api: saved configuration";

/// Commits a checkout and pushes it upstream, merging concurrent remote
/// changes and retrying rejected pushes a bounded number of times.
#[derive(Clone)]
pub struct ConfigPersister {
	git: Arc<dyn GitRepository>,
	remote: String,
	branch: String,
	max_attempts: u32,
	backoff: Duration,
}

impl std::fmt::Debug for ConfigPersister {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConfigPersister")
			.field("remote", &self.remote)
			.field("branch", &self.branch)
			.field("max_attempts", &self.max_attempts)
			.field("backoff", &self.backoff)
			.finish_non_exhaustive()
	}
}

impl ConfigPersister {
	pub fn new(git: Arc<dyn GitRepository>, config: &Config) -> Self {
		Self {
			git,
			remote: config.git.remote.clone(),
			branch: config.git.default_branch.clone(),
			max_attempts: config.persistence.max_attempts.max(1),
			backoff: config.persistence.retry_backoff(),
		}
	}

	/// Persist the checkout at `path`.
	///
	/// Each attempt fetches the remote and diffs the local branch against it.
	/// Without divergence local changes are committed and pushed directly.
	/// Otherwise they are committed on top of a merge of the remote; a merge
	/// failure is final, a rejected push starts the next attempt.
	#[instrument(skip_all, fields(path = %path.display()))]
	pub async fn save_config(&self, path: &Path) -> Result<()> {
		let tracking = format!("remotes/{}/{}", self.remote, self.branch);
		for attempt in 1..=self.max_attempts {
			self.git.fetch(path, Some(&self.remote)).await?;
			let diff = self.git.diff(path, &self.branch, &tracking).await?;
			if diff.is_empty() {
				if self.git.is_dirty(path).await? {
					self.git.commit(path, FAST_FORWARD_MESSAGE).await?;
					self.git.push(path).await?;
					info!("pushed configuration");
				} else {
					debug!("nothing to persist");
				}
				return Ok(());
			}

			self.git.fetch(path, None).await?;
			if self.git.is_dirty(path).await? {
				self.git.commit(path, MERGE_MESSAGE).await?;
			}
			self.git.merge(path).await?;
			match self.git.push(path).await {
				Ok(()) => {
					info!(attempt, "pushed merged configuration");
					return Ok(());
				}
				Err(err) => {
					warn!(attempt, max_attempts = self.max_attempts, error = %err, "push rejected");
					if attempt < self.max_attempts {
						tokio::time::sleep(self.backoff).await;
					}
				}
			}
		}
		Err(Error::ConflictExceeded {
			attempts: self.max_attempts,
		})
	}
}
