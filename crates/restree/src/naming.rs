//! Name conventions tying resources to their hosting platform ids.

use crate::{Error, Result};

pub const PRODUCT_PREFIX: &str = "product-";
pub const REPO_PREFIX: &str = "repo-";

/// `product-<group id>`
pub fn product_name(group_id: u64) -> String {
	format!("{PRODUCT_PREFIX}{group_id}")
}

/// `repo-<project id>`
pub fn repo_name(project_id: u64) -> String {
	format!("{REPO_PREFIX}{project_id}")
}

/// Parse the numeric id out of a `<prefix><number>` name.
pub fn extract_number(prefix: &'static str, name: &str) -> Result<u64> {
	name.strip_prefix(prefix)
		.and_then(|id| id.parse().ok())
		.ok_or_else(|| Error::InvalidName {
			name: name.to_owned(),
			prefix,
		})
}
