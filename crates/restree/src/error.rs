use std::{io, path::PathBuf};

use thiserror::Error;

use crate::Kind;

#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to access {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to decode resource file {}: {source}", path.display())]
	Decode {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},
	#[error("failed to encode resource {name}: {source}")]
	Encode {
		name: String,
		#[source]
		source: serde_yaml::Error,
	},
	#[error("unknown resource kind `{0}`")]
	UnknownKind(String),

	#[error("the node {} is not found", .0.display())]
	NodeNotFound(PathBuf),
	#[error("{} is not under the tree root {}", path.display(), root.display())]
	NotUnderRoot { path: PathBuf, root: PathBuf },
	#[error("{} is not a directory", .0.display())]
	NotADirectory(PathBuf),
	#[error("node {} has depth {actual}, but its parent chain places it at depth {expected}", path.display())]
	LevelMismatch {
		path: PathBuf,
		expected: usize,
		actual: usize,
	},

	#[error("the product name of resource {name} does not match the current product name, expected {expected}, but now is {actual}")]
	ReferenceMismatch {
		kind: Kind,
		name: String,
		expected: String,
		actual: String,
	},
	#[error("During global validation, it was found that {kind} '{name}' does not exist or is unavailable. Please check {referrer_kind} '{referrer}' in directory '{location}'.")]
	DanglingReference {
		kind: Kind,
		name: String,
		referrer_kind: Kind,
		referrer: String,
		location: String,
	},
	#[error("duplicate reference found between {kind} resource {first} and resource {second}")]
	DuplicateReference {
		kind: Kind,
		first: String,
		second: String,
	},
	#[error("{0}")]
	PolicyViolation(String),
	#[error("the number of {kind} resources exceeds the limit, expected at most {max} but found {count}")]
	Cardinality { kind: Kind, max: usize, count: usize },
	#[error("directory '{category}' for {kind} resources is missing")]
	MissingDirectory { kind: Kind, category: String },
	#[error("{kind} '{name}' must live under '{category}' at depth {level}, found {}", path.display())]
	Placement {
		kind: Kind,
		name: String,
		path: PathBuf,
		category: String,
		level: usize,
	},
	#[error("resource {name} is invalid: {reason}")]
	InvalidResource { name: String, reason: String },
	#[error("expected a {expected} resource, got {actual}")]
	KindMismatch { expected: Kind, actual: Kind },
	#[error("no operator is registered for kind {0}")]
	NoOperator(Kind),
	#[error("no layout rule places {0} resources")]
	NoLayoutRule(Kind),
	#[error("failed to look up {kind} '{name}': {message}")]
	Lookup {
		kind: Kind,
		name: String,
		message: String,
	},
	#[error("invalid name `{name}`, expected `{prefix}<number>`")]
	InvalidName { name: String, prefix: &'static str },
}

impl Error {
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NodeNotFound(_))
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
