//! Resource tree engine for git-backed platform configuration.
//!
//! A product repository stores one YAML file per resource. [`load()`] mirrors
//! a checkout into a [`Node`] tree, [`Validator::compare`] runs the global
//! consistency pass over it and [`yaml::write_node`] puts a node back on disk.
//! Kind-specific behaviour is supplied by [`NodesOperator`] implementations
//! registered in an [`OperatorSet`].

mod error;
pub mod layout;
mod load;
pub mod naming;
mod node;
pub mod operator;
pub mod resource;
mod validate;
pub mod yaml;

pub use error::{Error, Result};
pub use layout::{Layout, LayoutRule};
pub use load::{load, ContentType, FileOptions};
pub use node::{Content, Node, PreOrder};
pub use operator::{CompareOptions, NodesOperator, OperatorSet, ReferenceLookup};
pub use resource::{Kind, Resource};
pub use validate::Validator;
