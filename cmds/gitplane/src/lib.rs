//! gitplane: a control plane that keeps platform resources as YAML files in
//! Git repositories.
//!
//! The per-kind workflows live in [`usecase`], the cluster registration
//! engine in [`cluster`] and the commit/push protocol in [`git`].

pub mod cluster;
pub mod collab;
pub mod config;
pub mod error;
pub mod git;
pub mod k8s;
pub mod keys;
pub mod kustomize;
pub mod operators;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod usecase;

pub use error::{Error, Result};
