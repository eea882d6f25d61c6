//! Cluster registration: rendering a cluster template repository into a
//! tenant configuration repository.
//!
//! A [`ClusterRegistration`] is derived from a [`ClusterRegistrationParam`]
//! and the tenant checkout, then saved or removed. Which template files take
//! part is decided by the template repository's own [`ignore`] rules, per
//! [`ClusterRole`].

pub mod endpoint;
mod fleet;
pub mod ignore;
mod lifecycle;
mod param;
mod paths;
mod registration;
pub mod template;

pub use fleet::Fleet;
pub use param::{ClusterRegistrationParam, Traefik, VclusterParam};
pub use paths::TenantRepo;
pub use registration::{Argocd, ClusterRegistration, ClusterRole, HostCluster, Runtime, Vcluster};
