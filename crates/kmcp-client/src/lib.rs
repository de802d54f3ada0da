//! kmcp-client: access to the Karmada control plane
//!
//! - [`ClusterClient`] / [`WorkloadClient`]: the capabilities tools use
//! - [`KarmadaClient`]: REST implementation over reqwest
//! - [`ClientProviders`]: per-request factories handed to the tool catalog

pub mod api;
pub mod client;
pub mod error;
pub mod kind;
pub mod kubeconfig;
pub mod provider;

pub use api::{ClusterClient, ObjectMeta, WorkloadClient, SKIP_AUTO_PROPAGATION_LABEL};
pub use client::KarmadaClient;
pub use error::{ClientError, Result};
pub use kind::ResourceKind;
pub use kubeconfig::{Auth, ClientConfig, ClientSettings};
pub use provider::{ClientProviders, GetClusterClientFn, GetWorkloadClientFn};
