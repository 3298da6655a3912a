//! Forwards [slog](https://slog-rs.github.io/slog/slog/) records to [Google Cloud Logging](https://cloud.google.com/logging)
//! when running on GKE, tagging every entry with the cluster, namespace and component it
//! comes from.
//!
//! # Usage
//!
//! Wrap your drain in a [`HookedDrain`](hook::HookedDrain) and call [`init`] once at
//! startup. When the process is not on Google Compute Engine nothing happens and records
//! keep flowing to your drain. On GKE the bootstrap
//!
//! 1. asks the metadata server for the project id and the node's instance name,
//! 2. reads `POD_NAMESPACE` and `POD_NAME`, which must be set through the
//!    [downward API](https://kubernetes.io/docs/concepts/workloads/pods/downward-api/),
//! 3. derives the cluster from the node name (`gke-<cluster>-<pool>-pool-<id>`) and the
//!    component from the pod name (`<component>-<replicaset>-<pod>`),
//! 4. registers a [`CloudLoggingHook`](forward::CloudLoggingHook) and stops writing to
//!    your drain, so entries are not logged twice.
//!
//! Any failure along the way is returned as an [`Error`] and means the deployment is
//! misconfigured; callers are expected to exit.
//!
//! ```no_run
//! use slog::{o, Drain};
//! use slog_gke::hook::{HookedDrain, Hooks};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let hooks = Arc::new(Hooks::new());
//! let decorator = slog_term::TermDecorator::new().build();
//! let term = slog_term::CompactFormat::new(decorator).build().fuse();
//! let drain = HookedDrain::new(term, hooks.clone()).fuse();
//! let log = slog::Logger::root(std::sync::Mutex::new(drain).fuse(), o!());
//!
//! match slog_gke::init(&hooks).await {
//!     Ok(Some(activation)) => {
//!         if let Some(shipper) = activation.take_shipper() {
//!             tokio::spawn(shipper.run_log_shipper());
//!         }
//!     }
//!     Ok(None) => {}
//!     Err(e) => {
//!         eprintln!("{e}");
//!         std::process::exit(1);
//!     }
//! }
//! slog::info!(log, "ready");
//! # }
//! ```

/// Error types
pub mod error;

/// One-time environment discovery and hook registration
pub mod bootstrap;

/// The hook that writes entries to Google Cloud Logging
pub mod forward;

/// Hooks and the [`slog::Drain`] that fires them
pub mod hook;

/// Cluster and component derivation
pub mod identity;

/// Writing entries to a Google Cloud Logging log
pub mod logger;

/// Metadata server access
pub mod metadata;

/// Host levels and Cloud Logging severities
pub mod severity;

/// The async process shipping entries to the Google Logging API
pub mod shipper;

pub use bootstrap::{init, Activation, Bootstrap};
pub use error::Error;
pub use identity::Identity;
pub use severity::{Level, Severity};
