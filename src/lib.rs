//! spark-ui-router - exposes Spark driver UI Services through OpenShift Routes
//!
//! The controller watches core `Service` objects. Every Service whose name carries
//! the driver marker (`driver-svc` by default) gets exactly one `Route` with the
//! same name and namespace, owned by the Service. When the Service goes away the
//! Route is removed, either by the cluster garbage collector following the owner
//! reference or by the reconciler's own ensure-absent path, whichever runs first.
//!
//! # Architecture
//!
//! Reconciliation is level-triggered and keyed by `(namespace, name)`:
//! - the dispatcher (kube-runtime controllers in [`runner`]) decides *when* to run
//! - [`controller::reconcile_key`] re-reads the Service and Route and issues at
//!   most one create or delete
//! - [`compiler::compile_route`] is the pure factory for the desired Route
//!
//! # Modules
//!
//! - [`backoff`] - Per-key requeue backoff used by the error policy
//! - [`compiler`] - Desired Route construction
//! - [`config`] - Command-line / environment configuration
//! - [`controller`] - Reconciler and the resource-store seam
//! - [`crd`] - OpenShift Route types
//! - [`error`] - Error types and retry classification
//! - [`key`] - Namespaced object identity
//! - [`runner`] - Controller wiring for the binary
//! - [`telemetry`] - Structured logging setup

#![deny(missing_docs)]

pub mod backoff;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod key;
pub mod runner;
pub mod telemetry;

pub use error::Error;
pub use key::ObjectKey;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Substring identifying a Spark driver UI Service (`<app>-<id>-driver-svc`)
pub const DEFAULT_SERVICE_MARKER: &str = "driver-svc";

/// Logical port name the Route targets on the driver Service
pub const DEFAULT_UI_PORT_NAME: &str = "spark-ui";

/// Default periodic resync for keys the controller manages
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Field manager recorded on objects this controller writes
pub const FIELD_MANAGER: &str = "spark-ui-router";
