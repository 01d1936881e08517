//! Controller configuration
//!
//! Every setting can be given as a flag or through the environment, so the
//! same binary runs unchanged from a Deployment manifest or a shell.

use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::crd::TlsTermination;
use crate::telemetry::LogFormat;
use crate::{Error, DEFAULT_RESYNC_INTERVAL_SECS, DEFAULT_SERVICE_MARKER, DEFAULT_UI_PORT_NAME};

/// What to do when checking for an existing Route fails while the Service exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RouteCheckFailurePolicy {
    /// Log, report success and let the next resync try again
    #[default]
    Skip,
    /// Surface the error so the key is requeued with backoff
    Requeue,
}

/// Settings shaping the Routes the controller manages.
///
/// Fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSettings {
    /// Substring a Service name must contain to be managed
    pub service_marker: String,
    /// Named Service port the Route targets
    pub ui_port_name: String,
    /// Optional TLS termination for created Routes
    pub tls_termination: Option<TlsTermination>,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            service_marker: DEFAULT_SERVICE_MARKER.to_string(),
            ui_port_name: DEFAULT_UI_PORT_NAME.to_string(),
            tls_termination: None,
        }
    }
}

impl RouteSettings {
    /// Whether a Service with this name is a driver UI endpoint
    pub fn matches(&self, name: &str) -> bool {
        name.contains(&self.service_marker)
    }
}

/// Command-line and environment configuration for the controller
#[derive(Args, Clone, Debug)]
pub struct ControllerConfig {
    /// Substring identifying driver UI Services
    #[arg(long, env = "SERVICE_MARKER", default_value = DEFAULT_SERVICE_MARKER)]
    pub service_marker: String,

    /// Named Service port exposed by created Routes
    #[arg(long, env = "UI_PORT_NAME", default_value = DEFAULT_UI_PORT_NAME)]
    pub ui_port_name: String,

    /// Only watch this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Periodic resync for managed keys, in seconds
    #[arg(long, env = "RESYNC_INTERVAL_SECS", default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    pub resync_interval_secs: u64,

    /// TLS termination for created Routes (no TLS when unset)
    #[arg(long, env = "ROUTE_TLS_TERMINATION", value_enum)]
    pub tls_termination: Option<TlsTermination>,

    /// Handling of failed Route existence checks while the Service exists
    #[arg(
        long,
        env = "ROUTE_CHECK_FAILURE",
        value_enum,
        default_value_t = RouteCheckFailurePolicy::Skip
    )]
    pub route_check_failure: RouteCheckFailurePolicy,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl ControllerConfig {
    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.service_marker.trim().is_empty() {
            // an empty marker would claim every Service in the cluster
            return Err(Error::config("service marker must not be empty"));
        }
        if self.ui_port_name.trim().is_empty() {
            return Err(Error::config("UI port name must not be empty"));
        }
        if self.resync_interval_secs == 0 {
            return Err(Error::config("resync interval must be at least 1 second"));
        }
        if let Some(ns) = &self.watch_namespace {
            if ns.trim().is_empty() {
                return Err(Error::config("watch namespace must not be blank"));
            }
        }
        Ok(())
    }

    /// Route-shaping subset of the configuration
    pub fn route_settings(&self) -> RouteSettings {
        RouteSettings {
            service_marker: self.service_marker.clone(),
            ui_port_name: self.ui_port_name.clone(),
            tls_termination: self.tls_termination,
        }
    }

    /// Periodic resync as a `Duration`
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}
