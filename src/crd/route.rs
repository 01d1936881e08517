//! OpenShift Route (`route.openshift.io/v1`)
//!
//! The Route CRD belongs to the OpenShift router, not to this controller, so
//! the schema is never generated or installed from here. Only the fields the
//! controller writes or may want to read back are modelled.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// TLS termination mode for a Route
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TlsTermination {
    /// TLS ends at the router, plain HTTP to the Service
    Edge,
    /// Encrypted traffic is passed straight to the Service
    Passthrough,
    /// Router terminates and re-encrypts towards the Service
    Reencrypt,
}

/// Route specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "route.openshift.io",
    version = "v1",
    kind = "Route",
    plural = "routes",
    namespaced,
    status = "RouteStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Public hostname; the router assigns one when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path prefix the Route matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Backend the Route points at
    pub to: RouteTargetReference,

    /// Port on the backend Service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,

    /// TLS configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,

    /// Wildcard host policy (`None` or `Subdomain`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard_policy: Option<String>,
}

/// Reference from a Route to its backend
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    /// Backend kind, always `Service` for routes written by this controller
    pub kind: String,
    /// Backend name
    pub name: String,
    /// Relative weight when the Route splits traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

impl RouteTargetReference {
    /// Target a Service by name
    pub fn service(name: impl Into<String>) -> Self {
        Self {
            kind: "Service".to_string(),
            name: name.into(),
            weight: None,
        }
    }
}

/// Port selection on the backend Service
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    /// Port name or number on the Service
    pub target_port: IntOrString,
}

/// TLS settings of a Route
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Where TLS is terminated
    pub termination: TlsTermination,
    /// What to do with plain HTTP requests (`Allow`, `Redirect`, `None`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,
}

impl TlsConfig {
    /// TLS block for a termination mode; edge routes redirect plain HTTP
    pub fn for_termination(termination: TlsTermination) -> Self {
        let insecure_edge_termination_policy = match termination {
            TlsTermination::Edge => Some("Redirect".to_string()),
            TlsTermination::Passthrough | TlsTermination::Reencrypt => None,
        };
        Self {
            termination,
            insecure_edge_termination_policy,
        }
    }
}

/// Route status as reported by the routers that admitted it
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    /// One entry per router exposing the Route
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<RouteIngress>,
}

/// Router-specific exposure of a Route
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngress {
    /// Hostname the router serves the Route on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Name of the router
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_name: Option<String>,
}
