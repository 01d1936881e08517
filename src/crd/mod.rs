//! Resource types the controller writes
//!
//! Services come from `k8s_openapi`; the Route is OpenShift's own CRD.

mod route;

pub use route::{
    Route, RouteIngress, RoutePort, RouteSpec, RouteStatus, RouteTargetReference, TlsConfig,
    TlsTermination,
};
