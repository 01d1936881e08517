//! Reconciliation logic for driver UI Routes
//!
//! The reconciler is level-triggered: it is handed a `(namespace, name)` key
//! and converges the Route for that key against the Service's current state.

mod route;

pub use route::{
    error_policy, reconcile_key, reconcile_route, reconcile_service, KubeRouteStore,
    RouteContext, RouteStore,
};
