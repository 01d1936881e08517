//! Driver Service → Route reconciliation
//!
//! Level-triggered: each invocation gets only a `(namespace, name)` key and
//! re-reads the Service and Route from the store, so stale, duplicated or
//! reordered triggers all converge to the same state. An invocation issues at
//! most one mutating call (a create or a delete, never both, never an update).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, DeleteParams, PostParams};
use kube::runtime::controller::Action;
use kube::{Client, Resource};
use tracing::{debug, error, info, instrument, trace, warn};

#[cfg(test)]
use mockall::automock;

use crate::backoff::{BackoffConfig, RequeueBackoff};
use crate::compiler::compile_route;
use crate::config::{ControllerConfig, RouteCheckFailurePolicy, RouteSettings};
use crate::crd::Route;
use crate::error::StoreOperation;
use crate::{Error, ObjectKey, DEFAULT_RESYNC_INTERVAL_SECS, FIELD_MANAGER};

// =============================================================================
// Traits for dependency injection and testability
// =============================================================================

/// Resource-store operations the reconciler needs.
///
/// Reads return `Ok(None)` when the object does not exist; every other failure
/// is an `Error::Store` carrying the operation and key.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Get the Service at `key`
    async fn get_service(&self, key: &ObjectKey) -> Result<Option<Service>, Error>;

    /// Get the Route at `key`
    async fn get_route(&self, key: &ObjectKey) -> Result<Option<Route>, Error>;

    /// Create a Route; its metadata carries the target namespace and name
    async fn create_route(&self, route: &Route) -> Result<(), Error>;

    /// Delete the Route at `key`
    async fn delete_route(&self, key: &ObjectKey) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeRouteStore {
    client: Client,
}

impl KubeRouteStore {
    /// Create a new KubeRouteStore wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn routes(&self, namespace: &str) -> Api<Route> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl RouteStore for KubeRouteStore {
    async fn get_service(&self, key: &ObjectKey) -> Result<Option<Service>, Error> {
        self.services(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| Error::store(StoreOperation::GetService, key, e))
    }

    async fn get_route(&self, key: &ObjectKey) -> Result<Option<Route>, Error> {
        self.routes(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| Error::store(StoreOperation::GetRoute, key, e))
    }

    async fn create_route(&self, route: &Route) -> Result<(), Error> {
        let key = ObjectKey::for_resource(route)?;
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.routes(&key.namespace)
            .create(&params, route)
            .await
            .map_err(|e| Error::store(StoreOperation::CreateRoute, &key, e))?;
        Ok(())
    }

    async fn delete_route(&self, key: &ObjectKey) -> Result<(), Error> {
        self.routes(&key.namespace)
            .delete(&key.name, &DeleteParams::background())
            .await
            .map_err(|e| Error::store(StoreOperation::DeleteRoute, key, e))?;
        Ok(())
    }
}

// =============================================================================
// Controller context
// =============================================================================

/// Shared state for Route reconciliation.
///
/// Everything here is either immutable configuration or dispatcher-side
/// bookkeeping; the reconciler keeps nothing between invocations.
pub struct RouteContext {
    /// Resource store client
    pub store: Arc<dyn RouteStore>,
    /// Route-shaping settings
    pub settings: RouteSettings,
    /// Requeue interval for managed keys
    pub resync_interval: Duration,
    /// Handling of failed Route existence checks
    pub route_check_failure: RouteCheckFailurePolicy,
    /// Per-key requeue backoff used by the error policy
    pub backoff: Arc<RequeueBackoff>,
}

impl RouteContext {
    /// Create a context with default resync, policy and backoff
    pub fn new(store: Arc<dyn RouteStore>, settings: RouteSettings) -> Self {
        Self {
            store,
            settings,
            resync_interval: Duration::from_secs(DEFAULT_RESYNC_INTERVAL_SECS),
            route_check_failure: RouteCheckFailurePolicy::default(),
            backoff: Arc::new(RequeueBackoff::new(BackoffConfig::default())),
        }
    }

    /// Create a context backed by the Kubernetes API
    pub fn from_config(client: Client, config: &ControllerConfig) -> Self {
        Self::new(
            Arc::new(KubeRouteStore::new(client)),
            config.route_settings(),
        )
        .with_resync_interval(config.resync_interval())
        .with_route_check_failure(config.route_check_failure)
    }

    /// Override the resync interval
    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = interval;
        self
    }

    /// Override the route-check failure policy
    pub fn with_route_check_failure(mut self, policy: RouteCheckFailurePolicy) -> Self {
        self.route_check_failure = policy;
        self
    }

    /// Override the backoff tuning
    pub fn with_backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Arc::new(RequeueBackoff::new(config));
        self
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Reconcile the Route for one `(namespace, name)` key.
///
/// 1. Names without the service marker are ignored without touching the store.
/// 2. The Service is read; a read failure aborts before any mutation.
/// 3. Service present: create the Route unless one already exists.
/// 4. Service absent: delete the same-keyed Route if there is one.
///
/// Returns the requeue hint for the dispatcher, or an error it should back
/// off on.
#[instrument(skip_all, fields(namespace = %key.namespace, name = %key.name))]
pub async fn reconcile_key(key: &ObjectKey, ctx: &RouteContext) -> Result<Action, Error> {
    if !ctx.settings.matches(&key.name) {
        trace!("not a driver UI service, ignoring");
        return Ok(Action::await_change());
    }
    key.validate()?;

    match ctx.store.get_service(key).await {
        Ok(Some(service)) => ensure_route(key, &service, ctx).await,
        Ok(None) => ensure_absent(key, ctx).await,
        Err(e) => {
            error!(error = %e, "unable to fetch Service");
            Err(e)
        }
    }
}

/// Service exists: make sure its Route does too
async fn ensure_route(
    key: &ObjectKey,
    service: &Service,
    ctx: &RouteContext,
) -> Result<Action, Error> {
    match ctx.store.get_route(key).await {
        Ok(Some(_)) => {
            debug!("route already exists");
            Ok(Action::requeue(ctx.resync_interval))
        }
        Ok(None) => {
            let route = compile_route(service, &ctx.settings);
            match ctx.store.create_route(&route).await {
                Ok(()) => {
                    info!(port = %ctx.settings.ui_port_name, "created route for driver service");
                    Ok(Action::requeue(ctx.resync_interval))
                }
                Err(e) if e.is_conflict() => {
                    info!("route was created concurrently, nothing to do");
                    Ok(Action::requeue(ctx.resync_interval))
                }
                Err(e) => {
                    error!(error = %e, "failed to create route");
                    Err(e)
                }
            }
        }
        Err(e) => match ctx.route_check_failure {
            RouteCheckFailurePolicy::Skip => {
                warn!(
                    error = %e,
                    "route existence check failed, skipping creation until next resync"
                );
                Ok(Action::requeue(ctx.resync_interval))
            }
            RouteCheckFailurePolicy::Requeue => {
                error!(error = %e, "route existence check failed");
                Err(e)
            }
        },
    }
}

/// Service is gone: remove a Route left behind under the same key
async fn ensure_absent(key: &ObjectKey, ctx: &RouteContext) -> Result<Action, Error> {
    let route = ctx.store.get_route(key).await.map_err(|e| {
        error!(error = %e, "unable to check for orphaned route");
        e
    })?;

    if route.is_none() {
        debug!("service and route both absent");
        return Ok(Action::await_change());
    }

    match ctx.store.delete_route(key).await {
        Ok(()) => {
            info!("deleted route for removed driver service");
            Ok(Action::await_change())
        }
        Err(e) if e.is_not_found() => {
            // garbage collector followed the owner reference first
            debug!("route already removed");
            Ok(Action::await_change())
        }
        Err(e) => {
            error!(error = %e, "failed to delete route");
            Err(e)
        }
    }
}

/// Controller entry point for Service events
pub async fn reconcile_service(
    service: Arc<Service>,
    ctx: Arc<RouteContext>,
) -> Result<Action, Error> {
    let key = ObjectKey::for_resource(service.as_ref())?;
    reconcile_key(&key, &ctx).await
}

/// Controller entry point for Route events
pub async fn reconcile_route(route: Arc<Route>, ctx: Arc<RouteContext>) -> Result<Action, Error> {
    let key = ObjectKey::for_resource(route.as_ref())?;
    reconcile_key(&key, &ctx).await
}

/// Error policy shared by the Service and Route controllers.
///
/// Service and Route share a key, so both controllers back off on the same
/// failure counter.
pub fn error_policy<K: Resource>(obj: Arc<K>, error: &Error, ctx: Arc<RouteContext>) -> Action {
    Action::requeue(requeue_delay(obj.as_ref(), error, &ctx))
}

/// Record the failure and pick the requeue delay for `obj`
fn requeue_delay<K: Resource>(obj: &K, error: &Error, ctx: &RouteContext) -> Duration {
    let retryable = error.is_retryable();
    let delay = match ObjectKey::for_resource(obj) {
        Ok(key) => ctx.backoff.next_delay(&key, retryable),
        Err(_) => ctx.backoff.max_delay(),
    };

    error!(
        %error,
        retryable,
        delay_secs = delay.as_secs(),
        "reconciliation failed"
    );

    delay
}

// =============================================================================
// Tests
// =============================================================================
