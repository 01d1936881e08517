//! Controller runner - wires the reconciler to kube-runtime watches
//!
//! Two controllers share one [`RouteContext`] and one reconcile function:
//! - the Service controller reacts to Service changes and to changes of the
//!   Routes it owns
//! - the Route controller reacts to Route changes and to Service events mapped
//!   onto the same key, which is how a deleted Service still reaches the
//!   ensure-absent path
//!
//! Both run the same idempotent reconcile, so overlapping triggers for a key
//! are harmless.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};

use crate::backoff::RequeueBackoff;
use crate::controller::{error_policy, reconcile_route, reconcile_service, RouteContext};
use crate::crd::Route;
use crate::{Error, ObjectKey};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Boxed controller future
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Build the Service and Route controller futures.
///
/// Watches every namespace unless `namespace` is set.
pub fn build_controllers(
    client: Client,
    ctx: Arc<RouteContext>,
    namespace: Option<&str>,
) -> Vec<ControllerFuture> {
    let services: Api<Service> = scoped_api(&client, namespace);
    let routes: Api<Route> = scoped_api(&client, namespace);

    tracing::info!(namespace = namespace.unwrap_or("*"), "- Service controller");
    let service_ctrl = Controller::new(services.clone(), watcher_config())
        .owns(routes.clone(), watcher_config())
        .shutdown_on_signal()
        .run(reconcile_service, error_policy, ctx.clone())
        .for_each(log_reconcile_result("Service", ctx.backoff.clone()));

    tracing::info!(namespace = namespace.unwrap_or("*"), "- Route controller");
    let route_ctrl = Controller::new(routes, watcher_config())
        .watches(services, watcher_config(), route_for_service)
        .shutdown_on_signal()
        .run(reconcile_route, error_policy, ctx.clone())
        .for_each(log_reconcile_result("Route", ctx.backoff.clone()));

    vec![Box::pin(service_ctrl), Box::pin(route_ctrl)]
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Map a Service event onto the Route sharing its key
fn route_for_service(service: Service) -> Option<ObjectRef<Route>> {
    let name = service.metadata.name.as_deref()?;
    let namespace = service.metadata.namespace.as_deref()?;
    Some(ObjectRef::new(name).within(namespace))
}

/// Log each reconcile outcome and clear backoff for keys that are settled.
///
/// A key is settled when it reconciled cleanly or when its object is no longer
/// in the cache. Failed reconciles are already logged by the error policy.
fn log_reconcile_result<K, QErr>(
    controller_name: &'static str,
    backoff: Arc<RequeueBackoff>,
) -> impl Fn(Result<(ObjectRef<K>, Action), controller::Error<Error, QErr>>) -> std::future::Ready<()>
where
    K: Resource,
    QErr: std::fmt::Debug + 'static,
{
    move |result| {
        match result {
            Ok((obj_ref, action)) => {
                forget(&backoff, obj_ref.namespace.as_deref(), &obj_ref.name);
                tracing::debug!(object = %obj_ref, ?action, "{} reconciliation completed", controller_name);
            }
            // the object is gone, e.g. a Service event mapped to a missing Route
            Err(controller::Error::ObjectNotFound(obj_ref)) => {
                forget(&backoff, obj_ref.namespace.as_deref(), &obj_ref.name);
                tracing::trace!(object = %obj_ref, "{} not in cache, skipping", controller_name);
            }
            Err(controller::Error::ReconcilerFailed(e, obj_ref)) => {
                tracing::debug!(object = %obj_ref, error = %e, "{} reconciliation failed", controller_name);
            }
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}

fn forget(backoff: &RequeueBackoff, namespace: Option<&str>, name: &str) {
    if let Some(namespace) = namespace {
        backoff.reset(&ObjectKey::new(namespace, name));
    }
}
