//! Route lifecycle stories
//!
//! Each story runs the real controllers against a kind cluster, scoped to its
//! own namespace so stories do not see each other's Services.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tokio::task::JoinHandle;

use spark_ui_router::config::RouteSettings;
use spark_ui_router::controller::{KubeRouteStore, RouteContext};
use spark_ui_router::crd::Route;
use spark_ui_router::runner::build_controllers;

use super::helpers::{
    cleanup_service, driver_service, ensure_namespace, ensure_test_cluster, wait_for,
};

const WAIT: Duration = Duration::from_secs(60);

/// Start both controllers watching only `namespace`
fn start_controllers(client: &Client, namespace: &str) -> JoinHandle<()> {
    let ctx = Arc::new(RouteContext::new(
        Arc::new(KubeRouteStore::new(client.clone())),
        RouteSettings::default(),
    ));
    let controllers = build_controllers(client.clone(), ctx, Some(namespace));
    tokio::spawn(async move {
        futures::future::join_all(controllers).await;
    })
}

async fn route_exists(routes: &Api<Route>, name: &str) -> bool {
    matches!(routes.get_opt(name).await, Ok(Some(_)))
}

/// Story: A Spark job starts and its driver UI gets a Route
///
/// Expected behavior:
/// - A Route with the Service's name appears in the same namespace
/// - It targets the Service on the `spark-ui` port
/// - It is owned by the Service
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_driver_service_gets_a_route() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "sur-create";
    let name = "pi-7f3a-driver-svc";
    ensure_namespace(&client, ns)
        .await
        .expect("failed to create namespace");
    cleanup_service(&client, ns, name).await;

    let controllers = start_controllers(&client, ns);
    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    let routes: Api<Route> = Api::namespaced(client.clone(), ns);

    let service = services
        .create(&PostParams::default(), &driver_service(ns, name))
        .await
        .expect("failed to create service");

    assert!(
        wait_for(WAIT, || route_exists(&routes, name)).await,
        "route was never created"
    );

    let route = routes.get(name).await.expect("failed to get route");
    assert_eq!(route.spec.to.name, name);
    let owner = &route.metadata.owner_references.expect("route has no owner")[0];
    assert_eq!(owner.kind, "Service");
    assert_eq!(Some(owner.uid.clone()), service.metadata.uid);

    cleanup_service(&client, ns, name).await;
    controllers.abort();
}

/// Story: Services without the driver marker are left alone
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_unrelated_service_gets_no_route() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "sur-ignore";
    let name = "postgres";
    ensure_namespace(&client, ns)
        .await
        .expect("failed to create namespace");
    cleanup_service(&client, ns, name).await;

    let controllers = start_controllers(&client, ns);
    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    let routes: Api<Route> = Api::namespaced(client.clone(), ns);

    services
        .create(&PostParams::default(), &driver_service(ns, name))
        .await
        .expect("failed to create service");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!route_exists(&routes, name).await);

    cleanup_service(&client, ns, name).await;
    controllers.abort();
}

/// Story: Someone deletes the Route by hand and it comes back
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleted_route_is_recreated() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "sur-repair";
    let name = "etl-driver-svc";
    ensure_namespace(&client, ns)
        .await
        .expect("failed to create namespace");
    cleanup_service(&client, ns, name).await;

    let controllers = start_controllers(&client, ns);
    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    let routes: Api<Route> = Api::namespaced(client.clone(), ns);

    services
        .create(&PostParams::default(), &driver_service(ns, name))
        .await
        .expect("failed to create service");
    assert!(wait_for(WAIT, || route_exists(&routes, name)).await);

    let before = routes.get(name).await.expect("failed to get route");
    routes
        .delete(name, &DeleteParams::default())
        .await
        .expect("failed to delete route");

    let routes = &routes;
    let before_uid = &before.metadata.uid;
    let recreated = wait_for(WAIT, move || async move {
        match routes.get_opt(name).await {
            Ok(Some(route)) => route.metadata.uid != *before_uid,
            _ => false,
        }
    })
    .await;
    assert!(recreated, "route was not recreated");

    cleanup_service(&client, ns, name).await;
    controllers.abort();
}

/// Story: The job finishes, its Service is deleted, and the Route goes with it
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_route_is_removed_with_its_service() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "sur-delete";
    let name = "pi-driver-svc";
    ensure_namespace(&client, ns)
        .await
        .expect("failed to create namespace");
    cleanup_service(&client, ns, name).await;

    let controllers = start_controllers(&client, ns);
    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    let routes: Api<Route> = Api::namespaced(client.clone(), ns);

    services
        .create(&PostParams::default(), &driver_service(ns, name))
        .await
        .expect("failed to create service");
    assert!(wait_for(WAIT, || route_exists(&routes, name)).await);

    services
        .delete(name, &DeleteParams::background())
        .await
        .expect("failed to delete service");

    let routes = &routes;
    let removed = wait_for(WAIT, move || async move { !route_exists(routes, name).await }).await;
    assert!(removed, "route outlived its service");

    controllers.abort();
}
