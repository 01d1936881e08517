//! Shared setup for kind stories

use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Namespace, Service, ServicePort, ServiceSpec};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::Client;

const ROUTE_CRD_NAME: &str = "routes.route.openshift.io";

/// Connect to the current kube context and make sure Routes can be stored
pub async fn ensure_test_cluster() -> Result<Client, kube::Error> {
    let client = Client::try_default().await?;
    install_route_crd(&client).await?;
    Ok(client)
}

/// Install a schemaless Route CRD unless the cluster already serves Routes
async fn install_route_crd(client: &Client) -> Result<(), kube::Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    if crds.get_opt(ROUTE_CRD_NAME).await?.is_some() {
        return Ok(());
    }

    let crd: CustomResourceDefinition = serde_json::from_value(serde_json::json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "CustomResourceDefinition",
        "metadata": { "name": ROUTE_CRD_NAME },
        "spec": {
            "group": "route.openshift.io",
            "scope": "Namespaced",
            "names": { "kind": "Route", "plural": "routes", "singular": "route" },
            "versions": [{
                "name": "v1",
                "served": true,
                "storage": true,
                "subresources": { "status": {} },
                "schema": { "openAPIV3Schema": {
                    "type": "object",
                    "x-kubernetes-preserve-unknown-fields": true
                }}
            }]
        }
    }))
    .map_err(kube::Error::SerdeError)?;

    crds.patch(
        ROUTE_CRD_NAME,
        &PatchParams::apply("spark-ui-router-tests").force(),
        &Patch::Apply(&crd),
    )
    .await?;

    // give the API server a moment to start serving the new type
    tokio::time::sleep(Duration::from_secs(2)).await;
    Ok(())
}

/// Create (or keep) a test namespace
pub async fn ensure_namespace(client: &Client, name: &str) -> Result<(), kube::Error> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    namespaces
        .patch(
            name,
            &PatchParams::apply("spark-ui-router-tests").force(),
            &Patch::Apply(&ns),
        )
        .await?;
    Ok(())
}

/// A Service shaped like the one spark-submit creates for a driver
pub fn driver_service(namespace: &str, name: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(
                [("spark-role".to_string(), "driver".to_string())]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            selector: Some(
                [("spark-role".to_string(), "driver".to_string())]
                    .into_iter()
                    .collect(),
            ),
            ports: Some(vec![ServicePort {
                name: Some("spark-ui".to_string()),
                port: 4040,
                target_port: Some(IntOrString::Int(4040)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Delete a Service, ignoring "not found"
pub async fn cleanup_service(client: &Client, namespace: &str, name: &str) {
    let api: Api<Service> = Api::namespaced(client.clone(), namespace);
    let _ = api.delete(name, &DeleteParams::background()).await;
}

/// Poll `check` every second until it returns true or `timeout` elapses
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    false
}
