//! Desired Route construction
//!
//! Turns a driver Service into the Route that should expose it. Pure: no I/O,
//! no clock, no randomness, so the same Service always yields the same Route.

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::Resource;

use crate::config::RouteSettings;
use crate::crd::{Route, RoutePort, RouteSpec, RouteTargetReference, TlsConfig};

/// Build the Route that exposes `service`.
///
/// The Route:
/// - has the Service's name and namespace
/// - copies the Service's labels verbatim
/// - targets the Service on the named UI port
/// - carries a controller owner reference to the Service, so deleting the
///   Service cascades to the Route
pub fn compile_route(service: &Service, settings: &RouteSettings) -> Route {
    let name = service.metadata.name.clone().unwrap_or_default();

    Route {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: service.metadata.namespace.clone(),
            labels: service.metadata.labels.clone(),
            owner_references: Some(vec![controller_owner_reference(service)]),
            ..Default::default()
        },
        spec: RouteSpec {
            host: None,
            path: None,
            to: RouteTargetReference::service(name),
            port: Some(RoutePort {
                target_port: IntOrString::String(settings.ui_port_name.clone()),
            }),
            tls: settings.tls_termination.map(TlsConfig::for_termination),
            wildcard_policy: None,
        },
        status: None,
    }
}

/// Controller owner reference pointing at `service`
fn controller_owner_reference(service: &Service) -> OwnerReference {
    OwnerReference {
        api_version: Service::api_version(&()).into_owned(),
        kind: Service::kind(&()).into_owned(),
        name: service.metadata.name.clone().unwrap_or_default(),
        uid: service.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}
