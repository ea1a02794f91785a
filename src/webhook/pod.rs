//! Pod Mutation Webhook
//!
//! Handles AdmissionReview requests for Pods, injecting default resource
//! requests and limits into containers that omit them. The request UID is
//! echoed back on every branch; pods that would violate request <= limit
//! are denied with a message naming the container and resource kind.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use json_patch::Patch;
use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use tracing::{debug, error, info, warn};

use crate::patch::assemble;
use crate::resources::ContainerResources;

use super::WebhookState;

/// Handle a mutating admission review for a Pod
///
/// This handler:
/// 1. Converts the review envelope into an admission request
/// 2. Extracts each container's declared resources
/// 3. Assembles the defaulting JSON patch
/// 4. Returns allow (possibly with a patch) or deny as an admission review
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<Pod>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let req: AdmissionRequest<Pod> = match body.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let response = mutate_pod(&state, &req);
    Json(response.into_review())
}

/// Process a single pod mutation request. Pure apart from logging.
fn mutate_pod(state: &WebhookState, request: &AdmissionRequest<Pod>) -> AdmissionResponse {
    let uid = &request.uid;

    let pod = match &request.object {
        Some(pod) => pod,
        None => {
            debug!(uid = %uid, "No pod object in request, allowing unchanged");
            return AdmissionResponse::from(request);
        }
    };

    let containers: Vec<ContainerResources> = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(ContainerResources::from_container)
                .collect()
        })
        .unwrap_or_default();

    match assemble(&containers, &state.defaults, state.strategy) {
        Ok(ops) if ops.is_empty() => {
            debug!(
                uid = %uid,
                pod = ?pod.metadata.name,
                "Resources already fully specified, allowing unchanged"
            );
            AdmissionResponse::from(request)
        }
        Ok(ops) => {
            info!(
                uid = %uid,
                pod = ?pod.metadata.name,
                patch_ops = ops.len(),
                "Injecting default container resources"
            );
            match AdmissionResponse::from(request).with_patch(Patch(ops)) {
                Ok(response) => response,
                Err(e) => {
                    error!(uid = %uid, error = %e, "Failed to serialize patch");
                    AdmissionResponse::from(request)
                        .deny(format!("patch serialization error: {e}"))
                }
            }
        }
        Err(e) => {
            warn!(
                uid = %uid,
                pod = ?pod.metadata.name,
                error = %e,
                "Denying pod admission"
            );
            AdmissionResponse::from(request).deny(e.to_string())
        }
    }
}
