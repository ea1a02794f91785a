//! Patch Assembler - JSON Patch construction
//!
//! Walks a pod's containers in order, runs the normalizer on each, and
//! turns the resulting fills into a flat, ordered list of RFC 6902 `add`
//! operations. Assembly is all-or-nothing: the first container that fails
//! normalization aborts the whole pod, so a patch is never partially
//! applied.
//!
//! Patch granularity is the most minimal valid one. A JSON Patch `add` of
//! a nested field requires its parent object to exist in the original
//! document, so the assembler targets the deepest object that does:
//! field-level adds when the `limits`/`requests` map is present, a
//! map-level add when only `resources` is present, and a single
//! whole-`resources` add when the container declared no resources at all.

use json_patch::{AddOperation, PatchOperation};
use jsonptr::PointerBuf;
use serde_json::{Map, Value};

use crate::normalize::{normalize, FieldFill, Strategy};
use crate::resources::{ContainerResources, Defaults, ResourceField};
use crate::Result;

/// Assemble the JSON Patch for a whole pod.
///
/// Containers are visited in their original order and patch paths are
/// addressed by that 0-based index, so the patch never reorders anything.
/// Returns an empty list when every container is already fully specified
/// and consistent - the common case.
pub fn assemble(
    containers: &[ContainerResources],
    defaults: &Defaults,
    strategy: Strategy,
) -> Result<Vec<PatchOperation>> {
    let mut ops = Vec::new();
    for (index, resources) in containers.iter().enumerate() {
        let fills = normalize(index, resources, defaults, strategy)?;
        container_ops(index, resources, &fills, &mut ops);
    }
    Ok(ops)
}

/// Convert one container's fills into patch operations.
///
/// Emission order is deterministic: limit fills before request fills,
/// memory before CPU within each map.
fn container_ops(
    index: usize,
    resources: &ContainerResources,
    fills: &[FieldFill],
    ops: &mut Vec<PatchOperation>,
) {
    if fills.is_empty() {
        return;
    }

    let limits: Vec<&FieldFill> = fills
        .iter()
        .filter(|f| f.field == ResourceField::Limit)
        .collect();
    let requests: Vec<&FieldFill> = fills
        .iter()
        .filter(|f| f.field == ResourceField::Request)
        .collect();

    if !resources.has_resources {
        // No resources object at all: one add carrying everything.
        let mut object = Map::new();
        if !limits.is_empty() {
            object.insert(ResourceField::Limit.map_key().to_string(), fill_map(&limits));
        }
        if !requests.is_empty() {
            object.insert(
                ResourceField::Request.map_key().to_string(),
                fill_map(&requests),
            );
        }
        ops.push(add(
            container_pointer(index, &["resources"]),
            Value::Object(object),
        ));
        return;
    }

    map_ops(index, resources.has_limits, ResourceField::Limit, &limits, ops);
    map_ops(index, resources.has_requests, ResourceField::Request, &requests, ops);
}

/// Emit the operations for one `limits`/`requests` map.
fn map_ops(
    index: usize,
    map_present: bool,
    field: ResourceField,
    fills: &[&FieldFill],
    ops: &mut Vec<PatchOperation>,
) {
    if fills.is_empty() {
        return;
    }
    if map_present {
        for fill in fills {
            ops.push(add(
                container_pointer(index, &["resources", field.map_key(), fill.kind.as_str()]),
                quantity_value(fill),
            ));
        }
    } else {
        ops.push(add(
            container_pointer(index, &["resources", field.map_key()]),
            fill_map(fills),
        ));
    }
}

/// Build the `{kind: quantity}` object for a set of fills.
fn fill_map(fills: &[&FieldFill]) -> Value {
    let mut object = Map::new();
    for fill in fills {
        object.insert(fill.kind.as_str().to_string(), quantity_value(fill));
    }
    Value::Object(object)
}

/// A fill's quantity as a JSON value (its original string spelling).
fn quantity_value(fill: &FieldFill) -> Value {
    serde_json::to_value(&fill.value).unwrap_or_default()
}

/// Pointer into the pod document for one container's subpath.
fn container_pointer(index: usize, tail: &[&str]) -> PointerBuf {
    let mut pointer = PointerBuf::from_tokens(["spec", "containers"]);
    pointer.push_back(index.to_string());
    for segment in tail {
        pointer.push_back(*segment);
    }
    pointer
}

fn add(path: PointerBuf, value: Value) -> PatchOperation {
    PatchOperation::Add(AddOperation { path, value })
}
