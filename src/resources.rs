//! Per-container resource view and operator defaults
//!
//! These types are the read-only inputs to the normalizer: a
//! [`ContainerResources`] snapshot extracted from the incoming pod, and the
//! fully populated [`Defaults`] parsed once at startup. Absence of a field
//! is always distinguishable from a declared zero.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::{Container, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;

use crate::quantity::Quantity;
use crate::Result;

/// The two resource kinds the webhook defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Memory, in bytes (binary or decimal suffixes).
    Memory,
    /// CPU, in cores or millicores.
    Cpu,
}

impl ResourceKind {
    /// Both kinds, in normalization order (memory first, then CPU).
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Memory, ResourceKind::Cpu];

    /// The key used for this kind in `limits`/`requests` maps and patch
    /// paths.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Memory => "memory",
            ResourceKind::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of a resource kind a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceField {
    /// The maximum amount the container may consume.
    Limit,
    /// The guaranteed minimum amount.
    Request,
}

impl ResourceField {
    /// The map this field lives in within a `resources` object.
    pub fn map_key(self) -> &'static str {
        match self {
            ResourceField::Limit => "limits",
            ResourceField::Request => "requests",
        }
    }
}

/// The optional limit/request pair for one resource kind.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpec {
    /// Declared limit, if the submitter set one.
    pub limit: Option<Quantity>,
    /// Declared request, if the submitter set one.
    pub request: Option<Quantity>,
}

impl ResourceSpec {
    /// Whether neither field is declared.
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.request.is_none()
    }
}

/// One container's declared resources, plus which of the enclosing JSON
/// objects (`resources`, `limits`, `requests`) actually exist in the pod
/// document.
///
/// The presence flags matter for patch construction: a JSON Patch `add` of
/// a nested field requires its parent object to exist, so the assembler
/// targets the deepest existing object.
#[derive(Debug, Clone, Default)]
pub struct ContainerResources {
    /// Declared memory limit/request.
    pub memory: ResourceSpec,
    /// Declared CPU limit/request.
    pub cpu: ResourceSpec,
    /// Whether the container had a `resources` object at all.
    pub has_resources: bool,
    /// Whether `resources.limits` was present.
    pub has_limits: bool,
    /// Whether `resources.requests` was present.
    pub has_requests: bool,
}

impl ContainerResources {
    /// Extract the resource view from a pod container.
    pub fn from_container(container: &Container) -> Self {
        Self::from_requirements(container.resources.as_ref())
    }

    /// Extract the resource view from an optional `resources` object.
    pub fn from_requirements(requirements: Option<&ResourceRequirements>) -> Self {
        let limits = requirements.and_then(|r| r.limits.as_ref());
        let requests = requirements.and_then(|r| r.requests.as_ref());

        Self {
            memory: ResourceSpec {
                limit: declared(limits, ResourceKind::Memory),
                request: declared(requests, ResourceKind::Memory),
            },
            cpu: ResourceSpec {
                limit: declared(limits, ResourceKind::Cpu),
                request: declared(requests, ResourceKind::Cpu),
            },
            has_resources: requirements.is_some(),
            has_limits: limits.is_some(),
            has_requests: requests.is_some(),
        }
    }

    /// The declared spec for one resource kind.
    pub fn spec(&self, kind: ResourceKind) -> &ResourceSpec {
        match kind {
            ResourceKind::Memory => &self.memory,
            ResourceKind::Cpu => &self.cpu,
        }
    }

    /// Whether all four fields are absent.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty() && self.cpu.is_empty()
    }
}

/// Look up one declared field in a `limits`/`requests` map, leniently.
fn declared(map: Option<&BTreeMap<String, K8sQuantity>>, kind: ResourceKind) -> Option<Quantity> {
    map.and_then(|m| m.get(kind.as_str()))
        .map(|q| Quantity::lenient(&q.0))
}

/// The operator-configured default quantities.
///
/// Always fully populated: parsed strictly once at startup (the process
/// must not start with unparseable defaults) and immutable afterwards, so
/// it is safe to share across handlers without locking.
#[derive(Debug, Clone)]
pub struct Defaults {
    limit_memory: Quantity,
    limit_cpu: Quantity,
    request_memory: Quantity,
    request_cpu: Quantity,
}

impl Defaults {
    /// Parse the four default quantity strings.
    pub fn parse(
        limit_memory: &str,
        limit_cpu: &str,
        request_memory: &str,
        request_cpu: &str,
    ) -> Result<Self> {
        Ok(Self {
            limit_memory: Quantity::parse(limit_memory)?,
            limit_cpu: Quantity::parse(limit_cpu)?,
            request_memory: Quantity::parse(request_memory)?,
            request_cpu: Quantity::parse(request_cpu)?,
        })
    }

    /// The default for one field of one resource kind.
    pub fn get(&self, kind: ResourceKind, field: ResourceField) -> &Quantity {
        match (kind, field) {
            (ResourceKind::Memory, ResourceField::Limit) => &self.limit_memory,
            (ResourceKind::Memory, ResourceField::Request) => &self.request_memory,
            (ResourceKind::Cpu, ResourceField::Limit) => &self.limit_cpu,
            (ResourceKind::Cpu, ResourceField::Request) => &self.request_cpu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource_list(entries: &[(&str, &str)]) -> BTreeMap<String, K8sQuantity> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), K8sQuantity(v.to_string())))
            .collect()
    }

    #[test]
    fn absent_resources_object() {
        let view = ContainerResources::from_requirements(None);
        assert!(view.is_empty());
        assert!(!view.has_resources);
        assert!(!view.has_limits);
        assert!(!view.has_requests);
    }

    #[test]
    fn empty_resources_object_is_present_but_empty() {
        let requirements = ResourceRequirements::default();
        let view = ContainerResources::from_requirements(Some(&requirements));
        assert!(view.is_empty());
        assert!(view.has_resources);
        assert!(!view.has_limits);
        assert!(!view.has_requests);
    }

    #[test]
    fn extracts_declared_fields() {
        let requirements = ResourceRequirements {
            limits: Some(resource_list(&[("memory", "2G"), ("cpu", "1")])),
            requests: Some(resource_list(&[("memory", "1G")])),
            ..Default::default()
        };
        let view = ContainerResources::from_requirements(Some(&requirements));

        assert_eq!(view.memory.limit.as_ref().unwrap().as_str(), "2G");
        assert_eq!(view.memory.request.as_ref().unwrap().as_str(), "1G");
        assert_eq!(view.cpu.limit.as_ref().unwrap().as_str(), "1");
        assert!(view.cpu.request.is_none());
        assert!(view.has_limits);
        assert!(view.has_requests);
    }

    #[test]
    fn malformed_declared_value_stays_present() {
        let requirements = ResourceRequirements {
            limits: Some(resource_list(&[("memory", "lots")])),
            ..Default::default()
        };
        let view = ContainerResources::from_requirements(Some(&requirements));

        let limit = view.memory.limit.as_ref().unwrap();
        assert_eq!(limit.as_str(), "lots");
        assert!(!limit.is_comparable());
    }

    #[test]
    fn defaults_reject_unparseable_input() {
        assert!(Defaults::parse("1G", "0.5", "1G", "0.1").is_ok());
        assert!(Defaults::parse("1G", "half a core", "1G", "0.1").is_err());
    }

    #[test]
    fn defaults_lookup_by_kind_and_field() {
        let defaults = Defaults::parse("1G", "0.5", "512M", "0.1").unwrap();
        assert_eq!(
            defaults.get(ResourceKind::Memory, ResourceField::Limit).as_str(),
            "1G"
        );
        assert_eq!(
            defaults.get(ResourceKind::Memory, ResourceField::Request).as_str(),
            "512M"
        );
        assert_eq!(
            defaults.get(ResourceKind::Cpu, ResourceField::Limit).as_str(),
            "0.5"
        );
        assert_eq!(
            defaults.get(ResourceKind::Cpu, ResourceField::Request).as_str(),
            "0.1"
        );
    }
}
