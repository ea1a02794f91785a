//! Resource Normalizer - the defaulting decision engine
//!
//! Given one container's declared resources and the operator defaults,
//! [`normalize`] decides which of the four fields (limit/request x
//! memory/cpu) to fill, and validates that the effective request never
//! exceeds the effective limit for either kind. It is a pure function:
//! no I/O, no shared state, deterministic for identical inputs.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::quantity::Quantity;
use crate::resources::{ContainerResources, Defaults, ResourceField, ResourceKind};
use crate::{Error, Result};

/// How declared values and operator defaults are merged.
///
/// The set of strategies is closed and chosen once at configuration time;
/// every strategy runs the same request <= limit validation on its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Fill each missing field with the operator default for that field.
    /// This is the default and the most precise strategy.
    #[default]
    PerField,
    /// Fill a resource kind (both fields) only when that kind is entirely
    /// absent; partially specified kinds are left untouched.
    KindComplement,
    /// Fill only containers that declare no resources at all.
    IfEmpty,
}

impl Strategy {
    /// The flag spelling of this strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::PerField => "per-field",
            Strategy::KindComplement => "kind-complement",
            Strategy::IfEmpty => "if-empty",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "per-field" => Ok(Strategy::PerField),
            "kind-complement" => Ok(Strategy::KindComplement),
            "if-empty" => Ok(Strategy::IfEmpty),
            other => Err(format!(
                "unknown strategy {other:?} (expected per-field, kind-complement or if-empty)"
            )),
        }
    }
}

/// One field the normalizer decided to inject.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFill {
    /// The resource kind being filled.
    pub kind: ResourceKind,
    /// Whether the limit or the request is being filled.
    pub field: ResourceField,
    /// The default quantity to inject.
    pub value: Quantity,
}

/// Decide which resource fields of one container to fill with defaults.
///
/// `index` is the container's 0-based position in the pod's container
/// list, used only for error reporting. Kinds are processed in a fixed
/// order (memory, then CPU); within a kind the decision is:
///
/// 1. both limit and request declared: nothing is filled - user intent
///    wins even when the values differ from the defaults;
/// 2. exactly one declared: the missing counterpart is filled with the
///    operator default for that specific field;
/// 3. neither declared: both are filled from the defaults;
/// 4. if the effective request exceeds the effective limit (and both are
///    comparable), the container is rejected with
///    [`Error::ResourceConflict`] instead of patched.
///
/// Steps 1-3 describe [`Strategy::PerField`]; the other strategies replace
/// the fill decision but keep step 4 unchanged. Malformed declared values
/// count as present but make the pair incomparable, so step 4 passes them
/// through for the API server's own validation.
pub fn normalize(
    index: usize,
    resources: &ContainerResources,
    defaults: &Defaults,
    strategy: Strategy,
) -> Result<Vec<FieldFill>> {
    let mut fills = Vec::new();

    for kind in ResourceKind::ALL {
        let spec = resources.spec(kind);

        let (fill_limit, fill_request) = match strategy {
            Strategy::PerField => (spec.limit.is_none(), spec.request.is_none()),
            Strategy::KindComplement => {
                let absent = spec.is_empty();
                (absent, absent)
            }
            Strategy::IfEmpty => {
                let empty = resources.is_empty();
                (empty, empty)
            }
        };

        if fill_limit {
            fills.push(FieldFill {
                kind,
                field: ResourceField::Limit,
                value: defaults.get(kind, ResourceField::Limit).clone(),
            });
        }
        if fill_request {
            fills.push(FieldFill {
                kind,
                field: ResourceField::Request,
                value: defaults.get(kind, ResourceField::Request).clone(),
            });
        }

        let limit = if fill_limit {
            Some(defaults.get(kind, ResourceField::Limit))
        } else {
            spec.limit.as_ref()
        };
        let request = if fill_request {
            Some(defaults.get(kind, ResourceField::Request))
        } else {
            spec.request.as_ref()
        };

        if let (Some(limit), Some(request)) = (limit, request) {
            if request.partial_cmp(limit) == Some(Ordering::Greater) {
                return Err(Error::ResourceConflict {
                    container: index,
                    kind,
                    request: request.to_string(),
                    limit: limit.to_string(),
                });
            }
        }
    }

    Ok(fills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceSpec;

    fn defaults() -> Defaults {
        Defaults::parse("1G", "0.5", "1G", "0.1").unwrap()
    }

    fn q(s: &str) -> Option<Quantity> {
        Some(Quantity::parse(s).unwrap())
    }

    fn view(
        memory_limit: Option<Quantity>,
        memory_request: Option<Quantity>,
        cpu_limit: Option<Quantity>,
        cpu_request: Option<Quantity>,
    ) -> ContainerResources {
        ContainerResources {
            memory: ResourceSpec {
                limit: memory_limit,
                request: memory_request,
            },
            cpu: ResourceSpec {
                limit: cpu_limit,
                request: cpu_request,
            },
            has_resources: true,
            has_limits: true,
            has_requests: true,
        }
    }

    fn fill_values(fills: &[FieldFill]) -> Vec<(ResourceKind, ResourceField, String)> {
        fills
            .iter()
            .map(|f| (f.kind, f.field, f.value.as_str().to_string()))
            .collect()
    }

    #[test]
    fn empty_container_gets_all_four_defaults() {
        let fills = normalize(0, &view(None, None, None, None), &defaults(), Strategy::PerField)
            .unwrap();

        assert_eq!(
            fill_values(&fills),
            vec![
                (ResourceKind::Memory, ResourceField::Limit, "1G".to_string()),
                (ResourceKind::Memory, ResourceField::Request, "1G".to_string()),
                (ResourceKind::Cpu, ResourceField::Limit, "0.5".to_string()),
                (ResourceKind::Cpu, ResourceField::Request, "0.1".to_string()),
            ]
        );
    }

    #[test]
    fn fully_specified_container_yields_no_fills() {
        let fills = normalize(
            0,
            &view(q("2G"), q("1G"), q("1"), q("0.5")),
            &defaults(),
            Strategy::PerField,
        )
        .unwrap();
        assert!(fills.is_empty());
    }

    #[test]
    fn single_declared_field_pulls_its_counterpart_default() {
        // Only limits.memory declared: requests.memory comes from the
        // request default, and CPU is filled entirely.
        let fills = normalize(0, &view(q("1G"), None, None, None), &defaults(), Strategy::PerField)
            .unwrap();

        assert_eq!(
            fill_values(&fills),
            vec![
                (ResourceKind::Memory, ResourceField::Request, "1G".to_string()),
                (ResourceKind::Cpu, ResourceField::Limit, "0.5".to_string()),
                (ResourceKind::Cpu, ResourceField::Request, "0.1".to_string()),
            ]
        );
    }

    #[test]
    fn declared_values_are_never_overwritten() {
        // Declared values differ from the defaults; none may be touched.
        let fills = normalize(
            0,
            &view(q("4G"), None, q("2"), q("1")),
            &defaults(),
            Strategy::PerField,
        )
        .unwrap();

        assert!(fills
            .iter()
            .all(|f| f.kind == ResourceKind::Memory && f.field == ResourceField::Request));
    }

    #[test]
    fn default_request_above_declared_limit_is_a_conflict() {
        // limits.cpu=0.05 declared, default requests.cpu=0.1 would exceed it.
        let err = normalize(
            3,
            &view(None, None, q("0.05"), None),
            &defaults(),
            Strategy::PerField,
        )
        .unwrap_err();

        match err {
            Error::ResourceConflict {
                container, kind, ..
            } => {
                assert_eq!(container, 3);
                assert_eq!(kind, ResourceKind::Cpu);
            }
            other => panic!("expected ResourceConflict, got {other}"),
        }
    }

    #[test]
    fn user_declared_inconsistent_pair_is_a_conflict() {
        // The invariant holds even when no fill is needed.
        let err = normalize(
            0,
            &view(q("1G"), q("2G"), None, None),
            &defaults(),
            Strategy::PerField,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::ResourceConflict {
                kind: ResourceKind::Memory,
                ..
            }
        ));
    }

    #[test]
    fn malformed_declared_values_pass_through() {
        // An unparseable limit cannot be compared; the container is neither
        // patched over nor denied for that kind.
        let fills = normalize(
            0,
            &view(
                Some(Quantity::lenient("huge")),
                q("2G"),
                q("1"),
                q("0.5"),
            ),
            &defaults(),
            Strategy::PerField,
        )
        .unwrap();
        assert!(fills.is_empty());
    }

    #[test]
    fn memory_conflict_reported_before_cpu() {
        let err = normalize(
            0,
            &view(q("1G"), q("2G"), q("0.1"), q("0.5")),
            &defaults(),
            Strategy::PerField,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::ResourceConflict {
                kind: ResourceKind::Memory,
                ..
            }
        ));
    }

    #[test]
    fn determinism_identical_inputs_identical_fills() {
        let resources = view(q("1G"), None, None, None);
        let a = normalize(0, &resources, &defaults(), Strategy::PerField).unwrap();
        let b = normalize(0, &resources, &defaults(), Strategy::PerField).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn idempotence_applying_fills_yields_empty_fills() {
        let resources = view(q("1G"), None, None, None);
        let fills = normalize(0, &resources, &defaults(), Strategy::PerField).unwrap();

        // Apply the fills to the container view and normalize again.
        let mut patched = resources.clone();
        for fill in fills {
            let spec = match fill.kind {
                ResourceKind::Memory => &mut patched.memory,
                ResourceKind::Cpu => &mut patched.cpu,
            };
            match fill.field {
                ResourceField::Limit => spec.limit = Some(fill.value),
                ResourceField::Request => spec.request = Some(fill.value),
            }
        }

        let again = normalize(0, &patched, &defaults(), Strategy::PerField).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn kind_complement_skips_partially_specified_kinds() {
        let fills = normalize(
            0,
            &view(q("1G"), None, None, None),
            &defaults(),
            Strategy::KindComplement,
        )
        .unwrap();

        // Memory is partially specified, so only CPU is filled.
        assert_eq!(
            fill_values(&fills),
            vec![
                (ResourceKind::Cpu, ResourceField::Limit, "0.5".to_string()),
                (ResourceKind::Cpu, ResourceField::Request, "0.1".to_string()),
            ]
        );
    }

    #[test]
    fn if_empty_only_fills_fully_empty_containers() {
        let untouched = normalize(
            0,
            &view(q("1G"), None, None, None),
            &defaults(),
            Strategy::IfEmpty,
        )
        .unwrap();
        assert!(untouched.is_empty());

        let filled = normalize(0, &view(None, None, None, None), &defaults(), Strategy::IfEmpty)
            .unwrap();
        assert_eq!(filled.len(), 4);
    }

    #[test]
    fn if_empty_still_validates_declared_pairs() {
        let err = normalize(
            0,
            &view(q("1G"), q("2G"), None, None),
            &defaults(),
            Strategy::IfEmpty,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ResourceConflict { .. }));
    }

    #[test]
    fn strategy_parses_from_flag_spelling() {
        assert_eq!("per-field".parse::<Strategy>().unwrap(), Strategy::PerField);
        assert_eq!(
            "kind-complement".parse::<Strategy>().unwrap(),
            Strategy::KindComplement
        );
        assert_eq!("if-empty".parse::<Strategy>().unwrap(), Strategy::IfEmpty);
        assert!("complement".parse::<Strategy>().is_err());
    }
}
