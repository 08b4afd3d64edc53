use crate::config::{ScenarioConfig, ScenarioConfigError};
use crate::{compute, database, file, memory, network};
use concbench_core::{Output, UnitFailure, Workload, WorkloadKind, WorkloadUnit};

/// The default workload: one deterministic simulation per [`WorkloadKind`]
///
/// Invocations share no mutable state. Inside a pipeline the upstream value's
/// digest is folded into the result, so the final link depends on every link
/// before it.
#[derive(Debug, Clone, Default)]
pub struct ScenarioWorkload {
    config: ScenarioConfig,
}

impl ScenarioWorkload {
    /// Workload with custom cost settings
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Cost settings in use
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn simulate(&self, unit: &WorkloadUnit) -> Output {
        let config = &self.config;
        match unit.kind {
            WorkloadKind::Database => Output::Record {
                id: unit.id,
                value: database::simulate_query(unit.id, config),
            },
            WorkloadKind::Network => Output::Text(network::call_with_retry(unit.id, config)),
            WorkloadKind::Compute => Output::Number(compute::heavy_calculation(
                unit.id.saturating_mul(config.compute_scale),
            )),
            WorkloadKind::MemoryTransform => {
                Output::Numbers(memory::transform_dataset(config.dataset_size))
            }
            WorkloadKind::FileIo => Output::Tally(file::process(unit.id, config)),
        }
    }
}

impl Workload for ScenarioWorkload {
    fn invoke(
        &self,
        unit: &WorkloadUnit,
        upstream: Option<&Output>,
    ) -> Result<Output, UnitFailure> {
        let value = self.simulate(unit);
        Ok(match upstream {
            Some(previous) => value.linked(previous),
            None => value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_produces_its_shape() {
        let workload = ScenarioWorkload::default();
        for kind in WorkloadKind::ALL {
            let value = workload.invoke(&WorkloadUnit::new(4, kind), None).unwrap();
            let shape_matches = match kind {
                WorkloadKind::Database => matches!(value, Output::Record { id: 4, .. }),
                WorkloadKind::Network => matches!(value, Output::Text(_)),
                WorkloadKind::Compute => matches!(value, Output::Number(_)),
                WorkloadKind::MemoryTransform => matches!(value, Output::Numbers(_)),
                WorkloadKind::FileIo => matches!(value, Output::Tally(_)),
            };
            assert!(shape_matches, "{kind}: {value:?}");
        }
    }

    #[test]
    fn test_idempotent() {
        let workload = ScenarioWorkload::default();
        for kind in WorkloadKind::ALL {
            let unit = WorkloadUnit::new(7, kind);
            assert_eq!(
                workload.invoke(&unit, None).unwrap(),
                workload.invoke(&unit, None).unwrap()
            );
        }
    }

    #[test]
    fn test_upstream_is_folded_in() {
        let workload = ScenarioWorkload::default();
        let unit = WorkloadUnit::new(1, WorkloadKind::Compute);
        let upstream = Output::Number(99);

        let linked = workload.invoke(&unit, Some(&upstream)).unwrap();
        match linked {
            Output::Linked { upstream: digest, value } => {
                assert_eq!(digest, upstream.digest());
                assert_eq!(*value, workload.invoke(&unit, None).unwrap());
            }
            other => panic!("expected a linked value, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ScenarioConfig {
            max_attempts: 0,
            ..ScenarioConfig::default()
        };
        assert!(ScenarioWorkload::new(config).is_err());
    }
}
