//! Cycle-time aggregation across setups and operations
//!
//! Cutting and tool-change times are per-part durations. Setup time is a
//! one-off per batch and is amortized over the batch volume.

use crate::catalog::{Catalog, Process};
use crate::engine::CalculationError;
use crate::eval::{Formula, FormulaError};
use crate::model::Setup;
use crate::params::{self, IMPLICIT_NAMES};
use crate::validator::{check_batch_volume, MissingDataWarning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest efficiency a setup is divided by
pub const MIN_EFFICIENCY: f64 = 1e-6;

/// Time for one operation, per part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationTime {
    pub setup_index: usize,
    pub operation_index: usize,
    pub process_id: String,
    pub process_name: String,
    pub tool_id: Option<String>,
    /// Raw formula result in minutes
    pub formula_min: f64,
    /// Formula minutes divided by the setup's efficiency
    pub cycle_time_min: f64,
    pub tool_change_min: f64,
    /// The process formula did not parse and contributed zero
    pub formula_failed: bool,
}

/// Per-part time for one setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupTime {
    pub setup_index: usize,
    pub name: String,
    pub machine_id: Option<String>,
    pub cutting_min: f64,
    pub tool_change_min: f64,
    /// Setup time amortized per part
    pub setup_min: f64,
    pub total_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeTotals {
    pub cutting_min: f64,
    pub tool_change_min: f64,
    pub setup_min: f64,
    pub total_per_part_min: f64,
    /// Machine hours for the whole batch
    pub batch_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeBreakdown {
    /// Setup then operation declaration order
    pub operations: Vec<OperationTime>,
    pub setups: Vec<SetupTime>,
    pub totals: TimeTotals,
    pub formula_errors: Vec<FormulaError>,
    pub warnings: Vec<MissingDataWarning>,
}

/// Compile each process formula once, remembering failures. Keyed by
/// process name, the catalog's lookup key.
struct FormulaCache {
    compiled: BTreeMap<String, Option<Formula>>,
}

impl FormulaCache {
    fn new() -> Self {
        Self {
            compiled: BTreeMap::new(),
        }
    }

    fn get(&mut self, process: &Process, errors: &mut Vec<FormulaError>) -> Option<&Formula> {
        self.compiled
            .entry(process.name.clone())
            .or_insert_with(|| match Formula::parse(&process.formula) {
                Ok(formula) => Some(formula),
                Err(e) => {
                    let error = FormulaError::new(&process.id, &process.formula, &e);
                    tracing::warn!(process = %process.id, error = %e, "formula rejected, operation counts as 0 minutes");
                    errors.push(error);
                    None
                }
            })
            .as_ref()
    }
}

/// Evaluate every operation of every setup and total the times
pub fn aggregate(
    setups: &[Setup],
    catalog: &Catalog,
    batch_volume: f64,
) -> Result<TimeBreakdown, CalculationError> {
    check_batch_volume(batch_volume)?;

    let mut breakdown = TimeBreakdown::default();
    let mut formulas = FormulaCache::new();

    for (s, setup) in setups.iter().enumerate() {
        let label = setup.label(s);
        let efficiency = setup.efficiency.max(MIN_EFFICIENCY);

        let tool_change_sec = setup.tool_change_time_sec.unwrap_or_else(|| {
            if !setup.operations.is_empty() {
                breakdown
                    .warnings
                    .push(MissingDataWarning::new(&label, "tool_change_time_sec"));
            }
            0.0
        });
        let setup_total_min = setup.time_per_setup_min.unwrap_or_else(|| {
            breakdown
                .warnings
                .push(MissingDataWarning::new(&label, "time_per_setup_min"));
            0.0
        });

        let mut cutting_min = 0.0;
        let mut tool_change_min = 0.0;

        for (o, operation) in setup.operations.iter().enumerate() {
            let process = catalog.process(&operation.process).ok_or_else(|| {
                CalculationError::UnknownProcess {
                    name: operation.process.clone(),
                }
            })?;
            let tool = match &operation.tool_id {
                Some(id) => Some(
                    catalog
                        .tool(id)
                        .ok_or_else(|| CalculationError::UnknownTool { id: id.clone() })?,
                ),
                None => None,
            };

            let entity = format!("{} / {} #{}", label, process.name, o + 1);
            let resolution = params::resolve_detailed(operation, process, tool);
            for name in &resolution.missing {
                breakdown
                    .warnings
                    .push(MissingDataWarning::new(&entity, name));
            }
            if !resolution.ignored.is_empty() {
                tracing::debug!(operation = %entity, ignored = ?resolution.ignored, "undeclared parameters dropped");
            }
            if !resolution.shadowed.is_empty() {
                tracing::debug!(operation = %entity, shadowed = ?resolution.shadowed, "declared parameters override tool values");
            }

            let (formula_min, formula_failed) =
                match formulas.get(process, &mut breakdown.formula_errors) {
                    Some(formula) => {
                        // Declared names shadow the tool, so only the rest need one
                        let reads_tool = formula.variables().iter().any(|name| {
                            IMPLICIT_NAMES.contains(name)
                                && !resolution.shadowed.iter().any(|s| s == name)
                        });
                        if reads_tool && tool.is_none() {
                            breakdown
                                .warnings
                                .push(MissingDataWarning::new(&entity, "tool_id"));
                        }
                        (formula.evaluate(&resolution.env), false)
                    }
                    None => (0.0, true),
                };

            let cycle_time_min = formula_min / efficiency;
            let mut op_tool_change_min = tool_change_sec / 60.0;
            if operation.shared_tool_change {
                op_tool_change_min /= batch_volume;
            }

            cutting_min += cycle_time_min;
            tool_change_min += op_tool_change_min;

            breakdown.operations.push(OperationTime {
                setup_index: s,
                operation_index: o,
                process_id: process.id.clone(),
                process_name: process.name.clone(),
                tool_id: operation.tool_id.clone(),
                formula_min,
                cycle_time_min,
                tool_change_min: op_tool_change_min,
                formula_failed,
            });
        }

        let setup_min = setup_total_min / batch_volume;
        breakdown.setups.push(SetupTime {
            setup_index: s,
            name: label,
            machine_id: setup.machine_id.clone(),
            cutting_min,
            tool_change_min,
            setup_min,
            total_min: cutting_min + tool_change_min + setup_min,
        });
    }

    let totals = &mut breakdown.totals;
    for setup in &breakdown.setups {
        totals.cutting_min += setup.cutting_min;
        totals.tool_change_min += setup.tool_change_min;
        totals.setup_min += setup.setup_min;
    }
    totals.total_per_part_min = totals.cutting_min + totals.tool_change_min + totals.setup_min;
    totals.batch_hours = totals.total_per_part_min * batch_volume / 60.0;

    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProcessParameter, Tool, ToolType};
    use crate::model::Operation;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog {
            tools: vec![Tool {
                id: "T10".to_string(),
                name: "10mm".to_string(),
                tool_type: ToolType::EndMill,
                diameter: Some(10.0),
                teeth: Some(4),
                cutting_speed: None,
                feed_per_tooth: Some(0.05),
                price: Some(50.0),
                life_hours: Some(10.0),
            }],
            processes: vec![
                Process {
                    id: "P-FIXED".to_string(),
                    name: "Fixed".to_string(),
                    parameters: vec![ProcessParameter {
                        name: "minutes".to_string(),
                        unit: "min".to_string(),
                    }],
                    formula: "minutes".to_string(),
                },
                Process {
                    id: "P-FEED".to_string(),
                    name: "Feed".to_string(),
                    parameters: vec![ProcessParameter {
                        name: "machiningLength".to_string(),
                        unit: "mm".to_string(),
                    }],
                    formula: "(machiningLength + toolDiameter) / feedRate".to_string(),
                },
                Process {
                    id: "P-BROKEN".to_string(),
                    name: "Broken".to_string(),
                    parameters: vec![],
                    formula: "(1 +".to_string(),
                },
            ],
            ..Catalog::default()
        }
    }

    fn op(process: &str, tool: Option<&str>, values: &[(&str, f64)]) -> Operation {
        Operation {
            process: process.to_string(),
            tool_id: tool.map(str::to_string),
            parameters: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            shared_tool_change: false,
        }
    }

    fn setup(operations: Vec<Operation>, setup_min: f64, change_sec: f64, efficiency: f64) -> Setup {
        Setup {
            name: None,
            operations,
            time_per_setup_min: Some(setup_min),
            tool_change_time_sec: Some(change_sec),
            efficiency,
            machine_id: None,
        }
    }

    #[test]
    fn test_amortization_rules() {
        let setups = vec![
            setup(
                vec![
                    op("Fixed", None, &[("minutes", 4.0)]),
                    op("Fixed", None, &[("minutes", 2.0)]),
                ],
                60.0,
                30.0,
                0.5,
            ),
            setup(vec![op("Fixed", None, &[("minutes", 1.0)])], 20.0, 60.0, 1.0),
        ];

        let breakdown = aggregate(&setups, &catalog(), 10.0).unwrap();

        // Cutting: (4 + 2) / 0.5 + 1 = 13 per part, not divided by batch
        assert_eq!(breakdown.totals.cutting_min, 13.0);
        // Tool change: 3 operations, 0.5 + 0.5 + 1.0 min per part
        assert_eq!(breakdown.totals.tool_change_min, 2.0);
        // Setup: (60 + 20) / 10 per part
        assert_eq!(breakdown.totals.setup_min, 8.0);
        assert_eq!(breakdown.totals.total_per_part_min, 23.0);
        assert!((breakdown.totals.batch_hours - 23.0 * 10.0 / 60.0).abs() < 1e-12);

        assert_eq!(breakdown.setups[0].cutting_min, 12.0);
        assert_eq!(breakdown.setups[0].setup_min, 6.0);
        assert_eq!(breakdown.setups[1].total_min, 1.0 + 1.0 + 2.0);
        assert!(breakdown.formula_errors.is_empty());
    }

    #[test]
    fn test_shared_tool_change_amortizes_over_batch() {
        let mut shared = op("Fixed", None, &[("minutes", 1.0)]);
        shared.shared_tool_change = true;
        let setups = vec![setup(vec![shared], 0.0, 120.0, 1.0)];

        let breakdown = aggregate(&setups, &catalog(), 4.0).unwrap();
        assert_eq!(breakdown.operations[0].tool_change_min, 0.5);
    }

    #[test]
    fn test_zero_feed_rate_contributes_zero() {
        let setups = vec![setup(
            vec![op("Feed", Some("T10"), &[("machiningLength", 100.0)])],
            0.0,
            0.0,
            1.0,
        )];

        let breakdown = aggregate(&setups, &catalog(), 1.0).unwrap();
        let row = &breakdown.operations[0];
        assert_eq!(row.formula_min, 0.0);
        assert_eq!(row.cycle_time_min, 0.0);
        assert!(!row.formula_failed);
    }

    #[test]
    fn test_bad_formula_is_absorbed() {
        let setups = vec![setup(
            vec![
                op("Broken", None, &[]),
                op("Fixed", None, &[("minutes", 3.0)]),
                op("Broken", None, &[]),
            ],
            0.0,
            0.0,
            1.0,
        )];

        let breakdown = aggregate(&setups, &catalog(), 5.0).unwrap();
        assert_eq!(breakdown.totals.cutting_min, 3.0);
        assert!(breakdown.operations[0].formula_failed);
        assert!(breakdown.operations[2].formula_failed);
        // Reported once per process
        assert_eq!(breakdown.formula_errors.len(), 1);
        assert_eq!(breakdown.formula_errors[0].process_id, "P-BROKEN");
    }

    #[test]
    fn test_order_is_preserved() {
        let setups = vec![
            setup(
                vec![op("Fixed", None, &[("minutes", 1.0)]), op("Feed", Some("T10"), &[])],
                0.0,
                0.0,
                1.0,
            ),
            setup(vec![op("Broken", None, &[])], 0.0, 0.0, 1.0),
        ];

        let breakdown = aggregate(&setups, &catalog(), 1.0).unwrap();
        let order: Vec<(usize, usize, &str)> = breakdown
            .operations
            .iter()
            .map(|o| (o.setup_index, o.operation_index, o.process_id.as_str()))
            .collect();
        assert_eq!(order, vec![(0, 0, "P-FIXED"), (0, 1, "P-FEED"), (1, 0, "P-BROKEN")]);
    }

    #[test]
    fn test_zero_efficiency_is_clamped() {
        let setups = vec![setup(vec![op("Fixed", None, &[("minutes", 1.0)])], 0.0, 0.0, 0.0)];
        let breakdown = aggregate(&setups, &catalog(), 1.0).unwrap();
        assert!(breakdown.totals.cutting_min.is_finite());
    }

    #[test]
    fn test_structural_errors() {
        let setups = vec![setup(vec![op("Fixed", None, &[])], 0.0, 0.0, 1.0)];
        assert!(matches!(
            aggregate(&setups, &catalog(), 0.0),
            Err(CalculationError::InvalidInput { .. })
        ));

        let unknown_process = vec![setup(vec![op("Grinding", None, &[])], 0.0, 0.0, 1.0)];
        assert_eq!(
            aggregate(&unknown_process, &catalog(), 1.0).unwrap_err(),
            CalculationError::UnknownProcess {
                name: "Grinding".to_string()
            }
        );

        let unknown_tool = vec![setup(vec![op("Fixed", Some("T99"), &[])], 0.0, 0.0, 1.0)];
        assert_eq!(
            aggregate(&unknown_tool, &catalog(), 1.0).unwrap_err(),
            CalculationError::UnknownTool {
                id: "T99".to_string()
            }
        );
    }

    #[test]
    fn test_formulas_follow_process_name() {
        // Same id, different processes: each must run its own formula
        let catalog = Catalog {
            processes: vec![
                Process {
                    id: "P1".to_string(),
                    name: "Roughing".to_string(),
                    parameters: vec![],
                    formula: "10".to_string(),
                },
                Process {
                    id: "P1".to_string(),
                    name: "Finishing".to_string(),
                    parameters: vec![],
                    formula: "1".to_string(),
                },
            ],
            ..Catalog::default()
        };
        let setups = vec![setup(
            vec![op("Roughing", None, &[]), op("Finishing", None, &[])],
            0.0,
            0.0,
            1.0,
        )];

        let breakdown = aggregate(&setups, &catalog, 1.0).unwrap();
        assert_eq!(breakdown.operations[0].formula_min, 10.0);
        assert_eq!(breakdown.operations[1].formula_min, 1.0);
    }

    #[test]
    fn test_declared_feed_needs_no_tool() {
        let catalog = Catalog {
            processes: vec![Process {
                id: "P-MANUAL-FEED".to_string(),
                name: "Manual Feed".to_string(),
                parameters: vec![
                    ProcessParameter {
                        name: "machiningLength".to_string(),
                        unit: "mm".to_string(),
                    },
                    ProcessParameter {
                        name: "feedRate".to_string(),
                        unit: "mm/min".to_string(),
                    },
                ],
                formula: "machiningLength / feedRate".to_string(),
            }],
            ..Catalog::default()
        };
        let setups = vec![setup(
            vec![op("Manual Feed", None, &[("machiningLength", 300.0), ("feedRate", 150.0)])],
            0.0,
            0.0,
            1.0,
        )];

        let breakdown = aggregate(&setups, &catalog, 1.0).unwrap();
        assert_eq!(breakdown.operations[0].formula_min, 2.0);
        assert!(breakdown.warnings.is_empty(), "{:?}", breakdown.warnings);
    }

    #[test]
    fn test_missing_data_is_observable() {
        let mut bare = setup(vec![op("Feed", None, &[])], 0.0, 0.0, 1.0);
        bare.time_per_setup_min = None;
        let breakdown = aggregate(&[bare], &catalog(), 1.0).unwrap();

        let fields: Vec<&str> = breakdown.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(fields, vec!["time_per_setup_min", "machiningLength", "tool_id"]);
    }
}
