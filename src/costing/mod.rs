//! Cost aggregation
//!
//! Combines material, treatment, machine and tool wear costs for the batch,
//! then runs the markup cascade. All amounts are batch totals in whatever
//! currency the unit costs were given in.

use crate::engine::CalculationError;
use crate::model::{Markups, SurfaceTreatment, TreatmentUnit, WeightBasis};
use crate::timing::TimeBreakdown;
use crate::validator::{check_batch_volume, MissingDataWarning};
use serde::{Deserialize, Serialize};

pub mod markup;

pub use markup::{apply_cascade, MarkupCosts, MarkupKind, CASCADE_ORDER};

/// Stock weights and surface for one part
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Weights {
    pub raw_kg: f64,
    pub finished_kg: f64,
    /// Outer stock surface in m², used by per-area treatments
    pub surface_area_m2: f64,
}

impl Weights {
    pub fn on(&self, basis: WeightBasis) -> f64 {
        match basis {
            WeightBasis::Raw => self.raw_kg,
            WeightBasis::Finished => self.finished_kg,
        }
    }
}

/// Purchase price and service life of the tool bound to an operation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolWear {
    pub price: f64,
    pub life_hours: f64,
}

impl ToolWear {
    /// Wear cost per cutting hour
    pub fn rate_per_hour(&self) -> f64 {
        if self.life_hours > 0.0 {
            self.price / self.life_hours
        } else {
            0.0
        }
    }
}

/// Concrete unit costs, already resolved for the region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitCosts {
    pub material_per_kg: f64,
    pub transport_per_kg: f64,
    /// Hourly rate per setup, aligned with `TimeBreakdown::setups`
    pub machine_rates: Vec<f64>,
    /// Tool wear per operation, aligned with `TimeBreakdown::operations`
    pub tool_wear: Vec<ToolWear>,
}

/// Heat and surface treatments applied to the part
#[derive(Debug, Clone, Copy)]
pub struct Treatments<'a> {
    pub heat_treatment_per_kg: f64,
    pub heat_treatment_basis: WeightBasis,
    pub surface: &'a [SurfaceTreatment],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Raw stock plus transport
    pub material_cost: f64,
    pub heat_treatment_cost: f64,
    pub surface_treatment_cost: f64,
    /// Heat plus surface treatment
    pub treatment_cost: f64,
    pub machine_cost: f64,
    pub tool_cost: f64,
    /// Machine cost per setup
    pub setup_machine_costs: Vec<f64>,
    /// Tool wear cost per operation
    pub operation_tool_costs: Vec<f64>,
    pub subtotal: f64,
    pub markups: MarkupCosts,
    pub total_cost: f64,
    pub cost_per_part: f64,
    pub warnings: Vec<MissingDataWarning>,
}

/// Combine every cost for the batch and apply the markup cascade
pub fn compute(
    weights: &Weights,
    time: &TimeBreakdown,
    unit_costs: &UnitCosts,
    treatments: &Treatments<'_>,
    markups: &Markups,
    batch_volume: f64,
) -> Result<CostBreakdown, CalculationError> {
    check_batch_volume(batch_volume)?;

    let mut breakdown = CostBreakdown::default();

    breakdown.material_cost =
        weights.raw_kg * (unit_costs.material_per_kg + unit_costs.transport_per_kg) * batch_volume;

    breakdown.heat_treatment_cost = treatments.heat_treatment_per_kg
        * weights.on(treatments.heat_treatment_basis)
        * batch_volume;

    for treatment in treatments.surface {
        let cost = treatment.cost.unwrap_or_else(|| {
            breakdown.warnings.push(MissingDataWarning::new(
                format!("surface treatment {}", treatment.name),
                "cost",
            ));
            0.0
        });
        let per_part = match treatment.unit {
            TreatmentUnit::PerKg => cost * weights.on(treatment.basis),
            TreatmentUnit::PerArea => cost * treatment.area_m2.unwrap_or(weights.surface_area_m2),
        };
        breakdown.surface_treatment_cost += per_part * batch_volume;
    }
    breakdown.treatment_cost = breakdown.heat_treatment_cost + breakdown.surface_treatment_cost;

    for (i, setup) in time.setups.iter().enumerate() {
        let rate = unit_costs.machine_rates.get(i).copied().unwrap_or(0.0);
        let cost = setup.total_min / 60.0 * rate * batch_volume;
        breakdown.setup_machine_costs.push(cost);
        breakdown.machine_cost += cost;
    }

    for (i, operation) in time.operations.iter().enumerate() {
        let wear = unit_costs.tool_wear.get(i).copied().unwrap_or_default();
        let cost = wear.rate_per_hour() * operation.cycle_time_min / 60.0 * batch_volume;
        breakdown.operation_tool_costs.push(cost);
        breakdown.tool_cost += cost;
    }

    breakdown.subtotal = breakdown.material_cost
        + breakdown.treatment_cost
        + breakdown.machine_cost
        + breakdown.tool_cost;

    let (markup_costs, total) = apply_cascade(breakdown.subtotal, markups);
    breakdown.markups = markup_costs;
    breakdown.total_cost = total;
    breakdown.cost_per_part = total / batch_volume;

    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{OperationTime, SetupTime, TimeTotals};
    use pretty_assertions::assert_eq;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    fn time() -> TimeBreakdown {
        TimeBreakdown {
            operations: vec![OperationTime {
                setup_index: 0,
                operation_index: 0,
                process_id: "P1".to_string(),
                process_name: "Milling".to_string(),
                tool_id: Some("T1".to_string()),
                formula_min: 12.0,
                cycle_time_min: 12.0,
                tool_change_min: 0.5,
                formula_failed: false,
            }],
            setups: vec![SetupTime {
                setup_index: 0,
                name: "Setup 1".to_string(),
                machine_id: Some("VMC3".to_string()),
                cutting_min: 12.0,
                tool_change_min: 0.5,
                setup_min: 5.5,
                total_min: 18.0,
            }],
            totals: TimeTotals {
                cutting_min: 12.0,
                tool_change_min: 0.5,
                setup_min: 5.5,
                total_per_part_min: 18.0,
                batch_hours: 3.0,
            },
            ..TimeBreakdown::default()
        }
    }

    fn unit_costs() -> UnitCosts {
        UnitCosts {
            material_per_kg: 4.0,
            transport_per_kg: 1.0,
            machine_rates: vec![60.0],
            tool_wear: vec![ToolWear {
                price: 50.0,
                life_hours: 10.0,
            }],
        }
    }

    fn weights() -> Weights {
        Weights {
            raw_kg: 2.0,
            finished_kg: 1.5,
            surface_area_m2: 0.1,
        }
    }

    fn no_treatments() -> Treatments<'static> {
        Treatments {
            heat_treatment_per_kg: 0.0,
            heat_treatment_basis: WeightBasis::Finished,
            surface: &[],
        }
    }

    #[test]
    fn test_cost_components() {
        let breakdown = compute(&weights(), &time(), &unit_costs(), &no_treatments(), &Markups::default(), 10.0).unwrap();

        // 2 kg * (4 + 1) * 10 parts
        assert_eq!(breakdown.material_cost, 100.0);
        // 18 min/part = 0.3 h * 60/h * 10 parts
        assert!(close(breakdown.machine_cost, 180.0));
        // 50/10 per hour * 0.2 h * 10 parts
        assert!(close(breakdown.tool_cost, 10.0));
        assert!(close(breakdown.subtotal, 290.0));
        assert_eq!(breakdown.total_cost, breakdown.subtotal);
        assert!(close(breakdown.cost_per_part, 29.0));
        assert_eq!(breakdown.setup_machine_costs.len(), 1);
        assert_eq!(breakdown.operation_tool_costs.len(), 1);
    }

    #[test]
    fn test_treatments() {
        let surface = vec![
            SurfaceTreatment {
                name: "Anodize".to_string(),
                cost: Some(20.0),
                unit: TreatmentUnit::PerArea,
                basis: WeightBasis::Finished,
                area_m2: None,
            },
            SurfaceTreatment {
                name: "Passivate".to_string(),
                cost: Some(2.0),
                unit: TreatmentUnit::PerKg,
                basis: WeightBasis::Raw,
                area_m2: None,
            },
            SurfaceTreatment {
                name: "Paint".to_string(),
                cost: Some(10.0),
                unit: TreatmentUnit::PerArea,
                basis: WeightBasis::Finished,
                area_m2: Some(0.05),
            },
            SurfaceTreatment {
                name: "Mystery".to_string(),
                cost: None,
                unit: TreatmentUnit::PerKg,
                basis: WeightBasis::Finished,
                area_m2: None,
            },
        ];
        let treatments = Treatments {
            heat_treatment_per_kg: 3.0,
            heat_treatment_basis: WeightBasis::Finished,
            surface: &surface,
        };

        let breakdown = compute(&weights(), &time(), &unit_costs(), &treatments, &Markups::default(), 2.0).unwrap();

        // 3/kg * 1.5 kg * 2 parts
        assert!(close(breakdown.heat_treatment_cost, 9.0));
        // (20 * 0.1 + 2 * 2.0 + 10 * 0.05 + 0) * 2 parts
        assert!(close(breakdown.surface_treatment_cost, 13.0));
        assert!(close(breakdown.treatment_cost, 22.0));
        assert_eq!(breakdown.warnings.len(), 1);
        assert_eq!(breakdown.warnings[0].field, "cost");
    }

    #[test]
    fn test_missing_rates_are_zero() {
        let costs = UnitCosts::default();
        let breakdown = compute(&weights(), &time(), &costs, &no_treatments(), &Markups::default(), 1.0).unwrap();
        assert_eq!(breakdown.machine_cost, 0.0);
        assert_eq!(breakdown.tool_cost, 0.0);
        assert_eq!(breakdown.material_cost, 0.0);
    }

    #[test]
    fn test_tool_without_life_costs_nothing() {
        let wear = ToolWear {
            price: 80.0,
            life_hours: 0.0,
        };
        assert_eq!(wear.rate_per_hour(), 0.0);
    }

    #[test]
    fn test_markups_applied_to_subtotal() {
        let markups = Markups {
            profit: 20.0,
            ..Markups::default()
        };
        let breakdown = compute(&weights(), &time(), &unit_costs(), &no_treatments(), &markups, 10.0).unwrap();
        assert!(close(breakdown.total_cost, breakdown.subtotal * 1.20));
        assert!(close(breakdown.markups.profit, breakdown.subtotal * 0.20));
    }

    #[test]
    fn test_amortization_law() {
        for batch in [1.0, 3.0, 7.0, 100.0, 12_345.0] {
            let breakdown = compute(&weights(), &time(), &unit_costs(), &no_treatments(), &Markups::default(), batch).unwrap();
            assert!(close(breakdown.cost_per_part * batch, breakdown.total_cost));
        }
    }

    #[test]
    fn test_rejects_non_positive_batch() {
        assert!(compute(&weights(), &time(), &unit_costs(), &no_treatments(), &Markups::default(), 0.0).is_err());
    }
}
