//! Calculation engine - part description in, priced breakdown out
//!
//! `compute` is a pure function of the input snapshot and the catalog:
//! validation, stock weights, cycle times, regional unit costs, cost
//! aggregation and the markup cascade, in that order.

use crate::catalog::Catalog;
use crate::costing::{self, MarkupCosts, Treatments, Weights};
use crate::eval::FormulaError;
use crate::geometry;
use crate::model::{MachiningInput, RawMaterialProcess};
use crate::region;
use crate::timing::{self, OperationTime, SetupTime, TimeTotals};
use crate::validator::{MissingDataWarning, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a calculation could not produce a result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error("invalid input: {}", describe(.errors))]
    InvalidInput { errors: Vec<ValidationError> },

    #[error("operation references unknown process '{name}'")]
    UnknownProcess { name: String },

    #[error("operation references unknown tool '{id}'")]
    UnknownTool { id: String },

    #[error("calculation '{id}' is final and cannot be changed")]
    Finalized { id: String },

    #[error("calculation '{id}' has no result to finalize")]
    NotComputed { id: String },
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ValidationError> for CalculationError {
    fn from(error: ValidationError) -> Self {
        CalculationError::InvalidInput {
            errors: vec![error],
        }
    }
}

impl CalculationError {
    /// Id of the offending entity, when there is one
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            CalculationError::InvalidInput { errors } => errors.iter().find_map(|e| e.entity_id()),
            CalculationError::UnknownProcess { name } => Some(name),
            CalculationError::UnknownTool { id }
            | CalculationError::Finalized { id }
            | CalculationError::NotComputed { id } => Some(id),
        }
    }
}

/// Priced breakdown for one part description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachiningResult {
    pub part_name: String,
    pub currency: Option<String>,
    pub batch_volume: f64,

    pub raw_weight_kg: f64,
    pub finished_weight_kg: f64,
    pub surface_area_m2: f64,

    pub material_cost_per_kg: f64,
    pub transport_cost_per_kg: f64,
    pub heat_treatment_cost_per_kg: f64,

    // Batch totals
    pub material_cost: f64,
    pub heat_treatment_cost: f64,
    pub surface_treatment_cost: f64,
    pub treatment_cost: f64,
    pub machine_cost: f64,
    pub tool_cost: f64,
    pub subtotal: f64,

    pub operations: Vec<OperationTime>,
    pub setups: Vec<SetupTime>,
    pub setup_machine_costs: Vec<f64>,
    pub operation_tool_costs: Vec<f64>,
    pub time: TimeTotals,

    pub markup_costs: MarkupCosts,
    pub total_cost: f64,
    pub cost_per_part: f64,
    /// Cost per part times the annual volume, when one was given
    pub annual_cost: Option<f64>,

    /// Formulas that failed to parse and counted as zero minutes
    pub formula_errors: Vec<FormulaError>,
    pub warnings: Vec<MissingDataWarning>,
}

/// Raw and finished weights plus stock surface for one part
pub fn resolve_weights(
    input: &MachiningInput,
    catalog: &Catalog,
    warnings: &mut Vec<MissingDataWarning>,
) -> Weights {
    let material = input.material_id.as_deref().and_then(|id| catalog.material(id));

    let mut geometric_kg = 0.0;
    let mut surface_area_m2 = 0.0;
    if let Some(shape) = input.billet_shape {
        // Only stock geometry needs a density
        let density = match material {
            Some(material) => material.density_g_cm3.unwrap_or_else(|| {
                warnings.push(MissingDataWarning::new(format!("material {}", material.id), "density_g_cm3"));
                0.0
            }),
            None => 0.0,
        };
        let params = geometry::to_millimeters(&input.shape_params, input.unit_system);
        geometric_kg = geometry::compute_raw_weight(shape, &params, density);
        surface_area_m2 = geometry::compute_surface_area(shape, &params);
    }

    let explicit_raw = input.raw_weight_kg;
    let raw_kg = match input.raw_material_process {
        RawMaterialProcess::Billet if geometric_kg > 0.0 => geometric_kg,
        _ => explicit_raw.unwrap_or_else(|| {
            warnings.push(MissingDataWarning::new(&input.part_name, "raw_weight_kg"));
            0.0
        }),
    };

    let finished_kg = input.finished_weight_kg.unwrap_or_else(|| {
        warnings.push(MissingDataWarning::new(&input.part_name, "finished_weight_kg"));
        0.0
    });

    Weights {
        raw_kg,
        finished_kg,
        surface_area_m2,
    }
}

/// Run the full calculation for one input snapshot
pub fn compute(input: &MachiningInput, catalog: &Catalog) -> Result<MachiningResult, CalculationError> {
    Validator::new(catalog)
        .validate_input(input)
        .map_err(|errors| CalculationError::InvalidInput { errors })?;

    let batch_volume = input.batch_volume;
    let mut warnings = Vec::new();

    let weights = resolve_weights(input, catalog, &mut warnings);

    let time = timing::aggregate(&input.setups, catalog, batch_volume)?;
    warnings.extend(time.warnings.iter().cloned());

    let (unit_costs, unit_warnings) = region::resolve_unit_costs(input, catalog, &time);
    warnings.extend(unit_warnings);

    let heat_treatment_per_kg = input.heat_treatment_cost_per_kg.unwrap_or_else(|| {
        warnings.push(MissingDataWarning::new(&input.part_name, "heat_treatment_cost_per_kg"));
        0.0
    });
    let treatments = Treatments {
        heat_treatment_per_kg,
        heat_treatment_basis: input.heat_treatment_basis,
        surface: &input.surface_treatments,
    };

    let costs = costing::compute(&weights, &time, &unit_costs, &treatments, &input.markups, batch_volume)?;
    warnings.extend(costs.warnings.iter().cloned());

    let annual_cost = input.annual_volume.map(|volume| costs.cost_per_part * volume);

    tracing::info!(
        part = %input.part_name,
        batch = batch_volume,
        total = costs.total_cost,
        per_part = costs.cost_per_part,
        formula_errors = time.formula_errors.len(),
        warnings = warnings.len(),
        "calculation complete"
    );

    Ok(MachiningResult {
        part_name: input.part_name.clone(),
        currency: region::resolve_currency(input, catalog),
        batch_volume,
        raw_weight_kg: weights.raw_kg,
        finished_weight_kg: weights.finished_kg,
        surface_area_m2: weights.surface_area_m2,
        material_cost_per_kg: unit_costs.material_per_kg,
        transport_cost_per_kg: unit_costs.transport_per_kg,
        heat_treatment_cost_per_kg: heat_treatment_per_kg,
        material_cost: costs.material_cost,
        heat_treatment_cost: costs.heat_treatment_cost,
        surface_treatment_cost: costs.surface_treatment_cost,
        treatment_cost: costs.treatment_cost,
        machine_cost: costs.machine_cost,
        tool_cost: costs.tool_cost,
        subtotal: costs.subtotal,
        operations: time.operations,
        setups: time.setups,
        setup_machine_costs: costs.setup_machine_costs,
        operation_tool_costs: costs.operation_tool_costs,
        time: time.totals,
        markup_costs: costs.markups,
        total_cost: costs.total_cost,
        cost_per_part: costs.cost_per_part,
        annual_cost,
        formula_errors: time.formula_errors,
        warnings,
    })
}
