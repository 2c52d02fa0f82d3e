//! Structural checks on a part description before any arithmetic runs
//!
//! Violations here abort the calculation. Absent optional numbers are not
//! violations; they surface as [`MissingDataWarning`]s from the stages that
//! default them.

use crate::catalog::Catalog;
use crate::model::MachiningInput;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("batch volume must be positive, got {value}")]
    BatchVolume { value: f64 },

    #[error("setup {setup}: efficiency must be in (0, 1], got {value}")]
    Efficiency { setup: usize, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: f64 },

    #[error("unknown material '{id}'")]
    UnknownMaterial { id: String },

    #[error("setup {setup}: unknown machine '{id}'")]
    UnknownMachine { setup: usize, id: String },

    #[error("setup {setup}, operation {operation}: unknown process '{name}'")]
    UnknownProcess {
        setup: usize,
        operation: usize,
        name: String,
    },

    #[error("setup {setup}, operation {operation}: unknown tool '{id}'")]
    UnknownTool {
        setup: usize,
        operation: usize,
        id: String,
    },
}

impl ValidationError {
    /// Id or name of the offending catalog entity, if the error is about one
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ValidationError::UnknownMaterial { id }
            | ValidationError::UnknownMachine { id, .. }
            | ValidationError::UnknownTool { id, .. } => Some(id),
            ValidationError::UnknownProcess { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::BatchVolume { .. } => "INVALID_BATCH_VOLUME",
            ValidationError::Efficiency { .. } => "INVALID_EFFICIENCY",
            ValidationError::Negative { .. } => "NEGATIVE_VALUE",
            ValidationError::UnknownMaterial { .. } => "UNKNOWN_MATERIAL",
            ValidationError::UnknownMachine { .. } => "UNKNOWN_MACHINE",
            ValidationError::UnknownProcess { .. } => "UNKNOWN_PROCESS",
            ValidationError::UnknownTool { .. } => "UNKNOWN_TOOL",
        }
    }
}

/// An optional number that was absent and read as zero
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{entity}: {field} not set, using 0")]
pub struct MissingDataWarning {
    pub entity: String,
    pub field: String,
}

impl MissingDataWarning {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let warning = Self {
            entity: entity.into(),
            field: field.into(),
        };
        tracing::debug!(entity = %warning.entity, field = %warning.field, "missing data defaulted to 0");
        warning
    }
}

pub fn check_batch_volume(batch_volume: f64) -> Result<(), ValidationError> {
    if batch_volume.is_finite() && batch_volume > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::BatchVolume {
            value: batch_volume,
        })
    }
}

pub struct Validator<'a> {
    catalog: &'a Catalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Check every structural invariant, collecting all violations
    pub fn validate_input(&self, input: &MachiningInput) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = check_batch_volume(input.batch_volume) {
            errors.push(e);
        }

        let non_negative = [
            ("raw_weight_kg", input.raw_weight_kg),
            ("finished_weight_kg", input.finished_weight_kg),
        ];
        for (field, value) in non_negative {
            if let Some(value) = value.filter(|v| *v < 0.0) {
                errors.push(ValidationError::Negative {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if let Some(id) = &input.material_id {
            if self.catalog.material(id).is_none() {
                errors.push(ValidationError::UnknownMaterial { id: id.clone() });
            }
        }

        for (s, setup) in input.setups.iter().enumerate() {
            let efficiency = setup.efficiency;
            if !(efficiency.is_finite() && efficiency > 0.0 && efficiency <= 1.0) {
                errors.push(ValidationError::Efficiency {
                    setup: s,
                    value: efficiency,
                });
            }

            let times = [
                ("time_per_setup_min", setup.time_per_setup_min),
                ("tool_change_time_sec", setup.tool_change_time_sec),
            ];
            for (field, value) in times {
                if let Some(value) = value.filter(|v| *v < 0.0) {
                    errors.push(ValidationError::Negative {
                        field: format!("setups[{}].{}", s, field),
                        value,
                    });
                }
            }

            if let Some(id) = &setup.machine_id {
                if self.catalog.machine(id).is_none() {
                    errors.push(ValidationError::UnknownMachine {
                        setup: s,
                        id: id.clone(),
                    });
                }
            }

            for (o, operation) in setup.operations.iter().enumerate() {
                if self.catalog.process(&operation.process).is_none() {
                    errors.push(ValidationError::UnknownProcess {
                        setup: s,
                        operation: o,
                        name: operation.process.clone(),
                    });
                }
                if let Some(id) = &operation.tool_id {
                    if self.catalog.tool(id).is_none() {
                        errors.push(ValidationError::UnknownTool {
                            setup: s,
                            operation: o,
                            id: id.clone(),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
