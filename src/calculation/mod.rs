//! Calculation lifecycle - a draft that can be edited and recomputed until
//! it is finalized

use crate::catalog::Catalog;
use crate::engine::{self, CalculationError, MachiningResult};
use crate::model::MachiningInput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationStatus {
    #[default]
    Draft,
    Final,
}

/// One quote: an input snapshot and the result last computed from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    id: String,
    input: MachiningInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<MachiningResult>,
    #[serde(default)]
    status: CalculationStatus,
}

impl Calculation {
    pub fn new(id: impl Into<String>, input: MachiningInput) -> Self {
        Self {
            id: id.into(),
            input,
            result: None,
            status: CalculationStatus::Draft,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input(&self) -> &MachiningInput {
        &self.input
    }

    pub fn status(&self) -> CalculationStatus {
        self.status
    }

    /// Result of the last successful computation on the current input
    pub fn result(&self) -> Option<&MachiningResult> {
        self.result.as_ref()
    }

    fn ensure_draft(&self) -> Result<(), CalculationError> {
        match self.status {
            CalculationStatus::Draft => Ok(()),
            CalculationStatus::Final => Err(CalculationError::Finalized {
                id: self.id.clone(),
            }),
        }
    }

    /// Replace the input; any stored result is stale and dropped
    pub fn update_input(&mut self, input: MachiningInput) -> Result<(), CalculationError> {
        self.ensure_draft()?;
        self.input = input;
        self.result = None;
        Ok(())
    }

    /// Compute from the current input. On failure no result is kept, so a
    /// failed calculation never looks like one that computed to zero.
    pub fn recompute(&mut self, catalog: &Catalog) -> Result<&MachiningResult, CalculationError> {
        self.ensure_draft()?;
        self.result = None;
        let result = engine::compute(&self.input, catalog)?;
        Ok(&*self.result.insert(result))
    }

    /// Freeze the calculation; requires a computed result
    pub fn finalize(&mut self) -> Result<&MachiningResult, CalculationError> {
        self.ensure_draft()?;
        match self.result {
            Some(ref result) => {
                self.status = CalculationStatus::Final;
                tracing::info!(id = %self.id, total = result.total_cost, "calculation finalized");
                Ok(result)
            }
            None => Err(CalculationError::NotComputed {
                id: self.id.clone(),
            }),
        }
    }
}
