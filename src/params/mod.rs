//! Parameter resolution - builds the variable environment for one operation
//!
//! Explicit operation values are filtered through the process's declared
//! parameter list, then the tool-derived implicit values are added.

use crate::catalog::{Process, Tool};
use crate::eval::Environment;
use crate::model::Operation;
use std::f64::consts::PI;

pub const TOOL_DIAMETER: &str = "toolDiameter";
pub const SPINDLE_SPEED: &str = "spindleSpeed";
pub const FEED_RATE: &str = "feedRate";

/// Implicit names, in the order they are added
pub const IMPLICIT_NAMES: [&str; 3] = [TOOL_DIAMETER, SPINDLE_SPEED, FEED_RATE];

/// Cutting data derived from a tool
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToolKinematics {
    pub tool_diameter: f64, // mm
    pub spindle_speed: f64, // rpm
    pub feed_rate: f64,     // mm/min
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl ToolKinematics {
    /// n = 1000·Vc / (π·D), vf = n · z · fz
    pub fn from_tool(tool: Option<&Tool>) -> Self {
        let Some(tool) = tool else {
            return Self::default();
        };
        let Some(diameter) = positive(tool.diameter) else {
            return Self::default();
        };

        let spindle_speed = positive(tool.cutting_speed)
            .map(|vc| 1000.0 * vc / (PI * diameter))
            .unwrap_or(0.0);

        let teeth = tool.teeth.map(f64::from);
        let feed_rate = match (positive(teeth), positive(tool.feed_per_tooth)) {
            (Some(z), Some(fz)) => spindle_speed * z * fz,
            _ => 0.0,
        };

        Self {
            tool_diameter: diameter,
            spindle_speed,
            feed_rate,
        }
    }
}

/// What happened while building an environment, for warnings and logs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub env: Environment,
    /// Declared parameters the operation left out (defaulted to 0)
    pub missing: Vec<String>,
    /// Operation keys the process does not declare (dropped)
    pub ignored: Vec<String>,
    /// Declared parameters that shadow an implicit tool value
    pub shadowed: Vec<String>,
}

/// Build the formula environment for one operation
pub fn resolve(operation: &Operation, process: &Process, tool: Option<&Tool>) -> Environment {
    resolve_detailed(operation, process, tool).env
}

/// Like [`resolve`], also reporting defaulted, dropped and shadowed names
pub fn resolve_detailed(operation: &Operation, process: &Process, tool: Option<&Tool>) -> Resolution {
    let mut resolution = Resolution::default();

    for parameter in &process.parameters {
        let value = match operation.parameters.get(&parameter.name) {
            Some(value) => *value,
            None => {
                resolution.missing.push(parameter.name.clone());
                0.0
            }
        };
        resolution.env.insert(parameter.name.clone(), value);
    }

    resolution.ignored = operation
        .parameters
        .keys()
        .filter(|name| !process.declares(name))
        .cloned()
        .collect();

    let kinematics = ToolKinematics::from_tool(tool);
    let implicit = [
        (TOOL_DIAMETER, kinematics.tool_diameter),
        (SPINDLE_SPEED, kinematics.spindle_speed),
        (FEED_RATE, kinematics.feed_rate),
    ];
    for (name, value) in implicit {
        // A value the process declares explicitly wins over the tool's
        if resolution.env.contains_key(name) {
            resolution.shadowed.push(name.to_string());
            continue;
        }
        resolution.env.insert(name.to_string(), value);
    }

    resolution
}
