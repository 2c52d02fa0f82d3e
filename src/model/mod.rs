/// Part description fed to the engine
/// One `MachiningInput` is a snapshot of everything the user entered for a part.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric, // shape parameters in mm
    Imperial, // shape parameters in inches
}

/// How the raw stock is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RawMaterialProcess {
    #[default]
    #[serde(rename = "billet", alias = "Billet")]
    Billet,
    #[serde(rename = "casting", alias = "Casting")]
    Casting,
    #[serde(rename = "forging", alias = "Forging")]
    Forging,
    #[serde(rename = "3d_printing", alias = "3D Printing")]
    Printing3D,
    #[serde(rename = "other", alias = "Other")]
    Other,
}

/// Raw stock shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BilletShape {
    Block,
    Bar,
    Cylinder,
    Rod,
    Tube,
    RectangleTube,
    Plate,
    Cube,
}

/// Shape parameter name -> value (mm, or inches for imperial input)
pub type ShapeParams = BTreeMap<String, f64>;

/// Which weight a per-kg charge is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightBasis {
    Raw,
    #[default]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentUnit {
    #[default]
    PerKg,
    /// Cost per m² of treated surface
    PerArea,
}

/// Plating, anodizing, painting...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTreatment {
    pub name: String,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub unit: TreatmentUnit,
    #[serde(default)]
    pub basis: WeightBasis,
    /// Treated area in m²; the stock's outer surface when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_m2: Option<f64>,
}

/// One process instance within a setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Process name in the catalog
    pub process: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    /// Tool change happens once per batch instead of once per part
    #[serde(default)]
    pub shared_tool_change: bool,
}

fn default_efficiency() -> f64 {
    1.0
}

/// One fixture/machine session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub time_per_setup_min: Option<f64>,
    #[serde(default)]
    pub tool_change_time_sec: Option<f64>,
    /// Fraction in (0, 1]
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
}

impl Setup {
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Setup {}", index + 1))
    }
}

/// Percentage surcharges, applied in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Markups {
    #[serde(default)]
    pub general: f64,
    #[serde(default)]
    pub admin: f64,
    #[serde(default)]
    pub sales: f64,
    #[serde(default)]
    pub miscellaneous: f64,
    #[serde(default)]
    pub packing: f64,
    #[serde(default)]
    pub transport: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub duty: f64,
}

/// Everything the user entered for one part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachiningInput {
    pub part_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,

    pub batch_volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_volume: Option<f64>,

    #[serde(default)]
    pub unit_system: UnitSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    #[serde(default)]
    pub raw_material_process: RawMaterialProcess,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billet_shape: Option<BilletShape>,
    #[serde(default)]
    pub shape_params: ShapeParams,

    #[serde(default)]
    pub raw_weight_kg: Option<f64>,
    #[serde(default)]
    pub finished_weight_kg: Option<f64>,

    #[serde(default)]
    pub transport_cost_per_kg: Option<f64>,
    #[serde(default)]
    pub heat_treatment_cost_per_kg: Option<f64>,
    #[serde(default)]
    pub heat_treatment_basis: WeightBasis,
    #[serde(default)]
    pub surface_treatments: Vec<SurfaceTreatment>,

    #[serde(default)]
    pub setups: Vec<Setup>,
    #[serde(default)]
    pub markups: Markups,
}

impl MachiningInput {
    /// Minimal input: a part name and a batch size
    pub fn new(part_name: impl Into<String>, batch_volume: f64) -> Self {
        Self {
            part_name: part_name.into(),
            part_number: None,
            batch_volume,
            annual_volume: None,
            unit_system: UnitSystem::Metric,
            currency: None,
            region: None,
            material_id: None,
            raw_material_process: RawMaterialProcess::Billet,
            billet_shape: None,
            shape_params: ShapeParams::new(),
            raw_weight_kg: None,
            finished_weight_kg: None,
            transport_cost_per_kg: None,
            heat_treatment_cost_per_kg: None,
            heat_treatment_basis: WeightBasis::Finished,
            surface_treatments: Vec::new(),
            setups: Vec::new(),
            markups: Markups::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_input_defaults() {
        let json = r#"{
            "part_name": "Bracket",
            "batch_volume": 50,
            "billet_shape": "block",
            "shape_params": { "length": 120, "width": 80, "height": 40 },
            "setups": [
                { "operations": [ { "process": "Face Milling", "tool_id": "FM50_5FL",
                                    "parameters": { "faceLength": 120, "passes": 2 } } ] }
            ],
            "markups": { "profit": 20 }
        }"#;

        let input = MachiningInput::from_json(json).unwrap();
        assert_eq!(input.batch_volume, 50.0);
        assert_eq!(input.unit_system, UnitSystem::Metric);
        assert_eq!(input.raw_material_process, RawMaterialProcess::Billet);
        assert_eq!(input.billet_shape, Some(BilletShape::Block));
        assert_eq!(input.heat_treatment_basis, WeightBasis::Finished);
        assert_eq!(input.raw_weight_kg, None);

        let setup = &input.setups[0];
        assert_eq!(setup.efficiency, 1.0);
        assert_eq!(setup.time_per_setup_min, None);
        assert_eq!(setup.label(0), "Setup 1");
        assert!(!setup.operations[0].shared_tool_change);

        assert_eq!(
            input.markups,
            Markups {
                profit: 20.0,
                ..Markups::default()
            }
        );
    }

    #[test]
    fn test_raw_material_process_names() {
        let kinds: Vec<RawMaterialProcess> =
            serde_json::from_str(r#"["billet", "Casting", "3D Printing", "3d_printing", "other"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![
                RawMaterialProcess::Billet,
                RawMaterialProcess::Casting,
                RawMaterialProcess::Printing3D,
                RawMaterialProcess::Printing3D,
                RawMaterialProcess::Other,
            ]
        );
    }

    #[test]
    fn test_surface_treatment_defaults() {
        let treatment: SurfaceTreatment =
            serde_json::from_str(r#"{ "name": "Anodize", "cost": 3.5, "unit": "per_area" }"#).unwrap();
        assert_eq!(treatment.unit, TreatmentUnit::PerArea);
        assert_eq!(treatment.basis, WeightBasis::Finished);
        assert_eq!(treatment.area_m2, None);
    }
}
