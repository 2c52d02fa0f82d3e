//! Reference catalog - materials, machines, tools and processes
//!
//! The catalog is read-only reference data handed to the engine by the
//! caller. It can be loaded from a JSON document; a built-in default covers
//! common shop-floor entries.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate {kind} '{id}' in catalog")]
    Duplicate { kind: &'static str, id: String },
}

/// Stock material with density and purchase cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: String,

    /// Density in g/cm³
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_g_cm3: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_kg: Option<f64>,

    /// Region code -> cost per kg overriding `cost_per_kg`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub region_costs: BTreeMap<String, f64>,
}

/// Machine tool with its hourly rate (labor folded in)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,

    /// Region code -> hourly rate overriding `hourly_rate`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub region_rates: BTreeMap<String, f64>,
}

/// Tool type classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ToolType {
    #[serde(rename = "end_mill", alias = "endmill", alias = "END_MILL")]
    #[default]
    EndMill,
    #[serde(rename = "drill", alias = "DRILL")]
    Drill,
    #[serde(rename = "face_mill", alias = "facemill", alias = "FACE_MILL")]
    FaceMill,
    #[serde(rename = "ball_mill", alias = "ballmill", alias = "BALL_MILL")]
    BallMill,
    #[serde(rename = "turning_insert", alias = "TURNING_INSERT")]
    TurningInsert,
    #[serde(rename = "reamer", alias = "REAMER")]
    Reamer,
    #[serde(rename = "tap", alias = "TAP")]
    Tap,
}

/// Cutting tool. Every numeric field is optional; missing values make the
/// derived spindle speed / feed rate and the wear cost fall back to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub tool_type: ToolType,

    /// Diameter in mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,

    /// Number of teeth / flutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teeth: Option<u32>,

    /// Cutting speed Vc in m/min
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutting_speed: Option<f64>,

    /// Feed per tooth in mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_per_tooth: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Estimated service life in cutting hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_hours: Option<f64>,
}

/// A named input of a process formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameter {
    pub name: String,
    #[serde(default)]
    pub unit: String,
}

/// A machining process and its time formula (minutes per part)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ProcessParameter>,
    pub formula: String,
}

impl Process {
    pub fn declares(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }
}

/// All reference data a calculation reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub processes: Vec<Process>,

    /// Region code -> currency code
    #[serde(default)]
    pub region_currency: BTreeMap<String, String>,
}

impl Catalog {
    /// Load a catalog from a JSON file
    pub fn from_file(path: &str) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.check_unique()?;
        Ok(catalog)
    }

    pub fn material(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn machine(&self, id: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }

    pub fn tool(&self, id: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Operations bind processes by name; exact match first, then
    /// case-insensitive
    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name == name).or_else(|| {
            let name_lower = name.to_lowercase();
            self.processes
                .iter()
                .find(|p| p.name.to_lowercase() == name_lower)
        })
    }

    pub fn currency_for(&self, region: &str) -> Option<&str> {
        self.region_currency.get(region).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
            && self.machines.is_empty()
            && self.tools.is_empty()
            && self.processes.is_empty()
    }

    fn check_unique(&self) -> Result<(), CatalogError> {
        fn unique<'a>(
            kind: &'static str,
            ids: impl Iterator<Item = &'a str>,
        ) -> Result<(), CatalogError> {
            let mut seen = BTreeSet::new();
            for id in ids {
                if !seen.insert(id) {
                    return Err(CatalogError::Duplicate {
                        kind,
                        id: id.to_string(),
                    });
                }
            }
            Ok(())
        }

        unique("material", self.materials.iter().map(|m| m.id.as_str()))?;
        unique("machine", self.machines.iter().map(|m| m.id.as_str()))?;
        unique("tool", self.tools.iter().map(|t| t.id.as_str()))?;
        unique("process", self.processes.iter().map(|p| p.id.as_str()))?;
        unique("process name", self.processes.iter().map(|p| p.name.as_str()))
    }
}

/// Default catalog with common materials, machines, tools and processes
pub fn default_catalog() -> Catalog {
    let json = r#"{
        "materials": [
            { "id": "AL6061", "name": "Aluminum 6061-T6", "density_g_cm3": 2.7,
              "cost_per_kg": 4.5, "region_costs": { "EU": 5.1, "IN": 310.0 } },
            { "id": "AL7075", "name": "Aluminum 7075-T6", "density_g_cm3": 2.81,
              "cost_per_kg": 7.2 },
            { "id": "C45", "name": "Steel 1045", "density_g_cm3": 7.85,
              "cost_per_kg": 1.8, "region_costs": { "EU": 2.1 } },
            { "id": "SS304", "name": "Stainless 304", "density_g_cm3": 8.0,
              "cost_per_kg": 4.2 },
            { "id": "C360", "name": "Brass C360", "density_g_cm3": 8.5,
              "cost_per_kg": 7.0 },
            { "id": "TI64", "name": "Titanium Ti-6Al-4V", "density_g_cm3": 4.43,
              "cost_per_kg": 28.0 }
        ],
        "machines": [
            { "id": "VMC3", "name": "3-Axis Vertical Machining Center",
              "hourly_rate": 60.0, "region_rates": { "EU": 55.0, "IN": 1800.0 } },
            { "id": "VMC5", "name": "5-Axis Machining Center", "hourly_rate": 120.0 },
            { "id": "LATHE", "name": "CNC Turning Center", "hourly_rate": 45.0 }
        ],
        "tools": [
            { "id": "EM10_4FL", "name": "10mm 4-Flute Carbide End Mill", "type": "end_mill",
              "diameter": 10.0, "teeth": 4, "cutting_speed": 250.0, "feed_per_tooth": 0.05,
              "price": 45.0, "life_hours": 8.0 },
            { "id": "EM6_3FL", "name": "6mm 3-Flute Carbide End Mill", "type": "end_mill",
              "diameter": 6.0, "teeth": 3, "cutting_speed": 200.0, "feed_per_tooth": 0.03,
              "price": 30.0, "life_hours": 6.0 },
            { "id": "FM50_5FL", "name": "50mm Face Mill", "type": "face_mill",
              "diameter": 50.0, "teeth": 5, "cutting_speed": 300.0, "feed_per_tooth": 0.1,
              "price": 220.0, "life_hours": 40.0 },
            { "id": "DR8", "name": "8mm Carbide Drill", "type": "drill",
              "diameter": 8.0, "teeth": 2, "cutting_speed": 90.0, "feed_per_tooth": 0.12,
              "price": 60.0, "life_hours": 10.0 }
        ],
        "processes": [
            { "id": "P-FACE", "name": "Face Milling",
              "parameters": [ { "name": "faceLength", "unit": "mm" },
                              { "name": "passes", "unit": "count" } ],
              "formula": "(faceLength + toolDiameter) * passes / feedRate" },
            { "id": "P-POCKET", "name": "Pocket Milling",
              "parameters": [ { "name": "pathLength", "unit": "mm" },
                              { "name": "depth", "unit": "mm" },
                              { "name": "stepDown", "unit": "mm" } ],
              "formula": "pathLength * ceil(depth / stepDown) / feedRate" },
            { "id": "P-DRILL", "name": "Drilling",
              "parameters": [ { "name": "holes", "unit": "count" },
                              { "name": "depth", "unit": "mm" } ],
              "formula": "holes * (depth + 0.3 * toolDiameter) / feedRate" },
            { "id": "P-DEBURR", "name": "Manual Deburr",
              "parameters": [ { "name": "edges", "unit": "count" },
                              { "name": "minutesPerEdge", "unit": "min" } ],
              "formula": "edges * minutesPerEdge" }
        ],
        "region_currency": { "US": "USD", "EU": "EUR", "IN": "INR" }
    }"#;

    Catalog::from_json(json).expect("built-in catalog is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_parse() {
        let json = r#"{
            "tools": [
                { "id": "EM_250", "name": "6mm EM", "type": "end_mill",
                  "diameter": 6.0, "teeth": 4 }
            ],
            "processes": [
                { "id": "P1", "name": "Slotting", "formula": "len / feedRate",
                  "parameters": [ { "name": "len", "unit": "mm" } ] }
            ]
        }"#;

        let catalog = Catalog::from_json(json).unwrap();
        let tool = catalog.tool("EM_250").unwrap();
        assert_eq!(tool.diameter, Some(6.0));
        assert_eq!(tool.teeth, Some(4));
        assert_eq!(tool.price, None);
        assert_eq!(tool.tool_type, ToolType::EndMill);

        let process = catalog.process("Slotting").unwrap();
        assert!(process.declares("len"));
        assert!(!process.declares("feedRate"));
        assert!(catalog.materials.is_empty());
    }

    #[test]
    fn test_process_lookup_is_case_insensitive_fallback() {
        let catalog = default_catalog();
        assert_eq!(catalog.process("face milling").unwrap().id, "P-FACE");
        assert_eq!(catalog.process("Face Milling").unwrap().id, "P-FACE");
        assert!(catalog.process("Laser Cutting").is_none());
    }

    #[test]
    fn test_default_catalog() {
        let catalog = default_catalog();
        assert!(!catalog.is_empty());
        assert_eq!(catalog.material("AL6061").unwrap().density_g_cm3, Some(2.7));
        assert_eq!(catalog.machine("VMC3").unwrap().hourly_rate, Some(60.0));
        assert_eq!(catalog.tool("DR8").unwrap().tool_type, ToolType::Drill);
        assert_eq!(catalog.currency_for("EU"), Some("EUR"));
        assert_eq!(catalog.currency_for("MARS"), None);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{
            "machines": [
                { "id": "M1", "name": "Mill" },
                { "id": "M1", "name": "Other Mill" }
            ]
        }"#;

        match Catalog::from_json(json) {
            Err(CatalogError::Duplicate { kind, id }) => {
                assert_eq!(kind, "machine");
                assert_eq!(id, "M1");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_process_ids_rejected() {
        let json = r#"{
            "processes": [
                { "id": "P1", "name": "Roughing", "formula": "10" },
                { "id": "P1", "name": "Finishing", "formula": "1" }
            ]
        }"#;

        match Catalog::from_json(json) {
            Err(CatalogError::Duplicate { kind, id }) => {
                assert_eq!(kind, "process");
                assert_eq!(id, "P1");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }

        let same_name = r#"{
            "processes": [
                { "id": "P1", "name": "Roughing", "formula": "10" },
                { "id": "P2", "name": "Roughing", "formula": "1" }
            ]
        }"#;
        assert!(matches!(
            Catalog::from_json(same_name),
            Err(CatalogError::Duplicate { kind: "process name", .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Catalog::from_file("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
