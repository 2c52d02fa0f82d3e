//! Region resolution - turns catalog prices into concrete unit costs
//!
//! Catalog entries carry a base price plus optional per-region overrides.
//! The engine itself is currency-agnostic; this is where the region picks
//! the numbers it works with.

use crate::catalog::{Catalog, Machine, Material, Tool};
use crate::costing::{ToolWear, UnitCosts};
use crate::model::MachiningInput;
use crate::timing::TimeBreakdown;
use crate::validator::MissingDataWarning;
use std::collections::BTreeMap;

/// Region override if one exists, otherwise the base value
fn regional(base: Option<f64>, overrides: &BTreeMap<String, f64>, region: Option<&str>) -> Option<f64> {
    region
        .and_then(|r| overrides.get(r).copied())
        .or(base)
}

pub fn material_cost_per_kg(material: &Material, region: Option<&str>) -> Option<f64> {
    regional(material.cost_per_kg, &material.region_costs, region)
}

pub fn machine_hourly_rate(machine: &Machine, region: Option<&str>) -> Option<f64> {
    regional(machine.hourly_rate, &machine.region_rates, region)
}

/// Currency of the quote: explicit input, then the region's default
pub fn resolve_currency(input: &MachiningInput, catalog: &Catalog) -> Option<String> {
    input.currency.clone().or_else(|| {
        input
            .region
            .as_deref()
            .and_then(|r| catalog.currency_for(r))
            .map(str::to_string)
    })
}

fn tool_wear(tool: &Tool, warnings: &mut Vec<MissingDataWarning>) -> ToolWear {
    let entity = format!("tool {}", tool.id);
    let price = tool.price.unwrap_or_else(|| {
        warnings.push(MissingDataWarning::new(&entity, "price"));
        0.0
    });
    let life_hours = match tool.life_hours {
        Some(hours) if hours > 0.0 => hours,
        _ => {
            warnings.push(MissingDataWarning::new(&entity, "life_hours"));
            0.0
        }
    };
    ToolWear { price, life_hours }
}

/// Resolve every unit cost the cost aggregator needs, aligned with the time
/// breakdown rows
pub fn resolve_unit_costs(
    input: &MachiningInput,
    catalog: &Catalog,
    time: &TimeBreakdown,
) -> (UnitCosts, Vec<MissingDataWarning>) {
    let region = input.region.as_deref();
    let mut warnings = Vec::new();

    let material = input.material_id.as_deref().and_then(|id| catalog.material(id));
    let material_per_kg = match material {
        Some(material) => material_cost_per_kg(material, region).unwrap_or_else(|| {
            warnings.push(MissingDataWarning::new(format!("material {}", material.id), "cost_per_kg"));
            0.0
        }),
        None => {
            warnings.push(MissingDataWarning::new(&input.part_name, "material_id"));
            0.0
        }
    };

    let transport_per_kg = input.transport_cost_per_kg.unwrap_or_else(|| {
        warnings.push(MissingDataWarning::new(&input.part_name, "transport_cost_per_kg"));
        0.0
    });

    let machine_rates = time
        .setups
        .iter()
        .map(|setup| {
            let machine = setup.machine_id.as_deref().and_then(|id| catalog.machine(id));
            match machine {
                Some(machine) => machine_hourly_rate(machine, region).unwrap_or_else(|| {
                    warnings.push(MissingDataWarning::new(format!("machine {}", machine.id), "hourly_rate"));
                    0.0
                }),
                None => {
                    warnings.push(MissingDataWarning::new(&setup.name, "machine_id"));
                    0.0
                }
            }
        })
        .collect();

    // One lookup (and one set of warnings) per tool, however often it is used
    let mut by_tool: BTreeMap<&str, ToolWear> = BTreeMap::new();
    let wear = time
        .operations
        .iter()
        .map(|operation| {
            match operation.tool_id.as_deref().and_then(|id| catalog.tool(id)) {
                Some(tool) => *by_tool
                    .entry(tool.id.as_str())
                    .or_insert_with(|| tool_wear(tool, &mut warnings)),
                None => ToolWear::default(),
            }
        })
        .collect();

    (
        UnitCosts {
            material_per_kg,
            transport_per_kg,
            machine_rates,
            tool_wear: wear,
        },
        warnings,
    )
}
