//! Stock geometry - volume, mass and surface area of the raw billet
//!
//! Closed-form volumes per shape. The calculator is total: a missing, zero,
//! negative or inconsistent dimension gives zero instead of an error, and
//! callers decide whether that deserves a warning.

use crate::model::{BilletShape, ShapeParams, UnitSystem};
use std::f64::consts::PI;
use uom::si::area::square_meter;
use uom::si::f64::{Area, Length, Mass, MassDensity, Volume};
use uom::si::length::{inch, millimeter};
use uom::si::mass::kilogram;
use uom::si::mass_density::gram_per_cubic_centimeter;
use uom::si::volume::cubic_millimeter;

/// Parameter names each shape reads
pub fn required_params(shape: BilletShape) -> &'static [&'static str] {
    match shape {
        BilletShape::Block | BilletShape::Bar => &["length", "width", "height"],
        BilletShape::Cylinder => &["diameter", "height"],
        BilletShape::Rod => &["diameter", "length"],
        BilletShape::Tube => &["outer_diameter", "inner_diameter", "length"],
        BilletShape::RectangleTube => &["width", "height", "wall_thickness", "length"],
        BilletShape::Plate => &["length", "width", "thickness"],
        BilletShape::Cube => &["side"],
    }
}

/// Shape parameters converted to millimetres
pub fn to_millimeters(params: &ShapeParams, units: UnitSystem) -> ShapeParams {
    match units {
        UnitSystem::Metric => params.clone(),
        UnitSystem::Imperial => params
            .iter()
            .map(|(name, value)| {
                let mm = Length::new::<inch>(*value).get::<millimeter>();
                (name.clone(), mm)
            })
            .collect(),
    }
}

/// Collect the shape's dimensions, or `None` if any is missing or not positive
fn dimensions<const N: usize>(shape: BilletShape, params: &ShapeParams) -> Option<[f64; N]> {
    let names = required_params(shape);
    let mut dims = [0.0; N];
    for (slot, name) in dims.iter_mut().zip(names.iter()) {
        let value = params.get(*name).copied()?;
        if !(value.is_finite() && value > 0.0) {
            return None;
        }
        *slot = value;
    }
    Some(dims)
}

/// Stock volume in mm³
pub fn compute_volume_mm3(shape: BilletShape, params: &ShapeParams) -> f64 {
    let volume = match shape {
        BilletShape::Block | BilletShape::Bar | BilletShape::Plate => {
            dimensions::<3>(shape, params).map(|[a, b, c]| a * b * c)
        }
        BilletShape::Cylinder | BilletShape::Rod => {
            dimensions::<2>(shape, params).map(|[d, h]| PI * (d / 2.0).powi(2) * h)
        }
        BilletShape::Tube => dimensions::<3>(shape, params).and_then(|[outer, inner, length]| {
            (inner < outer)
                .then(|| PI * ((outer / 2.0).powi(2) - (inner / 2.0).powi(2)) * length)
        }),
        BilletShape::RectangleTube => {
            dimensions::<4>(shape, params).and_then(|[width, height, wall, length]| {
                let inner_width = width - 2.0 * wall;
                let inner_height = height - 2.0 * wall;
                // A wall thicker than half the section is a solid bar
                let inner_area = if inner_width > 0.0 && inner_height > 0.0 {
                    inner_width * inner_height
                } else {
                    0.0
                };
                Some((width * height - inner_area) * length)
            })
        }
        BilletShape::Cube => dimensions::<1>(shape, params).map(|[side]| side.powi(3)),
    };
    volume.unwrap_or(0.0)
}

/// Raw stock mass in kg from shape, millimetre dimensions and density in g/cm³
pub fn compute_raw_weight(shape: BilletShape, params: &ShapeParams, density_g_cm3: f64) -> f64 {
    if !(density_g_cm3.is_finite() && density_g_cm3 > 0.0) {
        return 0.0;
    }
    let volume = Volume::new::<cubic_millimeter>(compute_volume_mm3(shape, params));
    let density = MassDensity::new::<gram_per_cubic_centimeter>(density_g_cm3);
    let mass: Mass = volume * density;
    mass.get::<kilogram>()
}

/// Outer surface area of the stock in m²
pub fn compute_surface_area(shape: BilletShape, params: &ShapeParams) -> f64 {
    let mm2 = match shape {
        BilletShape::Block | BilletShape::Bar | BilletShape::Plate => {
            dimensions::<3>(shape, params).map(|[a, b, c]| 2.0 * (a * b + b * c + a * c))
        }
        BilletShape::Cylinder | BilletShape::Rod => dimensions::<2>(shape, params)
            .map(|[d, h]| 2.0 * PI * (d / 2.0).powi(2) + PI * d * h),
        BilletShape::Tube => dimensions::<3>(shape, params).and_then(|[outer, inner, length]| {
            (inner < outer).then(|| {
                let ends = 2.0 * PI * ((outer / 2.0).powi(2) - (inner / 2.0).powi(2));
                ends + PI * (outer + inner) * length
            })
        }),
        BilletShape::RectangleTube => {
            dimensions::<4>(shape, params).map(|[width, height, wall, length]| {
                let inner_width = (width - 2.0 * wall).max(0.0);
                let inner_height = (height - 2.0 * wall).max(0.0);
                let ends = 2.0 * (width * height - inner_width * inner_height);
                ends + 2.0 * (width + height + inner_width + inner_height) * length
            })
        }
        BilletShape::Cube => dimensions::<1>(shape, params).map(|[side]| 6.0 * side * side),
    };

    let side = Length::new::<millimeter>(1.0);
    let area: Area = side * side * mm2.unwrap_or(0.0);
    area.get::<square_meter>()
}
