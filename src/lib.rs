//! machquote - cost estimation for machined parts
//!
//! A part description (stock, setups, operations, markups) is validated,
//! timed through per-process formulas and priced against a catalog of
//! materials, machines, tools and processes.
//!
//! ```no_run
//! use machquote::{catalog, engine, model::MachiningInput};
//!
//! let input = MachiningInput::new("Bracket", 50.0);
//! let result = engine::compute(&input, &catalog::default_catalog())?;
//! println!("{:.2} per part", result.cost_per_part);
//! # Ok::<(), machquote::engine::CalculationError>(())
//! ```

pub mod ast;
pub mod calculation;
pub mod catalog;
pub mod costing;
pub mod engine;
pub mod eval;
pub mod geometry;
pub mod lexer;
pub mod model;
pub mod params;
pub mod parser;
pub mod region;
pub mod report;
pub mod timing;
pub mod validator;

pub use calculation::{Calculation, CalculationStatus};
pub use catalog::{default_catalog, Catalog, CatalogError};
pub use engine::{compute, CalculationError, MachiningResult};
pub use eval::{evaluate, Formula, FormulaError};
pub use model::MachiningInput;
pub use validator::{MissingDataWarning, ValidationError};
