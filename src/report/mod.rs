//! Plain-text rendering of results and formula diagnostics

use crate::costing::CASCADE_ORDER;
use crate::engine::{CalculationError, MachiningResult};
use crate::eval::FormulaError;
use ariadne::{Config, Label, Report, ReportKind, Source};

#[derive(Debug, Default)]
pub struct TextReport {
    pub lines: Vec<String>,
}

impl TextReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(&mut self, title: &str) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.push(title.to_string());
        self.lines.push("-".repeat(title.len()));
    }

    pub fn row(&mut self, label: &str, value: String) {
        self.lines.push(format!("{:<28}{:>16}", label, value));
    }

    pub fn text(&mut self, text: String) {
        self.lines.push(text);
    }
}

impl std::fmt::Display for TextReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

fn money(amount: f64, currency: Option<&str>) -> String {
    match currency {
        Some(code) => format!("{:.2} {}", amount, code),
        None => format!("{:.2}", amount),
    }
}

/// Human readable breakdown of one result
pub fn render_result(result: &MachiningResult) -> String {
    let currency = result.currency.as_deref();
    let mut report = TextReport::new();

    report.heading(&format!("{} (batch of {})", result.part_name, result.batch_volume));
    report.row("Raw weight", format!("{:.4} kg", result.raw_weight_kg));
    report.row("Finished weight", format!("{:.4} kg", result.finished_weight_kg));
    if result.surface_area_m2 > 0.0 {
        report.row("Stock surface", format!("{:.4} m2", result.surface_area_m2));
    }

    report.heading("Time per part");
    for op in &result.operations {
        let label = format!("  {}.{} {}", op.setup_index + 1, op.operation_index + 1, op.process_name);
        let mark = if op.formula_failed { " !" } else { "" };
        report.row(&label, format!("{:.3} min{}", op.cycle_time_min, mark));
    }
    report.row("Cutting", format!("{:.3} min", result.time.cutting_min));
    report.row("Tool change", format!("{:.3} min", result.time.tool_change_min));
    report.row("Setup (amortized)", format!("{:.3} min", result.time.setup_min));
    report.row("Total", format!("{:.3} min", result.time.total_per_part_min));
    report.row("Batch", format!("{:.2} h", result.time.batch_hours));

    report.heading("Cost");
    report.row("Material", money(result.material_cost, currency));
    report.row("Treatment", money(result.treatment_cost, currency));
    report.row("Machine", money(result.machine_cost, currency));
    report.row("Tooling", money(result.tool_cost, currency));
    report.row("Subtotal", money(result.subtotal, currency));
    for kind in CASCADE_ORDER {
        let amount = result.markup_costs.amount(kind);
        if amount != 0.0 {
            report.row(&format!("  + {}", kind), money(amount, currency));
        }
    }
    report.row("Total", money(result.total_cost, currency));
    report.row("Per part", money(result.cost_per_part, currency));
    if let Some(annual) = result.annual_cost {
        report.row("Annual", money(annual, currency));
    }

    if !result.warnings.is_empty() {
        report.heading("Missing data");
        for warning in &result.warnings {
            report.text(format!("  - {}", warning));
        }
    }

    report.to_string()
}

/// Point at the failing part of a formula
pub fn render_formula_error(error: &FormulaError) -> String {
    // Trailing blank gives end-of-input errors a column to point at
    let source = format!("{} ", error.formula);
    let len = error.formula.len();
    let start = error.span.start.min(len);
    let end = error.span.end.clamp(start + 1, len + 1);

    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, (), start)
        .with_config(Config::default().with_color(false))
        .with_message(format!("formula of process {} does not parse", error.process_id))
        .with_label(Label::new(start..end).with_message(&error.message))
        .finish()
        .write(Source::from(source), &mut out);

    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => format!("{}: {} at {:?}", error.process_id, error.message, error.span),
    }
}

/// What the CLI prints when there is no result
pub fn render_failure(error: &CalculationError) -> String {
    format!("Results unavailable: {}", error)
}
