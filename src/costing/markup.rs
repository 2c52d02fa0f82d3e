//! Markup cascade - sequential, compounding percentage surcharges

use crate::model::Markups;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    General,
    Admin,
    Sales,
    Miscellaneous,
    Packing,
    Transport,
    Profit,
    Duty,
}

impl std::fmt::Display for MarkupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkupKind::General => write!(f, "General"),
            MarkupKind::Admin => write!(f, "Admin"),
            MarkupKind::Sales => write!(f, "Sales"),
            MarkupKind::Miscellaneous => write!(f, "Miscellaneous"),
            MarkupKind::Packing => write!(f, "Packing"),
            MarkupKind::Transport => write!(f, "Transport"),
            MarkupKind::Profit => write!(f, "Profit"),
            MarkupKind::Duty => write!(f, "Duty"),
        }
    }
}

/// The order markups are applied in. Each one is a percentage of the
/// running total after the previous one was added.
pub const CASCADE_ORDER: [MarkupKind; 8] = [
    MarkupKind::General,
    MarkupKind::Admin,
    MarkupKind::Sales,
    MarkupKind::Miscellaneous,
    MarkupKind::Packing,
    MarkupKind::Transport,
    MarkupKind::Profit,
    MarkupKind::Duty,
];

impl Markups {
    /// Percentage for one markup
    pub fn rate(&self, kind: MarkupKind) -> f64 {
        match kind {
            MarkupKind::General => self.general,
            MarkupKind::Admin => self.admin,
            MarkupKind::Sales => self.sales,
            MarkupKind::Miscellaneous => self.miscellaneous,
            MarkupKind::Packing => self.packing,
            MarkupKind::Transport => self.transport,
            MarkupKind::Profit => self.profit,
            MarkupKind::Duty => self.duty,
        }
    }
}

/// Currency amount each markup added
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkupCosts {
    pub general: f64,
    pub admin: f64,
    pub sales: f64,
    pub miscellaneous: f64,
    pub packing: f64,
    pub transport: f64,
    pub profit: f64,
    pub duty: f64,
    pub total: f64,
}

impl MarkupCosts {
    pub fn amount(&self, kind: MarkupKind) -> f64 {
        match kind {
            MarkupKind::General => self.general,
            MarkupKind::Admin => self.admin,
            MarkupKind::Sales => self.sales,
            MarkupKind::Miscellaneous => self.miscellaneous,
            MarkupKind::Packing => self.packing,
            MarkupKind::Transport => self.transport,
            MarkupKind::Profit => self.profit,
            MarkupKind::Duty => self.duty,
        }
    }

    fn slot(&mut self, kind: MarkupKind) -> &mut f64 {
        match kind {
            MarkupKind::General => &mut self.general,
            MarkupKind::Admin => &mut self.admin,
            MarkupKind::Sales => &mut self.sales,
            MarkupKind::Miscellaneous => &mut self.miscellaneous,
            MarkupKind::Packing => &mut self.packing,
            MarkupKind::Transport => &mut self.transport,
            MarkupKind::Profit => &mut self.profit,
            MarkupKind::Duty => &mut self.duty,
        }
    }
}

/// Apply the markups in [`CASCADE_ORDER`]; returns the amounts and the
/// final total
pub fn apply_cascade(subtotal: f64, markups: &Markups) -> (MarkupCosts, f64) {
    apply_in_order(subtotal, markups, &CASCADE_ORDER)
}

/// Apply markups in an arbitrary order
pub fn apply_in_order(subtotal: f64, markups: &Markups, order: &[MarkupKind]) -> (MarkupCosts, f64) {
    let mut costs = MarkupCosts::default();
    let mut running = subtotal;

    for &kind in order {
        let amount = running * markups.rate(kind) / 100.0;
        *costs.slot(kind) += amount;
        running += amount;
    }

    costs.total = running - subtotal;
    (costs, running)
}
