//! # Report Row Shaping
//!
//! Pure helpers that turn raw per-product line sums (supplied by the db
//! layer) into the structured rows the reporting screens render. All
//! quantity display goes back through the codec; the rendering itself is
//! out of scope and happens in the frontend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::payment::PaymentType;
use crate::quantity::{combine_formatted, Packing};
use crate::types::SaleItem;

// =============================================================================
// Stock Activity
// =============================================================================

/// One product's row in the stock activity summary.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockActivityRow {
    pub product_id: String,
    pub product_name: String,
    pub lines_per_carton: i64,
    /// Raw line sums from the movement ledger.
    pub received_lines: i64,
    pub sold_lines: i64,
    pub adjusted_lines: i64,
}

impl StockActivityRow {
    fn packing(&self) -> Packing {
        Packing::of(self.lines_per_carton)
    }

    /// Net stock on hand, in lines.
    pub fn available_lines(&self) -> i64 {
        self.received_lines + self.adjusted_lines - self.sold_lines
    }

    pub fn format_received(&self) -> String {
        self.packing().format_lines(self.received_lines)
    }

    pub fn format_sold(&self) -> String {
        self.packing().format_lines(self.sold_lines)
    }

    pub fn format_available(&self) -> String {
        self.packing().format_lines(self.available_lines())
    }
}

// =============================================================================
// Profit Analysis
// =============================================================================

/// One sale item's contribution to the profit analysis report.
///
/// Works from the frozen snapshot prices on the item: profit figures never
/// shift retroactively when receipt history changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitRow {
    pub product_id: String,
    pub product_name: String,
    pub quantity_lines: i64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

impl ProfitRow {
    /// Builds a profit row from a frozen sale item.
    pub fn from_item(item: &SaleItem) -> Self {
        ProfitRow {
            product_id: item.product_id.clone(),
            product_name: item.name_snapshot.clone(),
            quantity_lines: item.quantity,
            revenue: item.total,
            cost: item.line_cost(),
            profit: item.line_profit(),
        }
    }
}

/// Sums a batch of profit rows into report totals.
pub fn profit_totals(rows: &[ProfitRow]) -> (f64, f64, f64) {
    rows.iter().fold((0.0, 0.0, 0.0), |(r, c, p), row| {
        (r + row.revenue, c + row.cost, p + row.profit)
    })
}

// =============================================================================
// Daily Sales Summary
// =============================================================================

/// Aggregate of one day's sales, broken down by payment type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySalesSummary {
    pub sale_count: i64,
    pub total: f64,
    pub amount_paid: f64,
    pub cash_total: f64,
    pub credit_total: f64,
    pub partial_total: f64,
    /// Per-product formatted quantities, joined for display
    /// ("2C1L + 1C"). Heterogeneous packings, so this is a string join,
    /// not arithmetic.
    pub quantity_breakdown: String,
}

impl DailySalesSummary {
    /// Folds per-sale figures and per-product formatted quantities into a
    /// summary.
    pub fn build(
        sales: &[(PaymentType, f64, f64)],
        formatted_quantities: &[String],
    ) -> DailySalesSummary {
        let mut summary = DailySalesSummary {
            sale_count: sales.len() as i64,
            quantity_breakdown: combine_formatted(formatted_quantities),
            ..DailySalesSummary::default()
        };

        for &(payment_type, total, amount_paid) in sales {
            summary.total += total;
            summary.amount_paid += amount_paid;
            match payment_type {
                PaymentType::Cash => summary.cash_total += total,
                PaymentType::Credit => summary.credit_total += total,
                PaymentType::Partial => summary.partial_total += total,
            }
        }

        summary
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_stock_activity_formatting() {
        let row = StockActivityRow {
            product_id: "p-1".to_string(),
            product_name: "Milo Sachet".to_string(),
            lines_per_carton: 6,
            received_lines: 18,
            sold_lines: 15,
            adjusted_lines: 0,
        };
        assert_eq!(row.available_lines(), 3);
        assert_eq!(row.format_received(), "3C");
        assert_eq!(row.format_sold(), "2C3L");
        assert_eq!(row.format_available(), "3L");
    }

    #[test]
    fn test_profit_row_from_item() {
        let item = SaleItem {
            id: "i-1".to_string(),
            sale_id: "s-1".to_string(),
            product_id: "p-1".to_string(),
            name_snapshot: "Milo Sachet".to_string(),
            quantity: 15,
            unit_selling_price: 2.0,
            unit_cost_price: 1.1,
            total: 30.0,
            created_at: Utc::now(),
        };
        let row = ProfitRow::from_item(&item);
        assert!((row.revenue - 30.0).abs() < 1e-9);
        assert!((row.cost - 16.5).abs() < 1e-9);
        assert!((row.profit - 13.5).abs() < 1e-9);

        let (revenue, cost, profit) = profit_totals(&[row.clone(), row]);
        assert!((revenue - 60.0).abs() < 1e-9);
        assert!((cost - 33.0).abs() < 1e-9);
        assert!((profit - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_summary_by_payment_type() {
        let sales = vec![
            (PaymentType::Cash, 100.0, 100.0),
            (PaymentType::Credit, 50.0, 0.0),
            (PaymentType::Partial, 80.0, 30.0),
        ];
        let quantities = vec!["2C1L".to_string(), "0".to_string(), "1C".to_string()];

        let summary = DailySalesSummary::build(&sales, &quantities);
        assert_eq!(summary.sale_count, 3);
        assert!((summary.total - 230.0).abs() < 1e-9);
        assert!((summary.amount_paid - 130.0).abs() < 1e-9);
        assert!((summary.cash_total - 100.0).abs() < 1e-9);
        assert!((summary.credit_total - 50.0).abs() < 1e-9);
        assert!((summary.partial_total - 80.0).abs() < 1e-9);
        assert_eq!(summary.quantity_breakdown, "2C1L + 1C");
    }
}
