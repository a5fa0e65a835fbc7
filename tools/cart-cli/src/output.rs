//! Output formatting for the CLI.

use std::time::Duration;

use chrono::Local;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use turbo_cart::prelude::*;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a table row.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        println!("  {}", formatted.join("  "));
    }

    /// Create a spinner for indeterminate progress.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Print the cart with its totals.
    pub fn cart(&self, overlay: &CartOverlay, totals: &CartTotals) {
        if self.json {
            self.json(&serde_json::json!({ "items": overlay, "totals": totals }));
            return;
        }

        if overlay.is_empty() {
            self.info("Cart is empty");
            return;
        }

        let widths = [3, 10, 28, 5, 5, 14];
        self.table_row(&["#", "ID", "PRODUCT", "QTY", "MAX", "AMOUNT"], &widths);
        for (i, row) in overlay.iter().enumerate() {
            let cols = cart_columns(i, row);
            let cols: Vec<&str> = cols.iter().map(String::as_str).collect();
            self.table_row(&cols, &widths);
        }

        println!();
        self.kv("items", &totals.quantity.to_string());
        self.kv("total", &style(totals.price.display()).bold().to_string());
    }

    /// Print one sync notice with a timestamp.
    pub fn notice(&self, notice: &SyncNotice) {
        if self.json {
            self.json(notice);
            return;
        }
        let at = style(Local::now().format("%H:%M:%S").to_string()).dim();
        match notice {
            SyncNotice::Applied { change, .. } => {
                println!("{} {} {}", at, style("✓").green(), describe(change));
            }
            SyncNotice::Rejected { change, error, .. } => {
                eprintln!(
                    "{} {} {} failed: {}",
                    at,
                    style("✗").red(),
                    describe(change),
                    error
                );
            }
            SyncNotice::Dropped { change, error, .. } => {
                eprintln!(
                    "{} {} {} skipped: {}",
                    at,
                    style("⚠").yellow(),
                    describe(change),
                    error
                );
            }
            SyncNotice::RefreshFailed { error } => {
                eprintln!(
                    "{} {} could not refresh cart: {}",
                    at,
                    style("⚠").yellow(),
                    error
                );
            }
        }
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

fn describe(change: &PendingChange) -> String {
    match change {
        PendingChange::SetQuantity {
            product_id,
            quantity,
            ..
        } => format!("set product {} to {}", product_id, quantity),
        PendingChange::RemoveProduct { product_id } => format!("remove product {}", product_id),
    }
}

/// Table cells for the row at `index`. The id column is what `cart remove` takes.
fn cart_columns(index: usize, row: &OverlayItem) -> [String; 6] {
    let quantity = if row.busy {
        format!("{}*", row.quantity)
    } else {
        row.quantity.to_string()
    };
    let cap = row
        .inventory_cap
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    [
        (index + 1).to_string(),
        truncate(row.product_id.as_str(), 10),
        truncate(&row.product_name, 28),
        quantity,
        cap,
        line_amount(row),
    ]
}

fn line_amount(row: &OverlayItem) -> String {
    row.effective_unit_price()
        .try_multiply(row.quantity)
        .map(|m| m.display())
        .unwrap_or_else(|| "overflow".to_string())
}

/// Shorten to `max` characters, marking the cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Seiko", 28), "Seiko");
        assert_eq!(truncate("Casio Edifice", 6), "Casio…");
    }

    #[test]
    fn test_cart_columns_show_product_id() {
        let item = CartItem::new(
            CartItemId::new("10"),
            ProductId::new("12"),
            "Diver",
            2,
            Money::new(80, Currency::VND),
        )
        .with_inventory_cap(5);
        let overlay = CartOverlay::from_items(&[item]);
        let row = overlay.get(0).unwrap();

        let cols = cart_columns(0, row);
        assert_eq!(cols[0], "1");
        assert_eq!(cols[1], "12");
        assert_eq!(cols[2], "Diver");
        assert_eq!(cols[3], "2");
        assert_eq!(cols[4], "5");
    }

    #[test]
    fn test_describe_change() {
        let change = PendingChange::RemoveProduct {
            product_id: ProductId::new("12"),
        };
        assert_eq!(describe(&change), "remove product 12");
    }
}
