//! Receipt CSV export
//!
//! Pure formatting, no I/O. Field-level failures degrade to empty cells and
//! never abort the document.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{RawAmount, Receipt};

/// Escape a field for CSV output
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a monetary field with exactly two fractional digits, or empty when
/// the value is absent or not a number.
pub fn format_amount(value: Option<&RawAmount>) -> String {
    let n = match value {
        Some(RawAmount::Number(n)) => *n,
        Some(RawAmount::Text(s)) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return String::new(),
        },
        None => return String::new(),
    };

    if !n.is_finite() {
        return String::new();
    }

    // Round to cents first so halfway values round up instead of landing on
    // the binary representation below them.
    format!("{:.2}", (n * 100.0).round() / 100.0)
}

/// Render a calendar date in UTC, discarding time-of-day; empty when absent
/// or unparseable.
pub fn format_date(value: Option<&str>) -> String {
    let raw = match value {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return String::new(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc).format("%Y-%m-%d").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format("%Y-%m-%d").to_string();
    }

    String::new()
}

fn opt_field(value: Option<&str>) -> String {
    escape_csv_field(value.unwrap_or(""))
}

/// Build the export document for a receipt: a summary block, a blank line,
/// then one row per line item under an `Items` header. Lines are joined with
/// a single newline and an empty item list still yields the header rows.
pub fn build_receipt_csv(receipt: &Receipt) -> String {
    let mut lines = vec![
        format!("Merchant,{}", opt_field(receipt.merchant.as_deref())),
        format!(
            "Purchase Date,{}",
            format_date(receipt.purchase_date.as_deref())
        ),
        format!("Total,{}", format_amount(receipt.total.as_ref())),
        format!("Currency,{}", opt_field(receipt.currency.as_deref())),
        format!("Category,{}", opt_field(receipt.category.as_deref())),
        format!("Receipt ID,{}", escape_csv_field(&receipt.id)),
        String::new(),
        "Items".to_string(),
        "Name,Quantity,Price".to_string(),
    ];

    for item in &receipt.items {
        let quantity = item.quantity.map(|q| q.to_string()).unwrap_or_default();
        lines.push(format!(
            "{},{},{}",
            escape_csv_field(&item.name),
            quantity,
            format_amount(item.price.as_ref())
        ));
    }

    lines.join("\n")
}
