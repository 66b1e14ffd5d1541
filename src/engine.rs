use crate::coerce::{extract_number, text_of};
use crate::invoice::{Invoice, LineItem};
use crate::tax;
use serde_json::Value;

/// Reconciles an extracted invoice in place.
///
/// The vision model reads numbers off a photo; this pass makes them add
/// up. Line by line it derives quantity, rate, discount, taxable value,
/// tax, and final amount from the raw fields, then rewrites each item and
/// the footer total with the corrected values. It is pure and total:
/// no I/O, nothing fails, malformed fields degrade to zero.
///
/// Workflow:
/// 1. Infer the bill-wide tax rate from the footer tax summary
///    (business mode only; personal bills never compute tax).
/// 2. Derive each item independently, inheriting the bill-wide rate when
///    the item has no usable tax text of its own.
/// 3. Accumulate the grand total from the rounded item amounts.
pub fn reconcile(invoice: &mut Invoice) {
    let is_personal = invoice.layout.is_personal();

    let mut global_tax_pct = 0.0;
    if !is_personal {
        let summary = text_of(&invoice.footer.tax_summary);
        global_tax_pct = tax::correct_half_rate(tax::infer_rate(&summary, tax::SUMMARY_NOISE_CAP));
    }

    let mut running_total = 0.0;
    for item in &mut invoice.items {
        running_total += reconcile_item(item, is_personal, global_tax_pct);
    }

    invoice.footer.total_amount = Value::from(round2(running_total));
}

/// Derives one line and writes the corrected fields back.
/// Returns the final rounded amount for the running total.
fn reconcile_item(item: &mut LineItem, is_personal: bool, global_tax_pct: f64) -> f64 {
    let mut qty = extract_number(&item.quantity);
    let mut rate = extract_number(&item.rate);
    let disc_pct = extract_number(&item.discount_percent);
    let desc = text_of(&item.particulars).to_lowercase();

    // Credit lines come back with a positive rate more often than not
    let is_reduction =
        desc.contains("discount") || desc.contains("adjustment") || desc.contains("less");
    if is_reduction && rate > 0.0 {
        rate = -rate.abs();
    }
    // A missing quantity must not collapse a priced line to zero
    if qty == 0.0 && rate != 0.0 {
        qty = 1.0;
    }

    let gross_amount = if rate != 0.0 {
        qty * rate
    } else {
        // No usable rate: trust the printed line amount instead
        let mut fallback = extract_number(&item.amount);
        if (desc.contains("discount") || desc.contains("adjustment")) && fallback > 0.0 {
            fallback = -fallback.abs();
        }
        fallback
    };

    let discount_amount = if disc_pct > 0.0 {
        gross_amount * (disc_pct / 100.0)
    } else {
        0.0
    };
    let taxable_value = gross_amount - discount_amount;

    let mut applicable_pct = 0.0;
    if !is_personal {
        applicable_pct = tax::infer_rate(&text_of(&item.tax_rate), tax::ITEM_NOISE_CAP);
        if applicable_pct == 0.0 && global_tax_pct > 0.0 {
            applicable_pct = global_tax_pct;
        }
        applicable_pct = tax::correct_half_rate(applicable_pct);
    }

    // Rates below 1.0 are already fractions (0.18 meaning 18%)
    let (calc_factor, display_pct) = if applicable_pct < 1.0 {
        (applicable_pct, applicable_pct * 100.0)
    } else {
        (applicable_pct / 100.0, applicable_pct)
    };

    let tax_amount = taxable_value * calc_factor;
    let final_amount = if is_personal {
        round2(taxable_value)
    } else {
        round2(taxable_value + tax_amount)
    };

    item.quantity = Value::from(round2(qty));
    item.rate = Value::from(round2(rate));
    item.gross_amount = Some(round2(gross_amount));
    item.discount_amount = Some(round2(discount_amount));
    item.amount = Value::from(final_amount);
    item.tax_rate = Value::from(format_display_rate(display_pct));

    final_amount
}

/// Formats the normalized tax rate for display, integer-truncated.
fn format_display_rate(display_pct: f64) -> String {
    if display_pct > 0.0 {
        format!("{}%", display_pct.trunc() as i64)
    } else {
        "0%".to_string()
    }
}

/// Rounds to two decimals. Non-finite values (which only arise from
/// pathological inputs overflowing a product) collapse to zero, matching
/// the coercion rule that unusable numbers degrade rather than poison the
/// record.
fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.is_finite() {
        rounded
    } else {
        0.0
    }
}
