use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============ Invoice Records ============

/// Bill layout variant, chosen by the vision model from the document itself.
///
/// Business bills carry tax columns and a tax summary; personal bills are
/// informal expense captures and never compute tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Commercial invoice with HSN codes, discounts, and GST.
    #[default]
    Business,
    /// Hand-written or informal expense sheet, no tax logic.
    Personal,
}

impl Layout {
    /// True for the expense-sheet variant.
    pub fn is_personal(&self) -> bool {
        matches!(self, Layout::Personal)
    }
}

/// Root record produced by extraction and corrected in place by
/// [`crate::engine::reconcile`].
///
/// Numeric fields arrive loosely typed (string, number, or null, in
/// whatever form the bill printed them), so they are held as raw
/// [`Value`]s until the engine coerces them. Unknown keys the model
/// chooses to emit flow through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invoice {
    /// Business or personal; anything unrecognized reads as business.
    #[serde(default, deserialize_with = "layout_or_business")]
    pub layout: Layout,
    /// Free-form contact/metadata block, passed through unmodified.
    #[serde(default)]
    pub header: Map<String, Value>,
    /// Ordered line items.
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Summary block; `total_amount` is overwritten by the engine.
    #[serde(default)]
    pub footer: Footer,
}

/// One bill line, mutated in place by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItem {
    /// Serial number as printed, passed through.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub sn: Value,
    /// Description text; also drives the discount/adjustment heuristics.
    #[serde(default)]
    pub particulars: Value,
    /// HSN/SAC code, passed through; presence switches on the report column.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub hsn_sac: Value,
    /// Quantity; coerced, defaulted to 1 when missing on a priced line.
    #[serde(default)]
    pub quantity: Value,
    /// Unit rate; coerced, forced negative on discount/adjustment lines.
    #[serde(default)]
    pub rate: Value,
    /// Discount percentage; coerced, applied when positive.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub discount_percent: Value,
    /// Line amount. Input: fallback when no rate is readable. Output: the
    /// final tax-inclusive (business) or taxable (personal) value.
    #[serde(default)]
    pub amount: Value,
    /// Tax rate. Input: raw text as printed ("9% + 9%", "0.18", "incl").
    /// Output: normalized integer-percent display string.
    #[serde(default)]
    pub tax_rate: Value,
    /// Engine output: quantity times rate (or the amount fallback), 2 dp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_amount: Option<f64>,
    /// Engine output: gross times discount percentage, 2 dp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<f64>,
    /// Anything else the model emitted for this line, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Invoice summary block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Footer {
    /// Raw tax summary text as printed (e.g. "9% CGST + 9% SGST").
    #[serde(default)]
    pub tax_summary: Value,
    /// Grand total; overwritten by the engine with the reconciled sum.
    #[serde(default)]
    pub total_amount: Value,
    /// Amount in words, passed through.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub amount_in_words: Value,
    /// Anything else the model emitted for the footer, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reads the layout tag the way the extraction contract defines it: the
/// exact string `"personal"` selects personal mode, every other value
/// (unknown strings, null, wrong types) falls back to business.
fn layout_or_business<'de, D>(deserializer: D) -> Result<Layout, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw.as_str() {
        Some("personal") => Layout::Personal,
        _ => Layout::Business,
    })
}
