use regex::Regex;

/// Standard GST slabs. Inferred rates are expected to land on one of these.
pub const STANDARD_SLABS: [f64; 5] = [0.0, 5.0, 12.0, 18.0, 28.0];

/// Tolerance when matching an inferred rate against a slab.
pub const SLAB_TOLERANCE: f64 = 0.1;

/// Values above this in a footer tax summary are monetary amounts, not rates.
pub const SUMMARY_NOISE_CAP: f64 = 50.0;

/// Values above this in an item tax string are monetary amounts, not rates.
pub const ITEM_NOISE_CAP: f64 = 100.0;

/// Half-of-a-split-tax readings and the slab they snap to.
const HALF_RATE_SNAPS: [(f64, f64); 4] = [(2.5, 5.0), (6.0, 12.0), (9.0, 18.0), (14.0, 28.0)];

/// Infers a tax percentage from free text like `"9% CGST + 9% SGST"` or
/// `"IGST @ 18% = 540.00"`.
///
/// Every unsigned number in the text is harvested; anything above
/// `noise_cap` is discarded as a stray monetary amount. Split-rate
/// summaries list each half separately and must be added, so the sum of
/// the survivors wins when it lands on a standard slab; otherwise the
/// largest single value is taken, which keeps an already-combined rate
/// from being summed with surrounding noise.
///
/// Returns `0.0` when the text carries no usable number.
pub fn infer_rate(text: &str, noise_cap: f64) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    // Unsigned on purpose: a dash before a rate is a separator, not a sign
    let rate_regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    let rates: Vec<f64> = rate_regex
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|r| *r <= noise_cap)
        .collect();
    if rates.is_empty() {
        return 0.0;
    }

    let sum: f64 = rates.iter().sum();
    let max = rates.iter().cloned().fold(f64::MIN, f64::max);
    if STANDARD_SLABS
        .iter()
        .any(|slab| (sum - slab).abs() < SLAB_TOLERANCE)
    {
        sum
    } else {
        max
    }
}

/// Snaps a rate that reads as half of a split tax onto its full slab.
///
/// Models frequently report only the CGST half of a CGST+SGST pair, so a
/// bill taxed at 18% comes back as 9%. The snap table covers every slab
/// that splits into equal halves.
pub fn correct_half_rate(pct: f64) -> f64 {
    for (half, full) in HALF_RATE_SNAPS {
        if (pct - half).abs() < SLAB_TOLERANCE {
            return full;
        }
    }
    pct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_rates_are_summed() {
        assert_eq!(infer_rate("9% CGST + 9% SGST", SUMMARY_NOISE_CAP), 18.0);
        assert_eq!(infer_rate("CGST 2.5% SGST 2.5%", SUMMARY_NOISE_CAP), 5.0);
        assert_eq!(infer_rate("6% + 6%", SUMMARY_NOISE_CAP), 12.0);
    }

    #[test]
    fn combined_rate_is_not_summed_with_noise() {
        // 18 + 18 = 36 is no slab, so the max wins
        assert_eq!(infer_rate("18% GST (18% IGST)", SUMMARY_NOISE_CAP), 18.0);
    }

    #[test]
    fn single_rate_passes_through() {
        assert_eq!(infer_rate("18% GST", SUMMARY_NOISE_CAP), 18.0);
        assert_eq!(infer_rate("GST @ 12%", SUMMARY_NOISE_CAP), 12.0);
    }

    #[test]
    fn monetary_amounts_are_discarded() {
        assert_eq!(infer_rate("Total tax 450.00 @ 18%", SUMMARY_NOISE_CAP), 18.0);
        assert_eq!(infer_rate("IGST @ 18% = 540", ITEM_NOISE_CAP), 18.0);
    }

    #[test]
    fn all_noise_means_no_rate() {
        assert_eq!(infer_rate("Rs 4500 tax paid", SUMMARY_NOISE_CAP), 0.0);
        assert_eq!(infer_rate("included", SUMMARY_NOISE_CAP), 0.0);
        assert_eq!(infer_rate("", SUMMARY_NOISE_CAP), 0.0);
    }

    #[test]
    fn half_rates_snap_to_full_slab() {
        assert_eq!(correct_half_rate(9.0), 18.0);
        assert_eq!(correct_half_rate(6.0), 12.0);
        assert_eq!(correct_half_rate(2.5), 5.0);
        assert_eq!(correct_half_rate(14.0), 28.0);
        assert_eq!(correct_half_rate(9.05), 18.0);
    }

    #[test]
    fn full_rates_are_left_alone() {
        assert_eq!(correct_half_rate(18.0), 18.0);
        assert_eq!(correct_half_rate(5.0), 5.0);
        assert_eq!(correct_half_rate(0.0), 0.0);
        assert_eq!(correct_half_rate(28.0), 28.0);
    }

    #[test]
    fn lone_half_rate_ends_at_full_slab() {
        // inference then correction, the way the engine chains them
        assert_eq!(correct_half_rate(infer_rate("9%", SUMMARY_NOISE_CAP)), 18.0);
        assert_eq!(correct_half_rate(infer_rate("14% GST", SUMMARY_NOISE_CAP)), 28.0);
    }
}
