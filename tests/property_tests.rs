/// Property-based tests using proptest
/// Tests invariants that must hold for arbitrary extracted payloads
use billsheet_api::coerce::extract_from_text;
use billsheet_api::engine::reconcile;
use billsheet_api::invoice::Invoice;
use billsheet_api::tax::{correct_half_rate, infer_rate, ITEM_NOISE_CAP, SUMMARY_NOISE_CAP};
use proptest::prelude::*;
use serde_json::json;

// Property: Numeric coercion should never panic and never produce NaN
proptest! {
    #[test]
    fn coercion_never_panics(text in "\\PC*") {
        let value = extract_from_text(&text);
        prop_assert!(!value.is_nan());
    }

    #[test]
    fn displayed_numbers_coerce_back_to_themselves(value in -1_000_000.0f64..1_000_000.0f64) {
        let text = format!("{}", value);
        prop_assert_eq!(extract_from_text(&text), value);
    }

    #[test]
    fn unit_prefixes_do_not_change_the_number(
        prefix in "[A-Za-z ]{0,8}",
        number in 0u32..1_000_000u32
    ) {
        let text = format!("{}{}", prefix, number);
        prop_assert_eq!(extract_from_text(&text), f64::from(number));
    }
}

// Property: Tax inference stays inside sane bounds for any input text
proptest! {
    #[test]
    fn inferred_rates_are_bounded(text in "\\PC*") {
        let summary_rate = infer_rate(&text, SUMMARY_NOISE_CAP);
        let item_rate = infer_rate(&text, ITEM_NOISE_CAP);
        // A rate is either a capped single value or a sum near a slab
        prop_assert!((0.0..=SUMMARY_NOISE_CAP).contains(&summary_rate));
        prop_assert!((0.0..=ITEM_NOISE_CAP).contains(&item_rate));
    }

    #[test]
    fn half_rate_correction_is_idempotent(pct in 0.0f64..100.0f64) {
        let once = correct_half_rate(pct);
        prop_assert_eq!(correct_half_rate(once), once);
    }
}

// Property: Reconciliation must be total over arbitrary field text
proptest! {
    #[test]
    fn reconcile_never_panics_on_messy_fields(
        particulars in "\\PC*",
        quantity in "\\PC*",
        rate in "\\PC*",
        tax in "\\PC*",
    ) {
        let mut invoice: Invoice = serde_json::from_value(json!({
            "items": [{
                "particulars": particulars,
                "quantity": quantity,
                "rate": rate,
                "amount": "12",
                "tax_rate": tax.clone()
            }],
            "footer": {"tax_summary": tax}
        }))
        .unwrap();

        reconcile(&mut invoice);

        let amount = invoice.items[0].amount.as_f64().unwrap();
        let total = invoice.footer.total_amount.as_f64().unwrap();
        prop_assert!(amount.is_finite());
        prop_assert!(total.is_finite());
    }

    #[test]
    fn gross_amount_is_quantity_times_rate(qty in 1u32..500u32, rate in 1u32..100_000u32) {
        let mut invoice: Invoice = serde_json::from_value(json!({
            "items": [{"particulars": "Line", "quantity": qty, "rate": rate}]
        }))
        .unwrap();

        reconcile(&mut invoice);

        prop_assert_eq!(
            invoice.items[0].gross_amount,
            Some(f64::from(qty) * f64::from(rate))
        );
    }

    #[test]
    fn business_amount_follows_the_tax_formula(
        qty in 1u32..500u32,
        rate in 1u32..100_000u32,
        slab_idx in 0usize..5usize,
    ) {
        let slabs = [0.0f64, 5.0, 12.0, 18.0, 28.0];
        let pct = slabs[slab_idx];
        let mut invoice: Invoice = serde_json::from_value(json!({
            "items": [{
                "particulars": "Line",
                "quantity": qty,
                "rate": rate,
                "tax_rate": format!("{}%", pct as u32)
            }]
        }))
        .unwrap();

        reconcile(&mut invoice);

        let gross = f64::from(qty) * f64::from(rate);
        let expected = ((gross + gross * (pct / 100.0)) * 100.0).round() / 100.0;
        prop_assert_eq!(invoice.items[0].amount.as_f64(), Some(expected));
    }

    #[test]
    fn personal_amounts_carry_no_tax(
        qty in 1u32..500u32,
        rate in 1u32..100_000u32,
        tax in "\\PC*",
    ) {
        let mut invoice: Invoice = serde_json::from_value(json!({
            "layout": "personal",
            "items": [{"particulars": "Line", "quantity": qty, "rate": rate, "tax_rate": tax}]
        }))
        .unwrap();

        reconcile(&mut invoice);

        prop_assert_eq!(
            invoice.items[0].amount.as_f64(),
            Some(f64::from(qty) * f64::from(rate))
        );
        prop_assert_eq!(invoice.items[0].tax_rate.as_str(), Some("0%"));
    }

    #[test]
    fn footer_total_is_the_rounded_sum_of_amounts(
        lines in prop::collection::vec((1u32..100u32, 1u32..10_000u32), 1..6)
    ) {
        let items: Vec<serde_json::Value> = lines
            .iter()
            .map(|(qty, rate)| json!({"particulars": "Line", "quantity": qty, "rate": rate}))
            .collect();
        let mut invoice: Invoice =
            serde_json::from_value(json!({"items": items, "footer": {"tax_summary": "18% GST"}}))
                .unwrap();

        reconcile(&mut invoice);

        let sum = invoice
            .items
            .iter()
            .map(|item| item.amount.as_f64().unwrap())
            .fold(0.0, |acc, amount| acc + amount);
        let expected = (sum * 100.0).round() / 100.0;
        prop_assert_eq!(invoice.footer.total_amount.as_f64(), Some(expected));
    }

    #[test]
    fn reconciling_twice_matches_reconciling_once(
        qty in 1u32..100u32,
        rate in 1u32..10_000u32,
        slab_idx in 0usize..5usize,
    ) {
        let slabs = [0.0f64, 5.0, 12.0, 18.0, 28.0];
        let mut invoice: Invoice = serde_json::from_value(json!({
            "items": [{
                "particulars": "Line",
                "quantity": qty,
                "rate": rate,
                "tax_rate": format!("{}%", slabs[slab_idx] as u32)
            }]
        }))
        .unwrap();

        reconcile(&mut invoice);
        let first = serde_json::to_value(&invoice).unwrap();
        reconcile(&mut invoice);
        let second = serde_json::to_value(&invoice).unwrap();

        prop_assert_eq!(first, second);
    }
}
