//! Utility to rerun the reconciliation engine over a saved extraction.
//!
//! Useful when debugging a bad report: dump the model reply to a JSON
//! file, tweak it, and re-reconcile without another model call.
//!
//! Usage: reconcile_file <extraction.json> [report.xlsx]

use billsheet_api::{engine, invoice::Invoice, report};
use std::env;
use std::fs;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let input_path = args
        .get(1)
        .ok_or_else(|| anyhow::anyhow!("usage: reconcile_file <extraction.json> [report.xlsx]"))?;

    let raw = fs::read_to_string(input_path)?;
    let mut invoice: Invoice = serde_json::from_str(&raw)?;

    engine::reconcile(&mut invoice);
    println!("{}", serde_json::to_string_pretty(&invoice)?);

    if let Some(report_path) = args.get(2) {
        let bytes = report::render_report(&invoice)
            .map_err(|e| anyhow::anyhow!("report rendering failed: {}", e))?;
        fs::write(report_path, bytes)?;
        eprintln!("report written to {}", report_path);
    }

    Ok(())
}
