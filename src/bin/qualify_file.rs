//! Qualifies a local sales report and prints the outreach table.
//!
//! Usage: `qualify_file <report.csv|report.xlsx> [first_occurrence|strict_customer]`

use std::env;

use lead_qualifier::config::Config;
use lead_qualifier::ingest::{read_table, UploadFormat};
use lead_qualifier::models::FilterPolicy;
use lead_qualifier::qualifier::qualify;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let path = args.next().ok_or_else(|| {
        anyhow::anyhow!(
            "Usage: qualify_file <report.csv|report.xlsx> [first_occurrence|strict_customer]"
        )
    })?;

    let config = Config::from_env()?;
    let mut options = config.qualify_options();
    if let Some(policy) = args.next() {
        options.policy = policy
            .parse::<FilterPolicy>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    let body = std::fs::read(&path)?;
    let format = UploadFormat::detect(None, Some(path.as_str()), None, &body)?;
    let table = read_table(format, &body)?;
    let outcome = qualify(&table, &options)?;

    let metrics = outcome.metrics;
    println!("=== Lead Qualification ({}) ===\n", options.policy);
    println!("Rows read:          {}", metrics.original_count);
    println!("Duplicates removed: {}", metrics.removed_duplicates);
    println!("Filtered out:       {}", metrics.removed_by_filter);
    println!("Leads ready:        {}\n", metrics.qualified_count);

    if outcome.leads.is_empty() {
        println!("No qualified leads found with the applied filters.");
        return Ok(());
    }

    for lead in &outcome.leads {
        println!(
            "{} | Ped: #{} | {} | {}",
            lead.formatted_first_name,
            lead.record.order_id,
            lead.formatted_value,
            lead.whatsapp_link
        );
    }

    Ok(())
}
