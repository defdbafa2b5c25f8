//! Lead qualification: the rule set that turns a sales report into an
//! outreach list.
//!
//! 1. Check the upload has every required column
//! 2. Normalize "Quant. Pedidos Enviados" (unreadable values become -1)
//! 3. Keep the first row per customer id
//! 4. Keep rows with the qualifying status and zero orders sent
//! 5. Build first name, message, currency and WhatsApp link per row
//!
//! The whole pass is a pure function of its inputs.
use std::collections::HashSet;

use crate::currency::format_brl;
use crate::errors::AppError;
use crate::messaging::{
    build_message, button_label, format_first_name, is_plausible_br_phone, whatsapp_link,
    Signature,
};
use crate::models::{
    FilterPolicy, LeadRecord, LeadTable, QualificationOutcome, QualifiedLead, QualifyMetrics,
    QualifyOptions, COL_ID, COL_NAME, COL_ORDERS_SENT, COL_ORDER_ID, COL_PHONE, COL_STATUS,
    COL_TOTAL_VALUE, REQUIRED_COLUMNS,
};

/// Count substituted for orders-sent values that are not integers.
/// Never equal to zero, so such rows never qualify.
pub const INVALID_COUNT: i64 = -1;

/// Checks that `table` has every required column.
///
/// Fails with `MissingColumns` listing all absent headers, not just the first.
pub fn validate_columns(table: &LeadTable) -> Result<(), AppError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| table.column_index(col).is_none())
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingColumns(missing))
    }
}

/// Extracts the required columns of every row.
pub fn records_from_table(table: &LeadTable) -> Result<Vec<LeadRecord>, AppError> {
    validate_columns(table)?;

    // validate_columns guarantees every lookup succeeds
    let index = |name: &str| table.column_index(name).unwrap_or(usize::MAX);
    let (id, name, phone, sent, status, order, value) = (
        index(COL_ID),
        index(COL_NAME),
        index(COL_PHONE),
        index(COL_ORDERS_SENT),
        index(COL_STATUS),
        index(COL_ORDER_ID),
        index(COL_TOTAL_VALUE),
    );

    let records = table
        .rows
        .iter()
        .map(|row| {
            let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
            LeadRecord {
                customer_id: cell(id),
                customer_name: cell(name),
                phone: cell(phone),
                orders_sent_count: cell(sent),
                status: cell(status),
                order_id: cell(order),
                total_value: cell(value),
            }
        })
        .collect();

    Ok(records)
}

/// Coerces an orders-sent cell to an integer.
///
/// Accepts integers and integral decimals (`"0"`, `" 2 "`, `"0.0"`); anything
/// else, including blanks, yields `INVALID_COUNT`.
pub fn normalize_orders_sent(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }

    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => f as i64,
        _ => {
            tracing::debug!("Orders-sent value treated as invalid: {:?}", raw);
            INVALID_COUNT
        }
    }
}

/// Qualifies an uploaded table.
pub fn qualify(
    table: &LeadTable,
    options: &QualifyOptions,
) -> Result<QualificationOutcome, AppError> {
    let records = records_from_table(table)?;
    Ok(qualify_records(&records, options))
}

/// Qualifies already-extracted records.
pub fn qualify_records(records: &[LeadRecord], options: &QualifyOptions) -> QualificationOutcome {
    let original_count = records.len();

    let disqualified_customers: HashSet<&str> = match options.policy {
        FilterPolicy::FirstOccurrence => HashSet::new(),
        FilterPolicy::StrictCustomer => records
            .iter()
            .filter(|r| r.status != options.qualifying_status)
            .map(|r| r.customer_id.as_str())
            .collect(),
    };

    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
    let deduplicated: Vec<&LeadRecord> = records
        .iter()
        .filter(|r| seen.insert(r.customer_id.as_str()))
        .collect();
    let removed_duplicates = original_count - deduplicated.len();

    let signature = Signature {
        consultant: &options.consultant_name,
        brand: &options.brand_name,
    };

    let leads: Vec<QualifiedLead> = deduplicated
        .iter()
        .filter(|r| r.status == options.qualifying_status)
        .filter(|r| normalize_orders_sent(&r.orders_sent_count) == 0)
        .filter(|r| !disqualified_customers.contains(r.customer_id.as_str()))
        .map(|r| enrich(r, options, signature))
        .collect();

    let metrics = QualifyMetrics {
        original_count,
        removed_duplicates,
        removed_by_filter: deduplicated.len() - leads.len(),
        qualified_count: leads.len(),
    };

    tracing::info!(
        "Qualified {} of {} rows ({} duplicates, {} filtered, policy {})",
        metrics.qualified_count,
        metrics.original_count,
        metrics.removed_duplicates,
        metrics.removed_by_filter,
        options.policy
    );

    QualificationOutcome { leads, metrics }
}

fn enrich(
    record: &LeadRecord,
    options: &QualifyOptions,
    signature: Signature<'_>,
) -> QualifiedLead {
    let first_name = format_first_name(&record.customer_name);
    let message = build_message(&first_name, &record.order_id, signature);
    let link = whatsapp_link(&record.phone, &message, &options.country_code);

    QualifiedLead {
        lead_key: record.customer_id.clone(),
        record: record.clone(),
        formatted_value: format_brl(&record.total_value),
        whatsapp_link: link,
        button_label: button_label(&record.order_id),
        phone_valid: is_plausible_br_phone(&record.phone),
        formatted_first_name: first_name,
        personalized_message: message,
    }
}
