use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============ Upload Columns ============

pub const COL_ID: &str = "Codigo Cliente";
pub const COL_NAME: &str = "Cliente";
pub const COL_PHONE: &str = "Fone Fixo";
pub const COL_ORDERS_SENT: &str = "Quant. Pedidos Enviados";
pub const COL_STATUS: &str = "Status";
pub const COL_ORDER_ID: &str = "N. Pedido";
pub const COL_TOTAL_VALUE: &str = "Valor Total";

/// Every column an upload must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_ID,
    COL_NAME,
    COL_PHONE,
    COL_ORDERS_SENT,
    COL_STATUS,
    COL_ORDER_ID,
    COL_TOTAL_VALUE,
];

// ============ Tabular Input ============

/// A decoded upload: one header row and string cells.
///
/// Rows may be shorter than the header; absent cells read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LeadTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of the first header equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One input row, restricted to the required columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub customer_id: String,
    pub customer_name: String,
    pub phone: String,
    /// Raw text of "Quant. Pedidos Enviados".
    pub orders_sent_count: String,
    pub status: String,
    pub order_id: String,
    pub total_value: String,
}

// ============ Qualification ============

/// How customers with several rows are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPolicy {
    /// Keep the first row per customer, then apply the status/count filter to it.
    #[default]
    FirstOccurrence,
    /// As `FirstOccurrence`, but drop any customer that has a row with a
    /// non-qualifying status anywhere in the upload.
    StrictCustomer,
}

impl FilterPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterPolicy::FirstOccurrence => "first_occurrence",
            FilterPolicy::StrictCustomer => "strict_customer",
        }
    }
}

impl fmt::Display for FilterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_occurrence" | "first" | "loose" => Ok(FilterPolicy::FirstOccurrence),
            "strict_customer" | "strict" => Ok(FilterPolicy::StrictCustomer),
            other => Err(format!(
                "unknown filter policy '{}' (expected first_occurrence or strict_customer)",
                other
            )),
        }
    }
}

/// Inputs to `qualify` besides the table itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifyOptions {
    pub qualifying_status: String,
    pub policy: FilterPolicy,
    /// Country calling code prefixed to every WhatsApp number.
    pub country_code: String,
    /// Consultant who signs the outreach message.
    pub consultant_name: String,
    pub brand_name: String,
}

impl Default for QualifyOptions {
    fn default() -> Self {
        crate::config::Config::default().qualify_options()
    }
}

/// A lead that passed the filter, with everything needed to contact it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedLead {
    /// Stable identifier for external "contacted" tracking (the customer id).
    pub lead_key: String,
    #[serde(flatten)]
    pub record: LeadRecord,
    pub formatted_first_name: String,
    pub personalized_message: String,
    pub formatted_value: String,
    pub whatsapp_link: String,
    pub button_label: String,
    /// Whether the phone parses as a Brazilian number. Informational only.
    pub phone_valid: bool,
}

/// Row counters for one qualification run.
///
/// `original_count == removed_duplicates + removed_by_filter + qualified_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifyMetrics {
    pub original_count: usize,
    pub removed_duplicates: usize,
    pub removed_by_filter: usize,
    pub qualified_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationOutcome {
    pub leads: Vec<QualifiedLead>,
    pub metrics: QualifyMetrics,
}

// ============ API Models ============

/// Response body of `POST /api/v1/leads/qualify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifyResponse {
    pub metrics: QualifyMetrics,
    pub policy: FilterPolicy,
    pub leads: Vec<QualifiedLead>,
    /// Whether the outcome was served from the memoization cache.
    pub cached: bool,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualifyQueryParams {
    pub format: Option<String>,
    pub filename: Option<String>,
    pub policy: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkRequest {
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResponse {
    pub link: String,
    pub phone_digits: String,
    pub phone_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_aliases() {
        assert_eq!(
            "strict".parse::<FilterPolicy>(),
            Ok(FilterPolicy::StrictCustomer)
        );
        assert_eq!(
            " First_Occurrence ".parse::<FilterPolicy>(),
            Ok(FilterPolicy::FirstOccurrence)
        );
        assert!("newest".parse::<FilterPolicy>().is_err());
    }

    #[test]
    fn qualified_lead_serializes_flat() {
        let lead = QualifiedLead {
            lead_key: "7".into(),
            record: LeadRecord {
                customer_id: "7".into(),
                customer_name: "ana".into(),
                phone: "11 91234-5678".into(),
                orders_sent_count: "0".into(),
                status: "Pedido Salvo".into(),
                order_id: "100".into(),
                total_value: "10,00".into(),
            },
            formatted_first_name: "Ana".into(),
            personalized_message: "Olá Ana!".into(),
            formatted_value: "R$ 10,00".into(),
            whatsapp_link: "https://wa.me/5511912345678?text=Ol%C3%A1%20Ana%21".into(),
            button_label: "Chamar no WhatsApp (Pedido 100)".into(),
            phone_valid: true,
        };

        let value = serde_json::to_value(&lead).unwrap();
        assert_eq!(value["customer_id"], "7");
        assert_eq!(value["lead_key"], "7");
        assert_eq!(value["formatted_value"], "R$ 10,00");
    }

    #[test]
    fn table_column_lookup() {
        let table = LeadTable::new(vec!["Status".into(), "Cliente".into()], vec![]);
        assert_eq!(table.column_index(COL_NAME), Some(1));
        assert_eq!(table.column_index(COL_ID), None);
        assert!(table.is_empty());
    }
}
