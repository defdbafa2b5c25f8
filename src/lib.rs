//! Lead Qualifier
//!
//! Turns a sales report (CSV or XLSX) into a WhatsApp outreach list: rows
//! with a saved-but-unsent order and no orders sent, one per customer, each
//! with a personalized message and a `wa.me` deep link.
//!
//! # Modules
//!
//! - `qualifier`: column validation, dedup, filter and enrichment.
//! - `currency`: Brazilian Real parsing and formatting.
//! - `messaging`: first name, message template and WhatsApp links.
//! - `ingest`: CSV/XLSX decoding.
//! - `cache`: content-keyed memoization of qualification outcomes.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Data models.

pub mod cache;
pub mod config;
pub mod currency;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod messaging;
pub mod models;
pub mod qualifier;

pub use errors::AppError;
pub use models::{QualificationOutcome, QualifiedLead, QualifyMetrics, QualifyOptions};
pub use qualifier::{qualify, qualify_records};
