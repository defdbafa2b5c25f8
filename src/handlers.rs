use crate::cache::QualificationCache;
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::ingest::UploadFormat;
use crate::messaging::{is_plausible_br_phone, phone_digits, whatsapp_link};
use crate::models::*;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Content-keyed memoization of qualification outcomes.
    pub cache: QualificationCache,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let cache = QualificationCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_max_entries,
        );
        Self { config, cache }
    }
}

/// Lead API routes. Uploads up to `max_upload_bytes` are accepted.
pub fn api_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/leads/qualify", post(qualify_upload))
        .route("/api/v1/leads/link", post(build_link))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-qualifier",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/leads/qualify
///
/// Accepts a raw CSV or XLSX report as the request body and returns the
/// qualified leads, either as JSON or (`output=csv`) as a CSV export.
///
/// The format comes from `format`, else the `filename` extension, else the
/// `Content-Type` header, else the XLSX zip signature.
pub async fn qualify_upload(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QualifyQueryParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    tracing::info!(
        "POST /leads/qualify - {} bytes, params: {:?}",
        body.len(),
        params
    );

    if body.is_empty() {
        return Err(AppError::BadRequest("Upload body is empty".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let format = UploadFormat::detect(
        params.format.as_deref(),
        params.filename.as_deref(),
        content_type,
        &body,
    )?;

    let mut options = state.config.qualify_options();
    if let Some(policy) = params.policy.as_deref() {
        options.policy = policy.parse().map_err(AppError::BadRequest)?;
    }

    let export_csv = match params.output.as_deref().map(str::to_ascii_lowercase) {
        None => false,
        Some(output) if output == "json" => false,
        Some(output) if output == "csv" => true,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown output '{}' (expected json or csv)",
                other
            )))
        }
    };

    let (outcome, cached) = state
        .cache
        .get_or_qualify(format, &options, &body)
        .await
        .with_context(|| format!("Qualifying {} upload", format))?;

    tracing::info!(
        "Qualification done: {} leads ready (cached: {})",
        outcome.metrics.qualified_count,
        cached
    );

    if export_csv {
        let csv = leads_to_csv(&outcome.leads)?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"leads_qualificados.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }

    let response = QualifyResponse {
        metrics: outcome.metrics,
        policy: options.policy,
        leads: outcome.leads.clone(),
        cached,
        processed_at: chrono::Utc::now(),
    };

    Ok(Json(response).into_response())
}

/// POST /api/v1/leads/link
///
/// Builds a WhatsApp deep link for an arbitrary phone and message, using the
/// configured country code.
pub async fn build_link(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LinkRequest>,
) -> Json<LinkResponse> {
    let link = whatsapp_link(
        &request.phone,
        &request.message,
        &state.config.whatsapp_country_code,
    );

    Json(LinkResponse {
        link,
        phone_digits: phone_digits(&request.phone),
        phone_valid: is_plausible_br_phone(&request.phone),
    })
}

/// Export columns, one row per qualified lead.
pub const EXPORT_HEADERS: [&str; 8] = [
    COL_ID,
    "Cliente_Formatado",
    COL_ORDER_ID,
    "Valor_BRL",
    COL_PHONE,
    "Telefone_Valido",
    "Link_WhatsApp",
    "Mensagem_Personalizada",
];

/// Renders qualified leads as CSV.
pub fn leads_to_csv(leads: &[QualifiedLead]) -> Result<Vec<u8>, AppError> {
    let export_error =
        |e: csv::Error| AppError::InternalError(format!("CSV export failed: {}", e));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS).map_err(export_error)?;

    for lead in leads {
        writer.write_record([
            lead.record.customer_id.as_str(),
            lead.formatted_first_name.as_str(),
            lead.record.order_id.as_str(),
            lead.formatted_value.as_str(),
            lead.record.phone.as_str(),
            if lead.phone_valid { "sim" } else { "nao" },
            lead.whatsapp_link.as_str(),
            lead.personalized_message.as_str(),
        ])
        .map_err(export_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("Failed to finish CSV export: {}", e)))
}
