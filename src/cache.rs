use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::AppError;
use crate::ingest::{read_table, UploadFormat};
use crate::models::{QualificationOutcome, QualifyOptions};
use crate::qualifier::qualify;

/// Memoizes qualification outcomes by upload content.
///
/// Qualification is pure, so an identical upload with identical options can
/// reuse an earlier outcome. Failures are never cached.
#[derive(Clone)]
pub struct QualificationCache {
    outcomes: Cache<String, Arc<QualificationOutcome>>,
}

impl QualificationCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let outcomes = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_entries)
            .build();
        Self { outcomes }
    }

    /// SHA-256 (hex) over the format, every qualification option and the
    /// raw upload bytes. Each field is length-prefixed so that adjacent
    /// fields cannot run into each other.
    pub fn content_key(format: UploadFormat, options: &QualifyOptions, body: &[u8]) -> String {
        let mut hasher = Sha256::new();
        for field in [
            format.as_str().as_bytes(),
            options.qualifying_status.as_bytes(),
            options.policy.as_str().as_bytes(),
            options.country_code.as_bytes(),
            options.consultant_name.as_bytes(),
            options.brand_name.as_bytes(),
            body,
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        hex::encode(hasher.finalize())
    }

    /// Returns the cached outcome for this upload, or decodes and qualifies
    /// it. The flag is `true` when the outcome came from the cache.
    pub async fn get_or_qualify(
        &self,
        format: UploadFormat,
        options: &QualifyOptions,
        body: &[u8],
    ) -> Result<(Arc<QualificationOutcome>, bool), AppError> {
        let key = Self::content_key(format, options, body);

        if let Some(outcome) = self.outcomes.get(&key).await {
            tracing::debug!("Qualification cache hit: {}", &key[..12]);
            return Ok((outcome, true));
        }

        let table = read_table(format, body)?;
        let outcome = Arc::new(qualify(&table, options)?);
        self.outcomes.insert(key, outcome.clone()).await;

        Ok((outcome, false))
    }

    pub async fn invalidate_all(&self) {
        self.outcomes.invalidate_all();
        self.outcomes.run_pending_tasks().await;
    }
}
