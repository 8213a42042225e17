use async_trait::async_trait;
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;

use crate::dto::import_dto::ParsedCv;
use crate::dto::sheet_dto::{SheetSettingsPayload, SyncReport};
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::activity_log::{ActivityType, TargetType};
use crate::models::sheet_sync::SheetSyncState;
use crate::services::activity_service::{ActivityService, NewActivity};
use crate::services::cv_service::{apply_update, insert_cv};
use crate::services::import_service::{parse_rows, parse_table, SpreadsheetKind};

const STATE_COLUMNS: &str = "auto_sync, interval_seconds, last_synced_at, last_result, updated_at";
const SYNC_SOURCE: &str = "Google Sheets";

/// Where the published sheet comes from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SheetSource {
    async fn fetch_csv(&self) -> Result<Vec<u8>>;
}

/// A sheet published to the web as CSV.
pub struct HttpSheetSource {
    client: Client,
    url: String,
}

impl HttpSheetSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SheetSource for HttpSheetSource {
    async fn fetch_csv(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// Downloads the sheet and splits it into valid rows and row errors.
pub async fn fetch_rows(source: &(dyn SheetSource + Send + Sync)) -> Result<(Vec<ParsedCv>, Vec<String>)> {
    let bytes = source.fetch_csv().await?;
    let table = parse_table(&bytes, SpreadsheetKind::Csv)?;
    let (valid, invalid): (Vec<ParsedCv>, Vec<ParsedCv>) =
        parse_rows(&table).into_iter().partition(|cv| cv.is_valid);
    let errors = invalid.into_iter().flat_map(|cv| cv.errors).collect();
    Ok((valid, errors))
}

#[derive(Clone)]
pub struct SheetSyncService {
    pool: PgPool,
    source: Option<Arc<dyn SheetSource + Send + Sync>>,
    activity: ActivityService,
}

impl SheetSyncService {
    pub fn new(
        pool: PgPool,
        source: Option<Arc<dyn SheetSource + Send + Sync>>,
        activity: ActivityService,
    ) -> Self {
        Self { pool, source, activity }
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    pub async fn state(&self) -> Result<SheetSyncState> {
        let query = format!("SELECT {} FROM sheet_sync_state WHERE id = 1", STATE_COLUMNS);
        let state = sqlx::query_as::<_, SheetSyncState>(&query)
            .fetch_one(&self.pool)
            .await?;
        Ok(state)
    }

    pub async fn update_settings(&self, payload: &SheetSettingsPayload) -> Result<SheetSyncState> {
        let query = format!(
            "UPDATE sheet_sync_state SET auto_sync = $1, interval_seconds = $2, updated_at = NOW()
             WHERE id = 1 RETURNING {}",
            STATE_COLUMNS
        );
        let state = sqlx::query_as::<_, SheetSyncState>(&query)
            .bind(payload.auto_sync)
            .bind(payload.interval_seconds)
            .fetch_one(&self.pool)
            .await?;
        Ok(state)
    }

    /// Upserts the sheet's valid rows by reference code. `None` actor means the background worker.
    pub async fn sync(&self, actor: Option<&CurrentUser>) -> Result<SyncReport> {
        let source = self.source.as_ref().ok_or(Error::SyncNotConfigured)?;
        let (rows, errors) = fetch_rows(source.as_ref()).await?;
        let actor_id = actor.map(|u| u.id);

        let mut report = SyncReport {
            errors,
            ..Default::default()
        };
        let mut tx = self.pool.begin().await?;
        for row in &rows {
            let mut payload = row.to_payload();
            let existing = match row.reference_code.as_deref() {
                Some(code) => {
                    sqlx::query_scalar::<_, i64>(
                        "SELECT id FROM cvs WHERE reference_code = $1 ORDER BY id LIMIT 1 FOR UPDATE",
                    )
                    .bind(code)
                    .fetch_optional(&mut *tx)
                    .await?
                }
                None => None,
            };
            match existing {
                Some(id) => {
                    // Status is managed in the dashboard, not in the sheet.
                    payload.status = None;
                    apply_update(&mut *tx, id, &payload, actor_id).await?;
                    report.updated += 1;
                }
                None => {
                    insert_cv(&mut *tx, &payload, SYNC_SOURCE, actor_id).await?;
                    report.synced += 1;
                }
            }
        }

        sqlx::query(
            "UPDATE sheet_sync_state SET last_synced_at = NOW(), last_result = $1, updated_at = NOW() WHERE id = 1",
        )
        .bind(serde_json::to_value(&report)?)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            synced = report.synced,
            updated = report.updated,
            errors = report.errors.len(),
            "sheet sync finished"
        );
        self.activity
            .record(
                actor,
                NewActivity::new(
                    ActivityType::SheetSync,
                    format!("Synced {} new and {} updated CVs from sheet", report.synced, report.updated),
                )
                .target(TargetType::System, "sheet")
                .metadata(serde_json::to_value(&report)?),
            )
            .await;
        Ok(report)
    }

    /// Runs a sync when auto-sync is on and the interval has elapsed.
    pub async fn run_if_due(&self) -> Result<Option<SyncReport>> {
        if !self.is_configured() {
            return Ok(None);
        }
        let state = self.state().await?;
        if !state.is_due(chrono::Utc::now()) {
            return Ok(None);
        }
        self.sync(None).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(csv: &'static str) -> MockSheetSource {
        let mut source = MockSheetSource::new();
        source
            .expect_fetch_csv()
            .times(1)
            .returning(move || Ok(csv.as_bytes().to_vec()));
        source
    }

    #[tokio::test]
    async fn rows_are_split_into_valid_and_errors() {
        let source = source_with(
            "Full Name,Email,Reference Code\nMaria Santos,maria@x.com,REF-1\n,nobody@x.com,REF-2\nAna,not-an-email,REF-3\n",
        );
        let (valid, errors) = fetch_rows(&source).await.unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].reference_code.as_deref(), Some("REF-1"));
        // No priority column: a matched CV keeps the priority set in the dashboard.
        assert_eq!(valid[0].to_payload().priority, None);
        assert_eq!(
            errors,
            vec![
                "Row 2: Full name is required".to_string(),
                "Row 3: Invalid email format".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn fetch_failures_propagate() {
        let mut source = MockSheetSource::new();
        source
            .expect_fetch_csv()
            .returning(|| Err(Error::Internal("sheet unavailable".into())));
        assert!(fetch_rows(&source).await.is_err());
    }

    #[tokio::test]
    async fn sync_without_source_needs_setup() {
        let pool = crate::database::pool::create_lazy_pool("postgres://localhost/unused").unwrap();
        let service = SheetSyncService::new(pool.clone(), None, ActivityService::new(pool));
        assert!(!service.is_configured());
        assert!(matches!(service.sync(None).await, Err(Error::SyncNotConfigured)));
        assert!(service.run_if_due().await.unwrap().is_none());
    }
}
