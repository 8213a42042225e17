use crate::dto::activity_dto::ActivityListQuery;
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::activity_log::{ActivityLog, ActivityLogEntry, ActivityType, TargetType};
use crate::utils::time::from_rfc3339;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

const ACTIVITY_COLUMNS: &str = "id, user_id, cv_id, action, description, target_type, target_id, \
    metadata, ip_address, user_agent, created_at";

#[derive(Clone)]
pub struct ActivityService {
    pool: PgPool,
}

/// An activity row about to be written.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub action: ActivityType,
    pub description: String,
    pub cv_id: Option<i64>,
    pub target_type: TargetType,
    pub target_id: Option<String>,
    pub metadata: Option<JsonValue>,
}

impl NewActivity {
    pub fn new(action: ActivityType, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
            cv_id: None,
            target_type: TargetType::System,
            target_id: None,
            metadata: None,
        }
    }

    /// Attaches the row to a CV that still exists.
    pub fn for_cv(mut self, cv_id: i64) -> Self {
        self.cv_id = Some(cv_id);
        self.target_type = TargetType::Cv;
        self.target_id = Some(cv_id.to_string());
        self
    }

    pub fn target(mut self, target_type: TargetType, target_id: impl ToString) -> Self {
        self.target_type = target_type;
        self.target_id = Some(target_id.to_string());
        self
    }

    pub fn metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

pub struct ActivityList {
    pub items: Vec<ActivityLogEntry>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl ActivityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(&self, actor: Option<&CurrentUser>, entry: NewActivity) -> Result<ActivityLog> {
        let query = format!(
            "INSERT INTO activity_logs (user_id, cv_id, action, description, target_type, target_id, metadata, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            ACTIVITY_COLUMNS
        );
        let row = sqlx::query_as::<_, ActivityLog>(&query)
            .bind(actor.map(|a| a.id))
            .bind(entry.cv_id)
            .bind(entry.action)
            .bind(entry.description)
            .bind(entry.target_type.as_str())
            .bind(entry.target_id)
            .bind(entry.metadata)
            .bind(actor.and_then(|a| a.meta.ip_address.clone()))
            .bind(actor.and_then(|a| a.meta.user_agent.clone()))
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// Like `log`, but a failed write only produces a warning. Used after the
    /// operation being described has already committed.
    pub async fn record(&self, actor: Option<&CurrentUser>, entry: NewActivity) {
        let action = entry.action;
        if let Err(e) = self.log(actor, entry).await {
            tracing::warn!(error = ?e, ?action, "failed to write activity log");
        }
    }

    pub async fn list(&self, query: ActivityListQuery) -> Result<ActivityList> {
        let (page, per_page, offset) = page_window(query.page, query.per_page, 20, 100);

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(action) = query.action {
            filters.push(format!("a.action = ${}::activity_type", args.len() + 1));
            args.push(action.as_str().to_string());
        }
        if let Some(user_id) = query.user_id {
            filters.push(format!("a.user_id = ${}::uuid", args.len() + 1));
            args.push(user_id.to_string());
        }
        if let Some(cv_id) = query.cv_id {
            filters.push(format!("a.cv_id = ${}::bigint", args.len() + 1));
            args.push(cv_id.to_string());
        }
        if let Some(since) = query.since.as_deref().filter(|s| !s.trim().is_empty()) {
            let since = from_rfc3339(since.trim())
                .map_err(|_| Error::BadRequest("Invalid 'since' timestamp".into()))?;
            filters.push(format!("a.created_at >= ${}::timestamptz", args.len() + 1));
            args.push(since.to_rfc3339());
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filters.push(format!("a.description ILIKE ${}", args.len() + 1));
            args.push(format!("%{}%", search.trim()));
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT a.id, a.user_id, u.name AS user_name, u.email AS user_email, a.cv_id, a.action,
                    a.description, a.target_type, a.target_id, a.metadata, a.ip_address, a.user_agent, a.created_at
             FROM activity_logs a
             LEFT JOIN users u ON u.id = a.user_id
             {}
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ${} OFFSET ${}",
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM activity_logs a {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, ActivityLogEntry>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        items_statement = items_statement.bind(per_page).bind(offset);
        let items = items_statement.fetch_all(&self.pool).await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        Ok(ActivityList {
            items,
            total,
            page,
            per_page,
            total_pages: total_pages(total, per_page),
        })
    }
}

/// Highest page a list request may ask for.
pub const MAX_PAGE: i64 = 1_000_000;

/// Clamps client paging input and returns `(page, per_page, offset)`.
pub fn page_window(
    page: Option<i64>,
    per_page: Option<i64>,
    default_per_page: i64,
    max_per_page: i64,
) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, max_per_page);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

pub fn total_pages(total: i64, per_page: i64) -> i64 {
    ((total as f64) / (per_page as f64)).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cv_entries_target_the_cv() {
        let entry = NewActivity::new(ActivityType::CvViewed, "Viewed CV: Maria")
            .for_cv(42)
            .metadata(json!({ "source": "viewer" }));
        assert_eq!(entry.cv_id, Some(42));
        assert_eq!(entry.target_type, TargetType::Cv);
        assert_eq!(entry.target_id.as_deref(), Some("42"));
    }

    #[test]
    fn defaults_to_system_target() {
        let entry = NewActivity::new(ActivityType::SheetSync, "Synced");
        assert_eq!(entry.target_type, TargetType::System);
        assert!(entry.cv_id.is_none());
    }

    #[test]
    fn paging_input_is_clamped() {
        assert_eq!(page_window(None, None, 20, 100), (1, 20, 0));
        assert_eq!(page_window(Some(-4), Some(0), 20, 100), (1, 1, 0));
        assert_eq!(page_window(Some(3), Some(500), 20, 100), (3, 100, 200));
        let (page, per_page, offset) = page_window(Some(i64::MAX), Some(i64::MAX), 20, 100);
        assert_eq!((page, per_page), (MAX_PAGE, 100));
        assert_eq!(offset, (MAX_PAGE - 1) * 100);
    }

    #[tokio::test]
    async fn huge_page_number_does_not_overflow() {
        let pool = crate::database::pool::create_lazy_pool("postgres://postgres@127.0.0.1:1/unreachable").unwrap();
        let service = ActivityService::new(pool);
        let query = ActivityListQuery {
            page: Some(i64::MAX),
            ..Default::default()
        };
        // Fails on the unreachable database, not on the offset arithmetic.
        assert!(matches!(service.list(query).await, Err(Error::Database(_))));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }
}
