use chrono::Utc;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::dto::cv_dto::{CvListQuery, CvPayload, HireCvPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::contract::Contract;
use crate::models::cv::{Cv, CvStatus, GalleryCv, UserRef, CV_COLUMNS, SKILL_COLUMNS};
use crate::models::cv_version::{needs_snapshot, next_version, CvVersion};
use crate::services::activity_service::{page_window, total_pages};

/// Columns a client may write, in bind order for `bind_fields`.
pub const EDITABLE_COLUMNS: [&str; 45] = [
    "full_name",
    "full_name_arabic",
    "email",
    "phone",
    "reference_code",
    "monthly_salary",
    "contract_period",
    "position",
    "passport_number",
    "passport_issue_date",
    "passport_expiry_date",
    "passport_issue_place",
    "nationality",
    "religion",
    "date_of_birth",
    "place_of_birth",
    "living_town",
    "marital_status",
    "number_of_children",
    "weight",
    "height",
    "complexion",
    "age",
    "english_level",
    "arabic_level",
    "baby_sitting",
    "children_care",
    "tutoring",
    "disabled_care",
    "cleaning",
    "washing",
    "ironing",
    "arabic_cooking",
    "sewing",
    "driving",
    "previous_employment",
    "profile_image",
    "experience",
    "education",
    "skills",
    "summary",
    "content",
    "notes",
    "status",
    "priority",
];

const VERSION_COLUMNS: &str = "id, cv_id, content, version, created_by, created_at";
const CONTRACT_COLUMNS: &str = "id, cv_id, identity_number, contract_date, created_by, created_at";

type CvQuery<'q> = QueryAs<'q, Postgres, Cv, PgArguments>;

fn bind_fields<'q>(q: CvQuery<'q>, p: &CvPayload) -> CvQuery<'q> {
    q.bind(p.full_name.clone())
        .bind(p.full_name_arabic.clone())
        .bind(p.email.clone())
        .bind(p.phone.clone())
        .bind(p.reference_code.clone())
        .bind(p.monthly_salary.clone())
        .bind(p.contract_period.clone())
        .bind(p.position.clone())
        .bind(p.passport_number.clone())
        .bind(p.passport_issue_date.clone())
        .bind(p.passport_expiry_date.clone())
        .bind(p.passport_issue_place.clone())
        .bind(p.nationality.clone())
        .bind(p.religion.clone())
        .bind(p.date_of_birth.clone())
        .bind(p.place_of_birth.clone())
        .bind(p.living_town.clone())
        .bind(p.marital_status)
        .bind(p.number_of_children)
        .bind(p.weight.clone())
        .bind(p.height.clone())
        .bind(p.complexion.clone())
        .bind(p.age)
        .bind(p.english_level)
        .bind(p.arabic_level)
        .bind(p.baby_sitting)
        .bind(p.children_care)
        .bind(p.tutoring)
        .bind(p.disabled_care)
        .bind(p.cleaning)
        .bind(p.washing)
        .bind(p.ironing)
        .bind(p.arabic_cooking)
        .bind(p.sewing)
        .bind(p.driving)
        .bind(p.previous_employment.clone())
        .bind(p.profile_image.clone())
        .bind(p.experience.clone())
        .bind(p.education.clone())
        .bind(p.skills.clone())
        .bind(p.summary.clone())
        .bind(p.content.clone())
        .bind(p.notes.clone())
        .bind(p.status)
        .bind(p.priority)
}

fn insert_sql() -> String {
    let values: Vec<String> = EDITABLE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| match *col {
            "status" => format!("COALESCE(${}, 'NEW'::cv_status)", i + 1),
            "priority" => format!("COALESCE(${}, 'MEDIUM'::cv_priority)", i + 1),
            _ => format!("${}", i + 1),
        })
        .collect();
    let n = EDITABLE_COLUMNS.len();
    format!(
        "INSERT INTO cvs ({}, source, created_by_id, updated_by_id) VALUES ({}, ${}, ${}, ${}) RETURNING {}",
        EDITABLE_COLUMNS.join(", "),
        values.join(", "),
        n + 1,
        n + 2,
        n + 2,
        CV_COLUMNS
    )
}

/// Absent fields keep their value; cleared fields take the bound NULL.
fn update_sql(cleared: &BTreeSet<String>) -> String {
    let sets: Vec<String> = EDITABLE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| {
            if cleared.contains(*col) {
                format!("{col} = ${}", i + 1)
            } else {
                format!("{col} = COALESCE(${}, {col})", i + 1)
            }
        })
        .collect();
    let n = EDITABLE_COLUMNS.len();
    format!(
        "UPDATE cvs SET {}, updated_by_id = COALESCE(${}, updated_by_id), updated_at = NOW() WHERE id = ${} RETURNING {}",
        sets.join(", "),
        n + 1,
        n + 2,
        CV_COLUMNS
    )
}

/// Inserts a CV. `full_name` must already be present.
pub async fn insert_cv<'e, E>(
    executor: E,
    payload: &CvPayload,
    source: &str,
    actor: Option<Uuid>,
) -> Result<Cv>
where
    E: PgExecutor<'e>,
{
    let sql = insert_sql();
    let cv = bind_fields(sqlx::query_as::<_, Cv>(&sql), payload)
        .bind(source.to_string())
        .bind(actor)
        .fetch_one(executor)
        .await?;
    Ok(cv)
}

/// Applies every present field of `payload` to CV `id`.
pub async fn apply_update<'e, E>(
    executor: E,
    id: i64,
    payload: &CvPayload,
    actor: Option<Uuid>,
) -> Result<Cv>
where
    E: PgExecutor<'e>,
{
    let sql = update_sql(&payload.cleared);
    let cv = bind_fields(sqlx::query_as::<_, Cv>(&sql), payload)
        .bind(actor)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(cv_not_found)?;
    Ok(cv)
}

fn cv_not_found() -> Error {
    Error::NotFound("CV not found".into())
}

async fn lock_cv(conn: &mut PgConnection, id: i64) -> Result<Cv> {
    let query = format!("SELECT {} FROM cvs WHERE id = $1 FOR UPDATE", CV_COLUMNS);
    sqlx::query_as::<_, Cv>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(cv_not_found)
}

/// Locks every listed CV; 404 naming the first id that does not exist.
async fn lock_all(conn: &mut PgConnection, ids: &[i64]) -> Result<()> {
    let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM cvs WHERE id = ANY($1) FOR UPDATE")
        .bind(ids)
        .fetch_all(conn)
        .await?;
    let found: BTreeSet<i64> = found.into_iter().collect();
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(Error::NotFound(format!("CV not found: {}", missing)));
    }
    Ok(())
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

#[derive(Clone)]
pub struct CvService {
    pool: PgPool,
}

pub struct CvList {
    pub items: Vec<Cv>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

pub struct CvDetail {
    pub cv: Cv,
    pub created_by: Option<UserRef>,
    pub updated_by: Option<UserRef>,
    pub versions: Vec<CvVersion>,
}

pub struct CvUpdate {
    pub cv: Cv,
    pub previous_status: CvStatus,
    pub changed_fields: Vec<String>,
}

pub struct CvHire {
    pub cv: Cv,
    pub previous_status: CvStatus,
    pub contract: Option<Contract>,
}

/// WHERE clause and its text arguments for `GET /api/cvs`.
pub fn build_list_filters(query: &CvListQuery) -> Result<(String, Vec<String>)> {
    let mut filters = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if let Some(status) = query.status {
        filters.push(format!("status = ${}::cv_status", args.len() + 1));
        args.push(status.as_str().to_string());
    }
    if let Some(status) = query.exclude_status {
        filters.push(format!("status <> ${}::cv_status", args.len() + 1));
        args.push(status.as_str().to_string());
    }
    if let Some(priority) = query.priority {
        filters.push(format!("priority = ${}::cv_priority", args.len() + 1));
        args.push(priority.as_str().to_string());
    }
    if let Some(nationality) = query.nationality.as_deref().filter(|s| !s.trim().is_empty()) {
        filters.push(format!("nationality ILIKE ${}", args.len() + 1));
        args.push(nationality.trim().to_string());
    }
    if let Some(marital) = query.marital_status {
        filters.push(format!("marital_status = ${}::marital_status", args.len() + 1));
        args.push(marital.as_str().to_string());
    }
    if let Some(skill) = query.skill.as_deref().filter(|s| !s.trim().is_empty()) {
        // Column names cannot be bound, so only whitelisted names are interpolated.
        let column = SKILL_COLUMNS
            .iter()
            .find(|c| c.eq_ignore_ascii_case(skill.trim()))
            .ok_or_else(|| Error::BadRequest(format!("Unknown skill: {}", skill)))?;
        filters.push(format!("{} IN ('YES', 'WILLING')", column));
    }
    if let Some(min_age) = query.min_age {
        filters.push(format!("age >= ${}::int", args.len() + 1));
        args.push(min_age.to_string());
    }
    if let Some(max_age) = query.max_age {
        filters.push(format!("age <= ${}::int", args.len() + 1));
        args.push(max_age.to_string());
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let p = args.len() + 1;
        filters.push(format!(
            "(full_name ILIKE ${p} OR full_name_arabic ILIKE ${p} OR email ILIKE ${p} OR phone ILIKE ${p} \
             OR position ILIKE ${p} OR reference_code ILIKE ${p} OR nationality ILIKE ${p})"
        ));
        args.push(format!("%{}%", search.trim()));
    }

    let where_clause = if filters.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", filters.join(" AND "))
    };
    Ok((where_clause, args))
}

impl CvService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: CvListQuery) -> Result<CvList> {
        let (page, per_page, offset) = page_window(query.page, query.per_page, 50, 200);

        let (where_clause, args) = build_list_filters(&query)?;

        let items_query = format!(
            "SELECT {} FROM cvs {} ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            CV_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM cvs {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Cv>(&items_query);
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

        Ok(CvList {
            items,
            total,
            page,
            per_page,
            total_pages: total_pages(total, per_page),
        })
    }

    pub async fn get(&self, id: i64) -> Result<Cv> {
        let query = format!("SELECT {} FROM cvs WHERE id = $1", CV_COLUMNS);
        sqlx::query_as::<_, Cv>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(cv_not_found)
    }

    /// All listed CVs, or every CV when `ids` is `None`.
    pub async fn list_by_ids(&self, ids: Option<&[i64]>) -> Result<Vec<Cv>> {
        let cvs = match ids {
            Some(ids) if !ids.is_empty() => {
                let query = format!(
                    "SELECT {} FROM cvs WHERE id = ANY($1) ORDER BY created_at DESC, id DESC",
                    CV_COLUMNS
                );
                sqlx::query_as::<_, Cv>(&query)
                    .bind(ids)
                    .fetch_all(&self.pool)
                    .await?
            }
            _ => {
                let query = format!("SELECT {} FROM cvs ORDER BY created_at DESC, id DESC", CV_COLUMNS);
                sqlx::query_as::<_, Cv>(&query).fetch_all(&self.pool).await?
            }
        };
        Ok(cvs)
    }

    async fn user_ref(&self, id: Option<Uuid>) -> Result<Option<UserRef>> {
        let Some(id) = id else { return Ok(None) };
        let user = sqlx::query_as::<_, UserRef>("SELECT name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn detail(&self, id: i64) -> Result<CvDetail> {
        let cv = self.get(id).await?;
        let created_by = self.user_ref(cv.created_by_id).await?;
        let updated_by = self.user_ref(cv.updated_by_id).await?;
        let versions = self.versions(id, Some(5)).await?;
        Ok(CvDetail {
            cv,
            created_by,
            updated_by,
            versions,
        })
    }

    /// Version history, newest first.
    pub async fn versions(&self, cv_id: i64, limit: Option<i64>) -> Result<Vec<CvVersion>> {
        let query = format!(
            "SELECT {} FROM cv_versions WHERE cv_id = $1 ORDER BY version DESC LIMIT $2",
            VERSION_COLUMNS
        );
        let versions = sqlx::query_as::<_, CvVersion>(&query)
            .bind(cv_id)
            .bind(limit.unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok(versions)
    }

    pub async fn create(&self, payload: CvPayload, actor: Option<Uuid>) -> Result<Cv> {
        let payload = payload.normalized();
        if payload.full_name.is_none() {
            return Err(Error::BadRequest("Full name is required".into()));
        }
        insert_cv(&self.pool, &payload, "Manual", actor).await
    }

    /// Partial update in one transaction with the CV row locked. When the
    /// content changes, the previous content is kept as a new version.
    pub async fn update(&self, id: i64, payload: CvPayload, actor: &CurrentUser) -> Result<CvUpdate> {
        let payload = payload.normalized();
        let mut tx = self.pool.begin().await?;
        let current = lock_cv(&mut tx, id).await?;

        if let Some(next) = payload.status {
            if !actor.role.is_manager() && !current.status.can_transition_to(next) {
                return Err(Error::Conflict(format!(
                    "Cannot change status from {} to {}",
                    current.status.as_str(),
                    next.as_str()
                )));
            }
        }

        if needs_snapshot(current.content.as_deref(), payload.content.as_deref()) {
            let max_version: Option<i32> =
                sqlx::query_scalar("SELECT MAX(version) FROM cv_versions WHERE cv_id = $1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            sqlx::query(
                "INSERT INTO cv_versions (cv_id, content, version, created_by) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(current.content.clone().unwrap_or_default())
            .bind(next_version(max_version))
            .bind(actor.id)
            .execute(&mut *tx)
            .await?;
        }

        let cv = apply_update(&mut *tx, id, &payload, Some(actor.id)).await?;
        tx.commit().await?;

        Ok(CvUpdate {
            cv,
            previous_status: current.status,
            changed_fields: payload.present_fields(),
        })
    }

    /// Removes the CV's contracts and activity rows, then the CV itself.
    /// Versions go with the CV through the foreign key.
    pub async fn delete(&self, id: i64) -> Result<Cv> {
        let mut tx = self.pool.begin().await?;
        let cv = lock_cv(&mut tx, id).await?;

        sqlx::query("DELETE FROM contracts WHERE cv_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM activity_logs WHERE cv_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cvs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(cv)
    }

    /// Marks the CV hired. A returned CV keeps its existing contract; any
    /// other CV gets a new one in the same transaction.
    pub async fn hire(&self, id: i64, payload: HireCvPayload, actor: &CurrentUser) -> Result<CvHire> {
        let mut tx = self.pool.begin().await?;
        let current = lock_cv(&mut tx, id).await?;

        if current.status == CvStatus::Hired {
            return Err(Error::Conflict("CV is already hired".into()));
        }
        if !actor.role.is_manager() && !current.status.can_transition_to(CvStatus::Hired) {
            return Err(Error::Conflict(format!(
                "Cannot change status from {} to {}",
                current.status.as_str(),
                CvStatus::Hired.as_str()
            )));
        }

        let contract_date = payload.contract_date.unwrap_or_else(Utc::now);
        let contract = if current.status != CvStatus::Returned {
            let query = format!(
                "INSERT INTO contracts (cv_id, identity_number, contract_date, created_by)
                 VALUES ($1, $2, $3, $4)
                 RETURNING {}",
                CONTRACT_COLUMNS
            );
            let contract = sqlx::query_as::<_, Contract>(&query)
                .bind(id)
                .bind(payload.identity_number.trim())
                .bind(contract_date)
                .bind(actor.id)
                .fetch_one(&mut *tx)
                .await?;
            Some(contract)
        } else {
            None
        };

        let query = format!(
            "UPDATE cvs SET status = 'HIRED', contract_date = $2, updated_by_id = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            CV_COLUMNS
        );
        let cv = sqlx::query_as::<_, Cv>(&query)
            .bind(id)
            .bind(contract_date)
            .bind(actor.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CvHire {
            cv,
            previous_status: current.status,
            contract,
        })
    }

    pub async fn bulk_delete(&self, ids: &[i64]) -> Result<u64> {
        let ids = dedup(ids);
        let mut tx = self.pool.begin().await?;
        lock_all(&mut tx, &ids).await?;

        sqlx::query("DELETE FROM contracts WHERE cv_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM activity_logs WHERE cv_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM cvs WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    pub async fn bulk_status(&self, ids: &[i64], status: CvStatus, actor: Uuid) -> Result<u64> {
        let ids = dedup(ids);
        let mut tx = self.pool.begin().await?;
        lock_all(&mut tx, &ids).await?;

        let updated = sqlx::query(
            "UPDATE cvs SET status = $2, updated_by_id = $3, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(&ids)
        .bind(status)
        .bind(actor)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(updated)
    }

    /// Count per status; statuses without CVs are reported as zero.
    pub async fn stats(&self) -> Result<(i64, BTreeMap<String, i64>)> {
        let rows: Vec<(CvStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM cvs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        let mut counts: BTreeMap<String, i64> = CvStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut total = 0;
        for (status, count) in rows {
            counts.insert(status.as_str().to_string(), count);
            total += count;
        }
        Ok((total, counts))
    }

    pub async fn gallery(&self, status: Option<CvStatus>) -> Result<Vec<GalleryCv>> {
        let cvs = sqlx::query_as::<_, GalleryCv>(
            "SELECT id, full_name, full_name_arabic, nationality, position, age, profile_image, phone, reference_code, status
             FROM cvs
             WHERE ($1::cv_status IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(cvs)
    }
}
