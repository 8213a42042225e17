use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::contract::{Contract, HiredCv};

const CONTRACT_COLUMNS: &str = "id, cv_id, identity_number, contract_date, created_by, created_at";

#[derive(Clone)]
pub struct ContractService {
    pool: PgPool,
}

impl ContractService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a contract for an existing CV. The CV's status is left alone.
    pub async fn create(
        &self,
        cv_id: i64,
        identity_number: &str,
        contract_date: Option<DateTime<Utc>>,
        actor: Option<Uuid>,
    ) -> Result<Contract> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM cvs WHERE id = $1)")
            .bind(cv_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(Error::NotFound("CV not found".into()));
        }

        let query = format!(
            "INSERT INTO contracts (cv_id, identity_number, contract_date, created_by)
             VALUES ($1, $2, COALESCE($3, NOW()), $4)
             RETURNING {}",
            CONTRACT_COLUMNS
        );
        let contract = sqlx::query_as::<_, Contract>(&query)
            .bind(cv_id)
            .bind(identity_number)
            .bind(contract_date)
            .bind(actor)
            .fetch_one(&self.pool)
            .await?;
        Ok(contract)
    }

    /// Hired CVs with their latest contract, most recent contract first.
    pub async fn list_hired(&self, search: Option<&str>) -> Result<Vec<HiredCv>> {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let rows = sqlx::query_as::<_, HiredCv>(
            "SELECT c.id AS cv_id, c.full_name, c.full_name_arabic, c.phone, c.nationality, c.position,
                    c.reference_code, c.status, c.priority, k.id AS contract_id, k.identity_number,
                    COALESCE(k.contract_date, c.contract_date) AS contract_date, c.updated_at
             FROM cvs c
             LEFT JOIN LATERAL (
                 SELECT id, identity_number, contract_date
                 FROM contracts
                 WHERE cv_id = c.id
                 ORDER BY contract_date DESC, id DESC
                 LIMIT 1
             ) k ON TRUE
             WHERE c.status = 'HIRED'
               AND ($1::text IS NULL
                    OR c.full_name ILIKE $1
                    OR c.full_name_arabic ILIKE $1
                    OR c.reference_code ILIKE $1
                    OR c.phone ILIKE $1
                    OR k.identity_number ILIKE $1)
             ORDER BY COALESCE(k.contract_date, c.contract_date, c.updated_at) DESC",
        )
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete(&self, id: i64) -> Result<Contract> {
        let query = format!("DELETE FROM contracts WHERE id = $1 RETURNING {}", CONTRACT_COLUMNS);
        sqlx::query_as::<_, Contract>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Contract not found".into()))
    }
}
