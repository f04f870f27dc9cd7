//! Grievance submission and triage
//!
//! Citizens file grievances; officials move them through the triage
//! lifecycle; resolved or not, located grievances feed the public heatmap.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Default pin for submissions without client geolocation (Kochi)
const DEFAULT_LAT: f64 = 9.9312;
const DEFAULT_LNG: f64 = 76.2673;

/// Triage lifecycle of a grievance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrievanceStatus {
    Submitted,
    InProgress,
    Resolved,
}

impl GrievanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrievanceStatus::Submitted => "submitted",
            GrievanceStatus::InProgress => "in_progress",
            GrievanceStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(GrievanceStatus::Submitted),
            "in_progress" => Some(GrievanceStatus::InProgress),
            "resolved" => Some(GrievanceStatus::Resolved),
            _ => None,
        }
    }
}

/// A filed grievance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grievance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: GrievanceStatus,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Located grievance for the heatmap
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceLocation {
    pub id: Uuid,
    pub title: String,
    pub lat: f64,
    pub lng: f64,
}

/// Submission payload
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, max = 100, message = "Grievance type is required"))]
    pub category: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

fn grievance_from_row(row: &tokio_postgres::Row) -> Result<Grievance, AppError> {
    let status_str: String = row.get("status");
    let status = GrievanceStatus::parse(&status_str)
        .ok_or_else(|| AppError::Internal(format!("Unknown grievance status: {}", status_str)))?;
    Ok(Grievance {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        status,
        lat: row.get("lat"),
        lng: row.get("lng"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const GRIEVANCE_COLUMNS: &str =
    "id, user_id, title, description, category, status, lat, lng, created_at, updated_at";

/// PostgreSQL-backed grievance service
pub struct GrievanceService {
    pool: Pool,
}

impl GrievanceService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// File a new grievance for `user_id`
    pub async fn submit(&self, user_id: Uuid, input: GrievanceInput) -> Result<Grievance, AppError> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let client = self.pool.get().await?;
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO grievances (id, user_id, title, description, category, status, lat, lng, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 'submitted', $6, $7, $8, $8) RETURNING {}",
            GRIEVANCE_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &Uuid::new_v4(),
                    &user_id,
                    &input.title,
                    &input.description,
                    &input.category,
                    &input.lat.unwrap_or(DEFAULT_LAT),
                    &input.lng.unwrap_or(DEFAULT_LNG),
                    &now,
                ],
            )
            .await?;
        grievance_from_row(&row)
    }

    /// A citizen's own grievances, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Grievance>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM grievances WHERE user_id = $1 ORDER BY created_at DESC",
            GRIEVANCE_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&user_id]).await?;
        rows.iter().map(grievance_from_row).collect()
    }

    /// All grievances for triage, newest first
    pub async fn list_all(&self) -> Result<Vec<Grievance>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM grievances ORDER BY created_at DESC", GRIEVANCE_COLUMNS);
        let rows = client.query(sql.as_str(), &[]).await?;
        rows.iter().map(grievance_from_row).collect()
    }

    /// Located grievances for the public heatmap
    pub async fn locations(&self) -> Result<Vec<GrievanceLocation>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query("SELECT id, title, lat, lng FROM grievances", &[])
            .await?;
        Ok(rows
            .iter()
            .map(|row| GrievanceLocation {
                id: row.get("id"),
                title: row.get("title"),
                lat: row.get("lat"),
                lng: row.get("lng"),
            })
            .collect())
    }

    /// Move a grievance through the triage lifecycle
    pub async fn update_status(
        &self,
        id: Uuid,
        status: GrievanceStatus,
    ) -> Result<Grievance, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE grievances SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            GRIEVANCE_COLUMNS
        );
        let row = client
            .query_opt(sql.as_str(), &[&id, &status.as_str(), &Utc::now()])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Grievance {} not found", id)))?;
        grievance_from_row(&row)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM grievances WHERE id = $1", &[&id])
            .await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("Grievance {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_validation() {
        let ok = GrievanceInput {
            title: "Broken streetlight".to_string(),
            description: "Out for two weeks on MG Road".to_string(),
            category: "Electricity".to_string(),
            lat: None,
            lng: None,
        };
        assert!(ok.validate().is_ok());

        let missing_title = GrievanceInput {
            title: String::new(),
            description: "desc".to_string(),
            category: "Roads".to_string(),
            lat: None,
            lng: None,
        };
        assert!(missing_title.validate().is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(GrievanceStatus::parse("in_progress"), Some(GrievanceStatus::InProgress));
        assert_eq!(GrievanceStatus::parse("done"), None);
        assert_eq!(GrievanceStatus::Resolved.as_str(), "resolved");
    }
}
