//! Fund transparency and politician tracker
//!
//! Public read models for the dashboards: departmental fund utilisation and
//! the politician tracker. Records are registered by administrators.

use crate::error::AppError;
use chrono::Utc;
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A fund allocation record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRecord {
    pub id: Uuid,
    pub department: String,
    pub project: String,
    pub allocated: f64,
    pub utilized: f64,
}

/// Per-department rollup for the dashboard charts
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRollup {
    pub department: String,
    pub allocated: f64,
    pub utilized: f64,
}

/// A tracked politician
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Politician {
    pub id: Uuid,
    pub name: String,
    pub constituency: String,
    pub party: String,
    pub projects: i32,
    pub funds_utilized: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FundInput {
    #[validate(length(min = 1, max = 100, message = "Department is required"))]
    pub department: String,
    #[validate(length(min = 1, max = 200, message = "Project is required"))]
    pub project: String,
    #[validate(range(min = 0.0, message = "Allocation cannot be negative"))]
    pub allocated: f64,
    #[validate(range(min = 0.0, message = "Utilisation cannot be negative"))]
    pub utilized: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PoliticianInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "Constituency is required"))]
    pub constituency: String,
    #[validate(length(min = 1, max = 200, message = "Party is required"))]
    pub party: String,
    #[validate(range(min = 0, message = "Project count cannot be negative"))]
    pub projects: i32,
    #[validate(range(min = 0.0, message = "Utilisation cannot be negative"))]
    pub funds_utilized: f64,
}

/// Sum allocations and utilisation per department
pub fn rollup_by_department(funds: &[FundRecord]) -> Vec<DepartmentRollup> {
    let mut rollups: Vec<DepartmentRollup> = Vec::new();
    for fund in funds {
        match rollups.iter_mut().find(|r| r.department == fund.department) {
            Some(rollup) => {
                rollup.allocated += fund.allocated;
                rollup.utilized += fund.utilized;
            }
            None => rollups.push(DepartmentRollup {
                department: fund.department.clone(),
                allocated: fund.allocated,
                utilized: fund.utilized,
            }),
        }
    }
    rollups
}

/// PostgreSQL-backed transparency service
pub struct TransparencyService {
    pool: Pool,
}

impl TransparencyService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn list_funds(&self) -> Result<Vec<FundRecord>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, department, project, allocated, utilized FROM funds \
                 ORDER BY department, project",
                &[],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| FundRecord {
                id: row.get("id"),
                department: row.get("department"),
                project: row.get("project"),
                allocated: row.get("allocated"),
                utilized: row.get("utilized"),
            })
            .collect())
    }

    pub async fn department_rollup(&self) -> Result<Vec<DepartmentRollup>, AppError> {
        Ok(rollup_by_department(&self.list_funds().await?))
    }

    pub async fn create_fund(&self, input: FundInput) -> Result<FundRecord, AppError> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        client
            .execute(
                "INSERT INTO funds (id, department, project, allocated, utilized, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[&id, &input.department, &input.project, &input.allocated, &input.utilized, &Utc::now()],
            )
            .await?;
        Ok(FundRecord {
            id,
            department: input.department,
            project: input.project,
            allocated: input.allocated,
            utilized: input.utilized,
        })
    }

    pub async fn list_politicians(&self) -> Result<Vec<Politician>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, name, constituency, party, projects, funds_utilized \
                 FROM politicians ORDER BY name",
                &[],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| Politician {
                id: row.get("id"),
                name: row.get("name"),
                constituency: row.get("constituency"),
                party: row.get("party"),
                projects: row.get("projects"),
                funds_utilized: row.get("funds_utilized"),
            })
            .collect())
    }

    pub async fn create_politician(&self, input: PoliticianInput) -> Result<Politician, AppError> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        client
            .execute(
                "INSERT INTO politicians (id, name, constituency, party, projects, funds_utilized, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &id,
                    &input.name,
                    &input.constituency,
                    &input.party,
                    &input.projects,
                    &input.funds_utilized,
                    &Utc::now(),
                ],
            )
            .await?;
        Ok(Politician {
            id,
            name: input.name,
            constituency: input.constituency,
            party: input.party,
            projects: input.projects,
            funds_utilized: input.funds_utilized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fund(department: &str, allocated: f64, utilized: f64) -> FundRecord {
        FundRecord {
            id: Uuid::new_v4(),
            department: department.to_string(),
            project: "p".to_string(),
            allocated,
            utilized,
        }
    }

    #[test]
    fn test_rollup_sums_per_department() {
        let funds = vec![
            fund("Health", 100.0, 60.0),
            fund("Roads", 200.0, 150.0),
            fund("Health", 50.0, 10.0),
        ];
        let rollup = rollup_by_department(&funds);
        assert_eq!(
            rollup,
            vec![
                DepartmentRollup {
                    department: "Health".to_string(),
                    allocated: 150.0,
                    utilized: 70.0,
                },
                DepartmentRollup {
                    department: "Roads".to_string(),
                    allocated: 200.0,
                    utilized: 150.0,
                },
            ]
        );
    }

    #[test]
    fn test_fund_input_rejects_negative_amounts() {
        let input = FundInput {
            department: "Health".to_string(),
            project: "PHC upgrade".to_string(),
            allocated: -1.0,
            utilized: 0.0,
        };
        assert!(input.validate().is_err());
    }
}
