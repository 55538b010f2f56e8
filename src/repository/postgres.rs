use async_trait::async_trait;
use sqlx::{Executor, PgPool};

use crate::error::AppError;
use crate::models::{Employee, EmployeeInput};
use crate::repository::EmployeeRepository;

const SCHEMA: &str = r#"
DO $$ BEGIN
    CREATE TYPE department AS ENUM ('None', 'HR', 'Payroll', 'IT');
EXCEPTION
    WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE IF NOT EXISTS employees (
    id SERIAL PRIMARY KEY,
    name VARCHAR(50) NOT NULL,
    email TEXT NOT NULL,
    department department,
    photo_path TEXT
);
"#;

/// Employee repository backed by PostgreSQL.
pub struct PgEmployeeRepository {
    pool: PgPool,
}

impl PgEmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `department` type and `employees` table when missing.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        // No bind parameters, so this runs as one multi-statement simple query.
        (&self.pool).execute(SCHEMA).await?;
        Ok(())
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn get_employee(&self, id: i32) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, name, email, department, photo_path FROM employees WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn get_all_employees(&self) -> Result<Vec<Employee>, AppError> {
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT id, name, email, department, photo_path FROM employees ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    async fn add(&self, input: EmployeeInput) -> Result<Employee, AppError> {
        let draft = Employee::from_input(0, input);
        let employee = sqlx::query_as::<_, Employee>(
            "INSERT INTO employees (name, email, department, photo_path)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, email, department, photo_path",
        )
        .bind(draft.name)
        .bind(draft.email)
        .bind(draft.department)
        .bind(draft.photo_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn update(&self, id: i32, input: EmployeeInput) -> Result<Option<Employee>, AppError> {
        let draft = Employee::from_input(id, input);
        let employee = sqlx::query_as::<_, Employee>(
            "UPDATE employees
             SET name = $1, email = $2, department = $3, photo_path = $4
             WHERE id = $5
             RETURNING id, name, email, department, photo_path",
        )
        .bind(draft.name)
        .bind(draft.email)
        .bind(draft.department)
        .bind(draft.photo_path)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn delete(&self, id: i32) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            "DELETE FROM employees WHERE id = $1
             RETURNING id, name, email, department, photo_path",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }
}
