//! Employee persistence behind the `EmployeeRepository` trait.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Employee, EmployeeInput};

pub use memory::MockEmployeeRepository;
pub use postgres::PgEmployeeRepository;

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn get_employee(&self, id: i32) -> Result<Option<Employee>, AppError>;

    async fn get_all_employees(&self) -> Result<Vec<Employee>, AppError>;

    /// Stores a new employee and returns it with its assigned id.
    async fn add(&self, input: EmployeeInput) -> Result<Employee, AppError>;

    /// Replaces an employee's fields. `None` when no employee has this id.
    async fn update(&self, id: i32, input: EmployeeInput) -> Result<Option<Employee>, AppError>;

    /// Removes an employee and returns it, or `None` when it did not exist.
    async fn delete(&self, id: i32) -> Result<Option<Employee>, AppError>;
}
