use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{Dept, Employee, EmployeeInput};
use crate::repository::EmployeeRepository;

/// In-memory employee repository, seeded with three employees.
pub struct MockEmployeeRepository {
    employees: RwLock<Vec<Employee>>,
}

impl MockEmployeeRepository {
    pub fn new() -> Self {
        let seed = |id: i32, name: &str, department: Dept, email: &str| Employee {
            id,
            name: name.to_string(),
            email: email.to_string(),
            department: Some(department),
            photo_path: None,
        };
        Self {
            employees: RwLock::new(vec![
                seed(1, "Mary", Dept::HR, "mary@gmail.com"),
                seed(2, "John", Dept::IT, "john@gmail.com"),
                seed(3, "Sam", Dept::IT, "sam@gmail.com"),
            ]),
        }
    }
}

impl Default for MockEmployeeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmployeeRepository for MockEmployeeRepository {
    async fn get_employee(&self, id: i32) -> Result<Option<Employee>, AppError> {
        Ok(self.employees.read().await.iter().find(|e| e.id == id).cloned())
    }

    async fn get_all_employees(&self) -> Result<Vec<Employee>, AppError> {
        Ok(self.employees.read().await.clone())
    }

    async fn add(&self, input: EmployeeInput) -> Result<Employee, AppError> {
        let mut employees = self.employees.write().await;
        let id = employees.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let employee = Employee::from_input(id, input);
        employees.push(employee.clone());
        Ok(employee)
    }

    async fn update(&self, id: i32, input: EmployeeInput) -> Result<Option<Employee>, AppError> {
        let mut employees = self.employees.write().await;
        let Some(slot) = employees.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        *slot = Employee::from_input(id, input);
        Ok(Some(slot.clone()))
    }

    async fn delete(&self, id: i32) -> Result<Option<Employee>, AppError> {
        let mut employees = self.employees.write().await;
        let position = employees.iter().position(|e| e.id == id);
        Ok(position.map(|index| employees.remove(index)))
    }
}
