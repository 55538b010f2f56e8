use actix_web::{get, post, web};
use serde_json::json;
use validator::Validate;

use crate::auth::RequireSession;
use crate::error::AppError;
use crate::models::EmployeeInput;
use crate::repository::EmployeeRepository;
use crate::views::{Outcome, View};

pub type Employees = web::Data<dyn EmployeeRepository>;

fn not_found(id: i32) -> Outcome {
    Outcome::NotFound(View::named("EmployeeNotFound").with_model(&json!({ "id": id })))
}

/// Lists every employee.
#[get("/")]
pub async fn index(employees: Employees) -> Result<Outcome, AppError> {
    index_view(employees).await
}

#[get("/Home/Index")]
pub async fn home_index(employees: Employees) -> Result<Outcome, AppError> {
    index_view(employees).await
}

async fn index_view(employees: Employees) -> Result<Outcome, AppError> {
    let all = employees.get_all_employees().await?;
    Ok(Outcome::View(View::named("Index").with_model(&all)))
}

/// Shows one employee, or the `EmployeeNotFound` view with a 404.
#[get("/Home/Details/{id}")]
pub async fn details(employees: Employees, id: web::Path<i32>) -> Result<Outcome, AppError> {
    let id = id.into_inner();
    match employees.get_employee(id).await? {
        Some(employee) => Ok(Outcome::View(
            View::named("Details")
                .with_title("Employee Details")
                .with_model(&employee),
        )),
        None => {
            log::warn!("Employee with id {} not found", id);
            Ok(not_found(id))
        }
    }
}

#[get("/Home/Create", wrap = "RequireSession")]
pub async fn create_form() -> Outcome {
    Outcome::View(View::named("Create"))
}

#[post("/Home/Create", wrap = "RequireSession")]
pub async fn create(
    employees: Employees,
    form: web::Form<EmployeeInput>,
) -> Result<Outcome, AppError> {
    let input = form.into_inner();
    if let Err(errors) = input.validate() {
        return Ok(Outcome::View(
            View::named("Create").with_model(&input).with_validation(&errors),
        ));
    }
    let employee = employees.add(input).await?;
    log::info!("Created employee {}", employee.id);
    Ok(Outcome::redirect(format!("/Home/Details/{}", employee.id)))
}

#[get("/Home/Edit/{id}", wrap = "RequireSession")]
pub async fn edit_form(employees: Employees, id: web::Path<i32>) -> Result<Outcome, AppError> {
    let id = id.into_inner();
    match employees.get_employee(id).await? {
        Some(employee) => Ok(Outcome::View(View::named("Edit").with_model(&employee))),
        None => Ok(not_found(id)),
    }
}

#[post("/Home/Edit/{id}", wrap = "RequireSession")]
pub async fn edit(
    employees: Employees,
    id: web::Path<i32>,
    form: web::Form<EmployeeInput>,
) -> Result<Outcome, AppError> {
    let id = id.into_inner();
    let input = form.into_inner();
    if let Err(errors) = input.validate() {
        return Ok(Outcome::View(
            View::named("Edit").with_model(&input).with_validation(&errors),
        ));
    }
    match employees.update(id, input).await? {
        Some(employee) => Ok(Outcome::redirect(format!("/Home/Details/{}", employee.id))),
        None => Ok(not_found(id)),
    }
}

#[post("/Home/Delete/{id}", wrap = "RequireSession")]
pub async fn delete(employees: Employees, id: web::Path<i32>) -> Result<Outcome, AppError> {
    let id = id.into_inner();
    match employees.delete(id).await? {
        Some(employee) => {
            log::info!("Deleted employee {}", employee.id);
            Ok(Outcome::home())
        }
        None => Ok(not_found(id)),
    }
}
