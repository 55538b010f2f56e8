use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;

use employee_manager::config::Config;
use employee_manager::error::AppError;
use employee_manager::repository::{
    EmployeeRepository, MockEmployeeRepository, PgEmployeeRepository,
};
use employee_manager::{build_account_workflow, routes};

fn startup_error(error: AppError) -> std::io::Error {
    log::error!("{}", error);
    std::io::Error::new(std::io::ErrorKind::Other, error)
}

async fn employee_repository(config: &Config) -> Result<Arc<dyn EmployeeRepository>, AppError> {
    match &config.database_url {
        Some(database_url) => {
            let pool = PgPool::connect(database_url).await?;
            let repository = PgEmployeeRepository::new(pool);
            repository.ensure_schema().await?;
            log::info!("Using PostgreSQL employee repository");
            Ok(Arc::new(repository))
        }
        None => {
            log::warn!("DATABASE_URL not set, employees are kept in memory");
            Ok(Arc::new(MockEmployeeRepository::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;
    let workflow = web::Data::new(build_account_workflow(&config).map_err(startup_error)?);
    let employees = web::Data::from(employee_repository(&config).await.map_err(startup_error)?);
    let public_base_url = config.public_base_url.clone();

    log::info!("Starting employee manager at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(workflow.clone())
            .app_data(employees.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&public_base_url)
                    .allowed_methods(vec!["GET", "POST"])
                    .supports_credentials()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
