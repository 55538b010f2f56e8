pub mod account;
pub mod administration;
pub mod employees;
pub mod health;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(
            web::scope("/Account")
                .service(account::register_form)
                .service(account::register)
                .service(account::is_email_in_use)
                .service(account::confirm_email)
                .service(account::forgot_password_form)
                .service(account::forgot_password)
                .service(account::reset_password_form)
                .service(account::reset_password)
                .service(account::login_form)
                .service(account::login)
                .service(account::logout)
                .service(account::external_login)
                .service(account::external_login_callback),
        )
        .service(account::external_provider_return)
        .service(
            web::scope("/Administration")
                .service(administration::list_users)
                .service(administration::access_denied),
        )
        .service(employees::index)
        .service(employees::home_index)
        .service(employees::details)
        .service(employees::create_form)
        .service(employees::create)
        .service(employees::edit_form)
        .service(employees::edit)
        .service(employees::delete);
}
