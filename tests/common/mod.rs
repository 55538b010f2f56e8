#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::{test, web};
use serde_json::Value;

use employee_manager::account::AccountWorkflow;
use employee_manager::auth::session::{EXTERNAL_COOKIE, SESSION_COOKIE};
use employee_manager::auth::{
    CookieSessionManager, CredentialStore, ExternalLoginInfo, InMemoryCredentialStore,
    SessionManager, TokenService,
};
use employee_manager::config::{ExternalProviderConfig, PasswordPolicy};
use employee_manager::links::LinkGenerator;
use employee_manager::models::User;
use employee_manager::repository::{EmployeeRepository, MockEmployeeRepository};

pub const PASSWORD: &str = "Str0ng#Password";

/// Lowest cost bcrypt accepts.
const TEST_HASH_COST: u32 = 4;

/// Builds the application under test from a `TestEnv`.
macro_rules! init_app {
    ($env:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($env.workflow.clone())
                .app_data($env.employees.clone())
                .configure(employee_manager::routes::config),
        )
        .await
    };
}

/// In-memory collaborators shared by the app and the assertions.
pub struct TestEnv {
    pub store: Arc<InMemoryCredentialStore>,
    pub session: Arc<CookieSessionManager>,
    pub workflow: web::Data<AccountWorkflow>,
    pub employees: web::Data<dyn EmployeeRepository>,
}

impl TestEnv {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let tokens = TokenService::new("integration-test-secret");
        let store = Arc::new(
            InMemoryCredentialStore::new(
                PasswordPolicy::default(),
                tokens.clone(),
                chrono::Duration::hours(24),
            )
            .with_hash_cost(TEST_HASH_COST),
        );
        let session = Arc::new(CookieSessionManager::new(
            store.clone(),
            tokens,
            vec![ExternalProviderConfig::google("client-1".into())],
            "http://localhost:8080",
        ));
        let links = LinkGenerator::new("http://localhost:8080").unwrap();
        let workflow = AccountWorkflow::new(store.clone(), session.clone(), links);
        let employees: Arc<dyn EmployeeRepository> = Arc::new(MockEmployeeRepository::new());

        Self {
            store,
            session,
            workflow: web::Data::new(workflow),
            employees: web::Data::from(employees),
        }
    }

    /// Creates a user with `PASSWORD`, optionally confirmed, with the given roles.
    pub async fn user(&self, email: &str, confirmed: bool, roles: &[&str]) -> User {
        let created = self
            .store
            .create(User::new(email, None), Some(PASSWORD))
            .await
            .unwrap();
        assert!(created.succeeded(), "{:?}", created.errors);
        let user = self.store.find_by_email(email).await.unwrap().unwrap();
        if confirmed {
            let token = self.store.generate_email_confirmation_token(&user).await.unwrap();
            assert!(self.store.confirm_email(&user, &token).await.unwrap().succeeded());
        }
        for role in roles {
            self.store.add_to_role(&user, role).await.unwrap();
        }
        self.store.find_by_email(email).await.unwrap().unwrap()
    }

    pub fn session_cookie(&self, user: &User) -> Cookie<'static> {
        let ticket = self.session.sign_in(user, false).unwrap();
        Cookie::new(SESSION_COOKIE, ticket.token)
    }

    pub fn external_cookie(&self, info: &ExternalLoginInfo) -> Cookie<'static> {
        Cookie::new(EXTERNAL_COOKIE, self.session.issue_external_identity(info).unwrap())
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Value of a cookie set by the response, if any. Removals read as `Some("")`.
pub fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

pub async fn read_view<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    test::read_body_json(resp).await
}
