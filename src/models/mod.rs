pub mod account;
pub mod employee;
pub mod user;

pub use account::{ForgotPasswordForm, LoginForm, RegisterForm, ResetPasswordForm};
pub use employee::{Dept, Employee, EmployeeInput};
pub use user::{ExternalLogin, User};
