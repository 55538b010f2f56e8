//! Form models for the account pages.
//!
//! Every field defaults when absent so that a half-filled form comes back as a
//! view with field errors rather than a bare 400. Passwords are never
//! serialized back into a view model.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterForm {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "The Password field is required."))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(
        other = "password",
        message = "Password and confirmation password do not match."
    ))]
    pub confirm_password: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginForm {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "The Password field is required."))]
    pub password: String,
    pub remember_me: bool,
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ForgotPasswordForm {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordForm {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "The Password field is required."))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(
        other = "password",
        message = "Password and confirmation password do not match."
    ))]
    pub confirm_password: String,
    #[validate(length(min = 1, message = "The Token field is required."))]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_form_validation() {
        let valid = RegisterForm {
            email: "mary@example.com".into(),
            password: "Secret#Pass1".into(),
            confirm_password: "Secret#Pass1".into(),
            city: None,
        };
        assert!(valid.validate().is_ok());

        let mismatch = RegisterForm {
            confirm_password: "Other#Pass1".into(),
            ..valid.clone()
        };
        let errors = mismatch.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));

        let bad_email = RegisterForm {
            email: "mary.example.com".into(),
            ..valid
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_login_form_requires_password() {
        let form = LoginForm {
            email: "john@example.com".into(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_passwords_are_not_echoed() {
        let form = ResetPasswordForm {
            email: "sam@example.com".into(),
            password: "Secret#Pass1".into(),
            confirm_password: "Secret#Pass1".into(),
            token: "abc".into(),
        };
        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("confirmPassword").is_none());
        assert_eq!(json["token"], "abc");
    }
}
