//! Link building and the local-URL check used against open redirects.

use url::{form_urlencoded, Url};

use crate::error::AppError;

/// Builds absolute links (for emails) from the configured public base URL.
#[derive(Debug, Clone)]
pub struct LinkGenerator {
    base: Url,
}

impl LinkGenerator {
    pub fn new(public_base_url: &str) -> Result<Self, AppError> {
        let base = Url::parse(public_base_url).map_err(|e| {
            AppError::Configuration(format!("Invalid public base URL '{}': {}", public_base_url, e))
        })?;
        Ok(Self { base })
    }

    pub fn absolute(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.into()
    }
}

/// Builds a root-relative link, appending an encoded query to any query `path` already has.
pub fn relative(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, encoded)
}

/// True when `url` points inside this application.
///
/// Accepts `/path` and `~/path`; rejects absolute URLs, protocol-relative
/// `//host` and `/\host` forms, and anything containing control characters.
pub fn is_local_url(url: &str) -> bool {
    if url.is_empty() || url.chars().any(char::is_control) {
        return false;
    }
    let bytes = url.as_bytes();
    match bytes {
        [b'/'] => true,
        [b'/', second, ..] => *second != b'/' && *second != b'\\',
        [b'~', b'/'] => true,
        [b'~', b'/', third, ..] => *third != b'/' && *third != b'\\',
        _ => false,
    }
}

/// Maps the `~/` application-root prefix onto `/`.
pub fn content(url: &str) -> String {
    match url.strip_prefix('~') {
        Some(rest) => rest.to_string(),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_link_encodes_query() {
        let links = LinkGenerator::new("https://staff.example.com/").unwrap();
        let link = links.absolute(
            "/Account/ResetPassword",
            &[("email", "mary+hr@example.com"), ("token", "a.b/c")],
        );
        assert_eq!(
            link,
            "https://staff.example.com/Account/ResetPassword?email=mary%2Bhr%40example.com&token=a.b%2Fc"
        );
    }

    #[test]
    fn test_invalid_base_url_is_a_configuration_error() {
        assert!(matches!(
            LinkGenerator::new("not a url"),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_relative_link() {
        assert_eq!(relative("/", &[]), "/");
        assert_eq!(
            relative("/Account/ExternalLoginCallback", &[("returnUrl", "/Home/Details/1")]),
            "/Account/ExternalLoginCallback?returnUrl=%2FHome%2FDetails%2F1"
        );
        assert_eq!(
            relative("/Account/ExternalLoginCallback?returnUrl=%2F", &[("remoteError", "denied by user")]),
            "/Account/ExternalLoginCallback?returnUrl=%2F&remoteError=denied+by+user"
        );
    }

    #[test]
    fn test_is_local_url() {
        for local in ["/", "/Home/Details/2", "/Home?x=1", "~/", "~/Home"] {
            assert!(is_local_url(local), "{} should be local", local);
        }
        for foreign in [
            "",
            "http://evil.example",
            "https://evil.example/Home",
            "//evil.example",
            "/\\evil.example",
            "~//evil.example",
            "evil.example",
            "/Home\r\nLocation: http://evil.example",
        ] {
            assert!(!is_local_url(foreign), "{:?} should not be local", foreign);
        }
    }

    #[test]
    fn test_content_resolves_app_root() {
        assert_eq!(content("~/"), "/");
        assert_eq!(content("~/Home/Index"), "/Home/Index");
        assert_eq!(content("/Home"), "/Home");
    }
}
