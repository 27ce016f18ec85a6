use std::{collections::HashSet, net::SocketAddr, path::Path};

use http::{Method, StatusCode};

use crate::{
    config::models::{
        ConventionSettings, DispatchConfig, InterceptorRuleConfig, RouteConfig, ViewAction,
    },
    core::{
        request::normalize_path,
        view::{TemplateKind, View},
    },
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Route conflict detected: {message}")]
    RouteConflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Dispatcher configuration validator
///
/// Collects every problem in one pass so a broken config file can be fixed
/// in a single edit.
pub struct DispatchConfigValidator;

impl DispatchConfigValidator {
    /// Validate the entire dispatcher configuration
    pub fn validate(config: &DispatchConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "max_body_bytes".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        errors.extend(Self::validate_convention(&config.convention));

        for route in &config.routes {
            errors.extend(Self::validate_route(route));
        }

        for (index, rule) in config.interceptor_rules.iter().enumerate() {
            errors.extend(Self::validate_rule(index, rule));
        }

        if let Err(conflicts) = Self::check_route_conflicts(&config.routes) {
            errors.extend(conflicts);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_convention(settings: &ConventionSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if settings.url_param_separator.chars().count() != 1 {
            errors.push(ValidationError::InvalidField {
                field: "convention.url_param_separator".to_string(),
                message: format!(
                    "Must be exactly one character, got '{}'",
                    settings.url_param_separator
                ),
            });
        } else if settings.url_param_separator == "/" {
            errors.push(ValidationError::InvalidField {
                field: "convention.url_param_separator".to_string(),
                message: "The path separator '/' cannot split URL parameters".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for suffix in &settings.extensions {
            match TemplateKind::from_suffix(suffix) {
                Some(kind) if !seen.insert(kind) => errors.push(ValidationError::InvalidField {
                    field: "convention.extensions".to_string(),
                    message: format!("Duplicate view extension '{suffix}'"),
                }),
                Some(_) => {}
                None => errors.push(ValidationError::InvalidField {
                    field: "convention.extensions".to_string(),
                    message: format!(
                        "Unknown view extension '{suffix}' (expected .html, .jsp, .ftl or .vm)"
                    ),
                }),
            }
        }
        if settings.enabled && settings.extensions.is_empty() {
            errors.push(ValidationError::InvalidField {
                field: "convention.extensions".to_string(),
                message: "Convention mode needs at least one view extension".to_string(),
            });
        }

        for (field, prefixes) in [
            ("convention.deny_paths", &settings.deny_paths),
            ("convention.allow_paths", &settings.allow_paths),
        ] {
            for prefix in prefixes.iter().filter(|p| !p.starts_with('/')) {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: format!("Path prefix '{prefix}' must start with '/'"),
                });
            }
        }

        if settings.enabled && !Path::new(&settings.base_view_path).is_dir() {
            errors.push(ValidationError::InvalidField {
                field: "convention.base_view_path".to_string(),
                message: format!(
                    "View directory '{}' does not exist",
                    settings.base_view_path
                ),
            });
        }

        errors
    }

    /// Validate a single route configuration
    fn validate_route(route: &RouteConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let path = &route.path;

        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("route path: {path}"),
                message: "Route paths must start with '/'".to_string(),
            });
        }

        for method in &route.methods {
            if Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("route '{path}' methods"),
                    message: format!("Invalid HTTP method '{method}'"),
                });
            }
        }

        for (name, value) in &route.headers {
            if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidField {
                    field: format!("route '{path}' headers"),
                    message: format!("Invalid header name '{name}'"),
                });
            }
            if value.trim() == "*" {
                errors.push(ValidationError::InvalidField {
                    field: format!("route '{path}' headers"),
                    message: format!(
                        "Header '{name}' uses '*'; wildcards are only supported for params"
                    ),
                });
            }
        }

        if let Err(e) = Self::validate_action(&route.action, &format!("route '{path}' action")) {
            errors.push(e);
        }

        errors
    }

    fn validate_rule(index: usize, rule: &InterceptorRuleConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let label = rule
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", index + 1));

        if !rule.pattern.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("interceptor rule {label} pattern"),
                message: format!("Pattern '{}' must start with '/'", rule.pattern),
            });
        }
        if rule.pattern.trim_end_matches('*').contains('*') {
            errors.push(ValidationError::InvalidField {
                field: format!("interceptor rule {label} pattern"),
                message: "Only a single trailing '*' is supported".to_string(),
            });
        }
        let context = format!("interceptor rule {label} action");
        if let Err(e) = Self::validate_action(&rule.action, &context) {
            errors.push(e);
        }

        errors
    }

    fn validate_action(action: &ViewAction, field: &str) -> ValidationResult<()> {
        let message = match action {
            ViewAction::View { template } if View::from_template_file(template).is_none() => {
                format!("Template '{template}' must end with .html, .jsp, .ftl or .vm")
            }
            ViewAction::Status { code } if StatusCode::from_u16(*code).is_err() => {
                format!("Invalid status code {code}")
            }
            ViewAction::Redirect { location } if location.is_empty() => {
                "Redirect location must not be empty".to_string()
            }
            _ => return Ok(()),
        };
        Err(ValidationError::InvalidField {
            field: field.to_string(),
            message,
        })
    }

    /// Two routes may not share a path, even with different method sets
    fn check_route_conflicts(routes: &[RouteConfig]) -> Result<(), Vec<ValidationError>> {
        let mut seen = HashSet::new();
        let conflicts: Vec<ValidationError> = routes
            .iter()
            .map(|route| normalize_path(&route.path))
            .filter(|path| !seen.insert(path.clone()))
            .map(|path| ValidationError::RouteConflict {
                message: format!("Path '{path}' is declared more than once"),
            })
            .collect();

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(conflicts)
        }
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            methods: vec!["GET".to_string()],
            headers: Default::default(),
            params: Default::default(),
            upload: false,
            action: ViewAction::Status { code: 200 },
        }
    }

    fn minimal_valid_config() -> DispatchConfig {
        DispatchConfig {
            listen_addr: "127.0.0.1:8080".to_string(),
            routes: vec![route("/health")],
            ..DispatchConfig::default()
        }
    }

    fn failure_message(config: &DispatchConfig) -> String {
        match DispatchConfigValidator::validate(config) {
            Err(ValidationError::ValidationFailed { message }) => message,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(DispatchConfigValidator::validate(&minimal_valid_config()).is_ok());
    }

    #[test]
    fn validate_rejects_bad_listen_address() {
        let config = DispatchConfig {
            listen_addr: "localhost".to_string(),
            ..minimal_valid_config()
        };
        assert!(failure_message(&config).contains("Invalid listen address"));
    }

    #[test]
    fn validate_rejects_duplicate_route_paths() {
        let mut config = minimal_valid_config();
        config.routes.push(route("/health/"));
        assert!(failure_message(&config).contains("declared more than once"));
    }

    #[test]
    fn validate_rejects_unknown_and_duplicate_extensions() {
        let mut config = minimal_valid_config();
        config.convention.extensions = vec![".html".into(), ".php".into(), "html".into()];
        let message = failure_message(&config);
        assert!(message.contains("Unknown view extension '.php'"));
        assert!(message.contains("Duplicate view extension 'html'"));
        assert!(message.starts_with("Found 2 validation errors"));
    }

    #[test]
    fn validate_rejects_bad_separator() {
        let mut config = minimal_valid_config();
        config.convention.url_param_separator = String::new();
        assert!(failure_message(&config).contains("url_param_separator"));
    }

    #[test]
    fn validate_rejects_missing_view_directory_when_enabled() {
        let mut config = minimal_valid_config();
        config.convention.enabled = true;
        config.convention.base_view_path = "/definitely/not/a/dir".into();
        assert!(failure_message(&config).contains("does not exist"));
    }

    #[test]
    fn validate_accepts_existing_view_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = minimal_valid_config();
        config.convention.enabled = true;
        config.convention.base_view_path = dir.path().to_string_lossy().into_owned();
        assert!(DispatchConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn validate_rejects_bad_actions_and_methods() {
        let mut config = minimal_valid_config();
        let mut bad = route("/bad");
        bad.methods = vec!["NOT A METHOD".into()];
        bad.action = ViewAction::View {
            template: "bad.txt".into(),
        };
        config.routes.push(bad);
        let message = failure_message(&config);
        assert!(message.contains("Invalid HTTP method"));
        assert!(message.contains("must end with"));
    }

    #[test]
    fn validate_rejects_inner_wildcard_in_rule_pattern() {
        let mut config = minimal_valid_config();
        config.interceptor_rules.push(InterceptorRuleConfig {
            name: Some("auth".into()),
            pattern: "/a*/b*".into(),
            unless_header: None,
            unless_param: None,
            action: ViewAction::Redirect {
                location: "/login".into(),
            },
        });
        assert!(failure_message(&config).contains("interceptor rule auth pattern"));
    }
}
