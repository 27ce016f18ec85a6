//! Built-in behavior for routes and rules declared in configuration.
use http::StatusCode;

use crate::{
    config::models::ViewAction,
    core::{error::RegistrationError, request::RequestContext, view::View},
    ports::handler::{Handler, HandlerResult},
};

impl TryFrom<&ViewAction> for View {
    type Error = RegistrationError;

    fn try_from(action: &ViewAction) -> Result<Self, Self::Error> {
        match action {
            ViewAction::View { template } => {
                View::from_template_file(template).ok_or_else(|| RegistrationError::InvalidAction {
                    message: format!("template '{template}' has no known view extension"),
                })
            }
            ViewAction::Status { code } => StatusCode::from_u16(*code)
                .map(View::Status)
                .map_err(|_| RegistrationError::InvalidAction {
                    message: format!("invalid status code {code}"),
                }),
            ViewAction::Redirect { location } if location.is_empty() => {
                Err(RegistrationError::InvalidAction {
                    message: "redirect location must not be empty".to_string(),
                })
            }
            ViewAction::Redirect { location } => Ok(View::redirect(location.as_str())),
        }
    }
}

/// Handler answering every request with the same view.
#[derive(Debug, Clone)]
pub struct StaticActionHandler {
    view: View,
}

impl StaticActionHandler {
    pub fn new(view: View) -> Self {
        Self { view }
    }
}

impl Handler for StaticActionHandler {
    fn execute(&self, _ctx: &RequestContext) -> HandlerResult<Option<View>> {
        Ok(Some(self.view.clone()))
    }
}
