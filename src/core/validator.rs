//! Allow-list checks run against a matched route before its handler executes.
//!
//! Every check is a pure inspection and stops at the first failing
//! constraint so the caller can report the offending name.
use http::Method;

use crate::core::{
    error::{ConstraintKind, DispatchError},
    mapping::{ParamConstraint, RouteDescriptor},
    request::RequestSnapshot,
};

pub struct ConstraintValidator;

impl ConstraintValidator {
    pub fn check_method(route: &RouteDescriptor, method: &Method) -> Result<(), DispatchError> {
        if route.allows(method) {
            return Ok(());
        }
        Err(DispatchError::MethodNotAllowed {
            method: method.clone(),
            path: route.path().to_string(),
            allowed: route.methods().to_vec(),
        })
    }

    pub fn check_headers(
        route: &RouteDescriptor,
        request: &RequestSnapshot,
    ) -> Result<(), DispatchError> {
        for (name, expected) in route.headers() {
            let matches = request
                .header(name)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(expected));
            if !matches {
                return Err(DispatchError::Validation {
                    kind: ConstraintKind::Header,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn check_params(
        route: &RouteDescriptor,
        request: &RequestSnapshot,
    ) -> Result<(), DispatchError> {
        for (name, constraint) in route.params() {
            let matches = match constraint {
                ParamConstraint::Present => request.has_param(name),
                ParamConstraint::Equals(expected) => request
                    .param(name)
                    .is_some_and(|actual| actual.eq_ignore_ascii_case(expected)),
            };
            if !matches {
                return Err(DispatchError::Validation {
                    kind: ConstraintKind::Param,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Run method, header and parameter checks in that order.
    pub fn check(route: &RouteDescriptor, request: &RequestSnapshot) -> Result<(), DispatchError> {
        Self::check_method(route, request.method())?;
        Self::check_headers(route, request)?;
        Self::check_params(route, request)
    }
}
