pub mod actions;
pub mod convention;
pub mod dispatcher;
pub mod error;
pub mod interceptor;
pub mod mapping;
pub mod request;
pub mod validator;
pub mod view;

pub use actions::StaticActionHandler;
pub use convention::{ConventionConfig, ConventionResolver};
pub use dispatcher::{DispatchMode, Dispatcher, DispatcherBuilder, Resolution};
pub use error::{ConstraintKind, DispatchError, NotFoundReason, RegistrationError};
pub use interceptor::{InterceptorRule, InterceptorRuleEngine, PatternRule, RuleGuard, RulePattern};
pub use mapping::{MappingTable, ParamConstraint, RouteBuilder, RouteDescriptor};
pub use request::{RequestContext, RequestSnapshot, decode_path, normalize_path};
pub use validator::ConstraintValidator;
pub use view::{TemplateKind, View};
