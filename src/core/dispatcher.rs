//! Request dispatch orchestration.
//!
//! A [`Dispatcher`] is assembled once through [`DispatcherBuilder`] and is
//! immutable afterwards, so a single instance can serve any number of
//! concurrent requests without locking. Hot reload builds a fresh dispatcher
//! and swaps it in; see the binary for the `ArcSwap` wiring.
//!
//! Every call to [`Dispatcher::dispatch`] walks exactly one path:
//! * mapped: method → headers → params → (upload wrap) → handler → view
//! * unmapped: path filter → interceptor rules → URL split → convention hook
//!   → extension probe → view
//!
//! and ends either in a [`Resolution`] or a [`DispatchError`].
use std::sync::Arc;

use http::Method;

use crate::{
    config::models::DispatchConfig,
    core::{
        actions::StaticActionHandler,
        convention::{ConventionConfig, ConventionResolver},
        error::{DispatchError, NotFoundReason, RegistrationError},
        interceptor::{InterceptorRule, InterceptorRuleEngine, PatternRule, RuleGuard},
        mapping::{MappingTable, RouteDescriptor},
        request::{RequestContext, RequestSnapshot},
        validator::ConstraintValidator,
        view::View,
    },
    ports::{
        handler::ConventionHook,
        multipart::MultipartParser,
        resource_store::{ResourceError, ResourceStore},
    },
};

/// Which branch of the state machine produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Mapped,
    Convention,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Mapped => "mapped",
            DispatchMode::Convention => "convention",
        }
    }
}

/// Successful dispatch: the view to render and the request context it was
/// resolved against.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub view: View,
    pub mode: DispatchMode,
    pub context: RequestContext,
}

pub struct Dispatcher {
    mappings: MappingTable,
    rules: Option<InterceptorRuleEngine>,
    convention: ConventionResolver,
    hook: Option<Arc<dyn ConventionHook>>,
    multipart: Option<Arc<dyn MultipartParser>>,
}

impl Dispatcher {
    pub fn builder(
        convention: ConventionConfig,
        store: Arc<dyn ResourceStore>,
    ) -> DispatcherBuilder {
        DispatcherBuilder::new(convention, store)
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn convention(&self) -> &ConventionResolver {
        &self.convention
    }

    pub fn rule_count(&self) -> usize {
        self.rules.as_ref().map_or(0, InterceptorRuleEngine::len)
    }

    /// Resolve a request to a view. Synchronous and side-effect free apart
    /// from resource probing and the handler itself.
    pub fn dispatch(&self, request: RequestSnapshot) -> Result<Resolution, DispatchError> {
        let ctx = RequestContext::new(request);
        match self.mappings.resolve(ctx.path()) {
            Some(route) => self.dispatch_mapped(route, ctx),
            None => self.dispatch_convention(ctx),
        }
    }

    fn dispatch_mapped(
        &self,
        route: &RouteDescriptor,
        mut ctx: RequestContext,
    ) -> Result<Resolution, DispatchError> {
        ConstraintValidator::check(route, ctx.request()).inspect_err(|e| {
            tracing::warn!(
                path = route.path(),
                method = %ctx.method(),
                error = %e,
                "Route constraint rejected request"
            );
        })?;
        ctx.set_route(route.path());

        if ctx.method() == Method::POST && route.is_upload() {
            let parser = self.multipart.as_ref().ok_or_else(|| {
                DispatchError::Internal(format!(
                    "upload route {} has no multipart parser configured",
                    route.path()
                ))
            })?;
            let form = parser.parse(ctx.request()).map_err(|e| {
                tracing::error!(path = route.path(), error = %e, "Multipart parsing failed");
                DispatchError::Internal(format!("multipart parsing failed: {e}"))
            })?;
            tracing::debug!(files = form.files().len(), "Wrapped upload request");
            ctx.attach_multipart(form);
        }

        match route.handler().execute(&ctx) {
            Ok(Some(view)) => {
                tracing::debug!(path = route.path(), %view, "Mapped handler produced view");
                Ok(Resolution {
                    view,
                    mode: DispatchMode::Mapped,
                    context: ctx,
                })
            }
            Ok(None) => Err(DispatchError::not_found(
                ctx.path(),
                NotFoundReason::EmptyResult,
            )),
            Err(e) => {
                tracing::error!(path = route.path(), error = %e, "Handler execution failed");
                Err(DispatchError::Internal(e.to_string()))
            }
        }
    }

    fn dispatch_convention(&self, mut ctx: RequestContext) -> Result<Resolution, DispatchError> {
        if !self.convention.config().enabled {
            return Err(DispatchError::not_found(ctx.path(), NotFoundReason::NoMapping));
        }
        if !self.convention.is_path_allowed(ctx.path()) {
            tracing::debug!(path = ctx.path(), "Convention path denied");
            return Err(DispatchError::not_found(ctx.path(), NotFoundReason::PathDenied));
        }

        if let Some(view) = self.rules.as_ref().and_then(|rules| rules.evaluate(&ctx)) {
            return Ok(convention_resolution(view, ctx));
        }

        let (base, params) = self.convention.split_url_params(ctx.path());
        ctx.set_url_params(base, params);

        if let Some(view) = self.hook.as_ref().and_then(|hook| hook.on_convention(&ctx)) {
            tracing::debug!(path = ctx.path(), %view, "Convention hook produced view");
            return Ok(convention_resolution(view, ctx));
        }

        match self.convention.resolve_by_extension(ctx.resolved_path()) {
            Ok(Some(view)) => Ok(convention_resolution(view, ctx)),
            Ok(None) => Err(DispatchError::not_found(ctx.path(), NotFoundReason::NoView)),
            Err(ResourceError::InvalidPath(reason)) => {
                tracing::warn!(
                    path = ctx.path(),
                    reason = %reason,
                    "Rejected convention probe path"
                );
                Err(DispatchError::not_found(ctx.path(), NotFoundReason::PathDenied))
            }
            Err(e) => {
                tracing::error!(path = ctx.path(), error = %e, "Convention probe failed");
                Err(DispatchError::Internal(format!("view probe failed: {e}")))
            }
        }
    }
}

fn convention_resolution(view: View, context: RequestContext) -> Resolution {
    Resolution {
        view,
        mode: DispatchMode::Convention,
        context,
    }
}

/// Startup-time assembly of a [`Dispatcher`].
pub struct DispatcherBuilder {
    mappings: MappingTable,
    rules: Option<InterceptorRuleEngine>,
    convention: ConventionConfig,
    store: Arc<dyn ResourceStore>,
    hook: Option<Arc<dyn ConventionHook>>,
    multipart: Option<Arc<dyn MultipartParser>>,
}

impl DispatcherBuilder {
    pub fn new(convention: ConventionConfig, store: Arc<dyn ResourceStore>) -> Self {
        let rules = (convention.enabled && convention.interceptor_mode)
            .then(InterceptorRuleEngine::new);
        Self {
            mappings: MappingTable::new(),
            rules,
            convention,
            store,
            hook: None,
            multipart: None,
        }
    }

    /// Start from a configuration file: convention settings, declared routes
    /// and declared interceptor rules.
    pub fn from_config(
        config: &DispatchConfig,
        store: Arc<dyn ResourceStore>,
    ) -> Result<Self, RegistrationError> {
        let convention = ConventionConfig::from_settings(&config.convention)?;
        let mut builder = Self::new(convention, store);

        for route in &config.routes {
            let view = View::try_from(&route.action)?;
            let mut descriptor =
                RouteDescriptor::builder(&route.path, Arc::new(StaticActionHandler::new(view)))
                    .upload(route.upload);
            for method in &route.methods {
                let parsed = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| RegistrationError::InvalidMethod {
                        path: route.path.clone(),
                        method: method.clone(),
                    })?;
                descriptor = descriptor.method(parsed);
            }
            for (name, value) in &route.headers {
                descriptor = descriptor.header(name, value);
            }
            for (name, value) in &route.params {
                descriptor = descriptor.param(name, value);
            }
            builder.route(descriptor.build()?)?;
        }

        for (index, rule) in config.interceptor_rules.iter().enumerate() {
            let view = View::try_from(&rule.action)?;
            let name = rule
                .name
                .clone()
                .unwrap_or_else(|| format!("rule-{index}"));
            let mut pattern_rule = PatternRule::new(name, &rule.pattern, view);
            if let Some(header) = &rule.unless_header {
                pattern_rule = pattern_rule.guard(RuleGuard::UnlessHeader(header.clone()));
            }
            if let Some(param) = &rule.unless_param {
                pattern_rule = pattern_rule.guard(RuleGuard::UnlessParam(param.clone()));
            }
            builder.rule(Arc::new(pattern_rule));
        }

        Ok(builder)
    }

    pub fn route(&mut self, descriptor: RouteDescriptor) -> Result<&mut Self, RegistrationError> {
        self.mappings.register(descriptor)?;
        Ok(self)
    }

    /// Register an interceptor rule. Returns `false` (and drops the rule)
    /// when convention interceptor mode is off.
    pub fn rule(&mut self, rule: Arc<dyn InterceptorRule>) -> bool {
        match self.rules.as_mut() {
            Some(engine) => {
                engine.register(rule);
                true
            }
            None => {
                tracing::debug!(
                    rule = rule.name(),
                    "Interceptor mode disabled; ignoring rule"
                );
                false
            }
        }
    }

    pub fn convention_hook(&mut self, hook: Arc<dyn ConventionHook>) -> &mut Self {
        self.hook = Some(hook);
        self
    }

    pub fn multipart_parser(&mut self, parser: Arc<dyn MultipartParser>) -> &mut Self {
        self.multipart = Some(parser);
        self
    }

    pub fn build(self) -> Dispatcher {
        tracing::info!(
            routes = self.mappings.len(),
            rules = self.rules.as_ref().map_or(0, InterceptorRuleEngine::len),
            convention = self.convention.enabled,
            url_rewrite = self.convention.url_rewrite,
            "Dispatcher assembled"
        );
        Dispatcher {
            mappings: self.mappings,
            rules: self.rules,
            convention: ConventionResolver::new(self.convention, self.store),
            hook: self.hook,
            multipart: self.multipart,
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::{
        adapters::memory_store::InMemoryResourceStore,
        config::models::{ConventionSettings, InterceptorRuleConfig, RouteConfig, ViewAction},
        core::{error::ConstraintKind, view::TemplateKind},
        ports::{
            handler::{HandlerError, HandlerResult},
            multipart::{MultipartError, MultipartForm},
        },
    };

    fn convention_on() -> ConventionConfig {
        ConventionConfig {
            enabled: true,
            interceptor_mode: true,
            url_rewrite: true,
            ..ConventionConfig::default()
        }
    }

    fn store(files: &[&str]) -> Arc<InMemoryResourceStore> {
        Arc::new(InMemoryResourceStore::with_files(files.iter().copied()))
    }

    fn view_handler(view: View) -> Arc<StaticActionHandler> {
        Arc::new(StaticActionHandler::new(view))
    }

    #[test]
    fn mapped_route_executes_handler() {
        let mut builder = Dispatcher::builder(ConventionConfig::default(), store(&[]));
        let users = view_handler(View::template(TemplateKind::Jsp, "users"));
        builder
            .route(RouteDescriptor::builder("/users", users).build().unwrap())
            .unwrap();
        let dispatcher = builder.build();

        let resolution = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/users/"))
            .unwrap();
        assert_eq!(resolution.mode, DispatchMode::Mapped);
        assert_eq!(resolution.view, View::template(TemplateKind::Jsp, "users"));
        assert_eq!(resolution.context.route(), Some("/users"));
    }

    #[test]
    fn handler_without_view_is_not_found() {
        let mut builder = Dispatcher::builder(ConventionConfig::default(), store(&[]));
        let empty = |_: &RequestContext| -> HandlerResult<Option<View>> { Ok(None) };
        builder
            .route(RouteDescriptor::builder("/empty", Arc::new(empty)).build().unwrap())
            .unwrap();
        let dispatcher = builder.build();

        let err = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/empty"))
            .unwrap_err();
        assert_eq!(err, DispatchError::not_found("/empty", NotFoundReason::EmptyResult));
    }

    #[test]
    fn handler_failure_is_internal() {
        let mut builder = Dispatcher::builder(ConventionConfig::default(), store(&[]));
        let failing = |_: &RequestContext| -> HandlerResult<Option<View>> {
            Err(HandlerError::Failed("database unavailable".into()))
        };
        builder
            .route(RouteDescriptor::builder("/boom", Arc::new(failing)).build().unwrap())
            .unwrap();
        let err = builder
            .build()
            .dispatch(RequestSnapshot::new(Method::GET, "/boom"))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upload_route_wraps_post_requests_only() {
        struct FixedParser;
        impl MultipartParser for FixedParser {
            fn parse(&self, _request: &RequestSnapshot) -> Result<MultipartForm, MultipartError> {
                let mut form = MultipartForm::new();
                form.add_field("title", "holiday");
                Ok(form)
            }
        }

        let echo = |ctx: &RequestContext| -> HandlerResult<Option<View>> {
            let title = ctx.param("title").unwrap_or("none").to_string();
            Ok(Some(View::redirect(format!("/done/{title}"))))
        };
        let mut builder = Dispatcher::builder(ConventionConfig::default(), store(&[]));
        builder
            .route(
                RouteDescriptor::builder("/upload", Arc::new(echo))
                    .methods([Method::GET, Method::POST])
                    .upload(true)
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .multipart_parser(Arc::new(FixedParser));
        let dispatcher = builder.build();

        let post = dispatcher
            .dispatch(RequestSnapshot::new(Method::POST, "/upload"))
            .unwrap();
        assert_eq!(post.view, View::redirect("/done/holiday"));
        assert!(post.context.multipart().is_some());

        let get = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/upload"))
            .unwrap();
        assert_eq!(get.view, View::redirect("/done/none"));
        assert!(get.context.multipart().is_none());
    }

    #[test]
    fn upload_route_without_parser_is_internal() {
        let mut builder = Dispatcher::builder(ConventionConfig::default(), store(&[]));
        builder
            .route(
                RouteDescriptor::builder("/upload", view_handler(View::Status(StatusCode::OK)))
                    .method(Method::POST)
                    .upload(true)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let err = builder
            .build()
            .dispatch(RequestSnapshot::new(Method::POST, "/upload"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Internal(_)));
    }

    #[test]
    fn unmapped_without_convention_is_not_found() {
        let dispatcher =
            Dispatcher::builder(ConventionConfig::default(), store(&["page.html"])).build();
        let err = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/page"))
            .unwrap_err();
        assert_eq!(err, DispatchError::not_found("/page", NotFoundReason::NoMapping));
    }

    #[test]
    fn convention_attaches_url_params_to_context() {
        let dispatcher = Dispatcher::builder(convention_on(), store(&["user.ftl"])).build();

        let resolution = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/user_123_edit"))
            .unwrap();
        assert_eq!(resolution.mode, DispatchMode::Convention);
        assert_eq!(resolution.view, View::template(TemplateKind::Freemarker, "user"));
        assert_eq!(resolution.context.resolved_path(), "/user");
        assert_eq!(resolution.context.url_params(), ["123", "edit"]);
        assert_eq!(resolution.context.route(), None);
    }

    #[test]
    fn interceptor_rule_short_circuits_before_probe() {
        let files = store(&["member/home.html"]);
        let mut builder = Dispatcher::builder(convention_on(), files.clone());
        assert!(builder.rule(Arc::new(PatternRule::new(
            "login",
            "/member*",
            View::redirect("/login"),
        ))));
        let dispatcher = builder.build();

        let resolution = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/member/home"))
            .unwrap();
        assert_eq!(resolution.view, View::redirect("/login"));
        assert_eq!(files.probes(), 0);
    }

    #[test]
    fn rules_are_dropped_when_interceptor_mode_is_off() {
        let config = ConventionConfig {
            interceptor_mode: false,
            ..convention_on()
        };
        let mut builder = Dispatcher::builder(config, store(&["member/home.html"]));
        assert!(!builder.rule(Arc::new(PatternRule::new(
            "login",
            "/member*",
            View::redirect("/login"),
        ))));
        let dispatcher = builder.build();
        assert_eq!(dispatcher.rule_count(), 0);

        let resolution = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/member/home"))
            .unwrap();
        assert_eq!(resolution.view, View::template(TemplateKind::Html, "member/home"));
    }

    #[test]
    fn convention_hook_runs_after_split_and_before_probe() {
        let files = store(&["report.html"]);
        let mut builder = Dispatcher::builder(convention_on(), files.clone());
        builder.convention_hook(Arc::new(|ctx: &RequestContext| {
            (ctx.resolved_path() == "/report" && ctx.url_param(0) == Some("csv"))
                .then(|| View::Status(StatusCode::NOT_ACCEPTABLE))
        }));
        let dispatcher = builder.build();

        let hooked = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/report_csv"))
            .unwrap();
        assert_eq!(hooked.view, View::Status(StatusCode::NOT_ACCEPTABLE));
        assert_eq!(files.probes(), 0);

        let probed = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/report_html"))
            .unwrap();
        assert_eq!(probed.view, View::template(TemplateKind::Html, "report"));
    }

    #[test]
    fn rejected_probe_path_is_not_found() {
        struct RejectingStore;

        impl ResourceStore for RejectingStore {
            fn exists(&self, path: &str) -> crate::ports::resource_store::ResourceResult<bool> {
                Err(ResourceError::InvalidPath(format!("refused {path}")))
            }
        }

        let dispatcher = Dispatcher::builder(convention_on(), Arc::new(RejectingStore)).build();
        let err = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/secret"))
            .unwrap_err();
        assert_eq!(err, DispatchError::not_found("/secret", NotFoundReason::PathDenied));
    }

    #[test]
    fn dot_segments_are_resolved_before_filters_and_rules() {
        let config = ConventionConfig {
            deny_paths: vec!["/admin".into()],
            ..convention_on()
        };
        let files = store(&["admin/secret.html", "members/area.html"]);
        let mut builder = Dispatcher::builder(config, files.clone());
        assert!(builder.rule(Arc::new(PatternRule::new(
            "login",
            "/members*",
            View::redirect("/login"),
        ))));
        let dispatcher = builder.build();

        let err = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/pub/../admin/secret"))
            .unwrap_err();
        assert_eq!(err, DispatchError::not_found("/admin/secret", NotFoundReason::PathDenied));

        let resolution = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/pub/./../members/area"))
            .unwrap();
        assert_eq!(resolution.view, View::redirect("/login"));
        assert_eq!(files.probes(), 0);
    }

    #[test]
    fn from_config_registers_routes_and_rules() {
        let config = DispatchConfig {
            convention: ConventionSettings {
                enabled: true,
                interceptor_mode: true,
                ..ConventionSettings::default()
            },
            routes: vec![RouteConfig {
                path: "/api/status".into(),
                methods: vec!["get".into(), "head".into()],
                headers: [("x-client".to_string(), "cli".to_string())].into_iter().collect(),
                params: Default::default(),
                upload: false,
                action: ViewAction::Status { code: 204 },
            }],
            interceptor_rules: vec![InterceptorRuleConfig {
                name: None,
                pattern: "/private*".into(),
                unless_header: Some("authorization".into()),
                unless_param: None,
                action: ViewAction::Redirect {
                    location: "/login".into(),
                },
            }],
            ..DispatchConfig::default()
        };
        let dispatcher = DispatcherBuilder::from_config(&config, store(&[]))
            .unwrap()
            .build();

        assert_eq!(dispatcher.mappings().len(), 1);
        assert_eq!(dispatcher.rule_count(), 1);

        let ok = dispatcher
            .dispatch(
                RequestSnapshot::new(Method::HEAD, "/api/status").with_header("X-Client", "CLI"),
            )
            .unwrap();
        assert_eq!(ok.view, View::Status(StatusCode::NO_CONTENT));

        let err = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/api/status"))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Validation {
                kind: ConstraintKind::Header,
                name: "x-client".into()
            }
        );

        let redirected = dispatcher
            .dispatch(RequestSnapshot::new(Method::GET, "/private/area"))
            .unwrap();
        assert_eq!(redirected.view, View::redirect("/login"));
    }

    #[test]
    fn from_config_rejects_bad_method() {
        let config = DispatchConfig {
            routes: vec![RouteConfig {
                path: "/a".into(),
                methods: vec!["GE T".into()],
                headers: Default::default(),
                params: Default::default(),
                upload: false,
                action: ViewAction::Status { code: 200 },
            }],
            ..DispatchConfig::default()
        };
        assert!(matches!(
            DispatcherBuilder::from_config(&config, store(&[])),
            Err(RegistrationError::InvalidMethod { .. })
        ));
    }
}
