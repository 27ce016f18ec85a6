//! Convention-over-configuration resolution for unmapped requests.
//!
//! The resolver owns an immutable [`ConventionConfig`] snapshot and a
//! [`ResourceStore`] used to probe for `<path><suffix>` candidates. When the
//! probe cache is enabled, successful probes are memoized for the lifetime of
//! the resolver; rebuilding the dispatcher on reload drops the cache with it.
//! Misses are never cached, so the cache holds at most one entry per view
//! file no matter which paths clients send.
use std::sync::Arc;

use scc::HashMap;

use crate::{
    config::models::ConventionSettings,
    core::{
        error::RegistrationError,
        view::{TemplateKind, View},
    },
    ports::resource_store::{ResourceResult, ResourceStore},
};

/// Template bound to the root path, which has no name of its own.
const ROOT_VIEW: &str = "index";

/// Validated, immutable convention settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionConfig {
    pub enabled: bool,
    pub interceptor_mode: bool,
    pub url_rewrite: bool,
    pub separator: char,
    pub deny_paths: Vec<String>,
    pub allow_paths: Vec<String>,
    /// Probe order; suffixes are unique.
    pub extensions: Vec<(String, TemplateKind)>,
    pub probe_cache: bool,
}

impl Default for ConventionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interceptor_mode: false,
            url_rewrite: false,
            separator: '_',
            deny_paths: Vec::new(),
            allow_paths: Vec::new(),
            extensions: TemplateKind::DEFAULT_PRECEDENCE
                .iter()
                .map(|kind| (kind.suffix().to_string(), *kind))
                .collect(),
            probe_cache: false,
        }
    }
}

impl ConventionConfig {
    pub fn from_settings(settings: &ConventionSettings) -> Result<Self, RegistrationError> {
        let mut chars = settings.url_param_separator.chars();
        let separator = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(RegistrationError::InvalidSeparator {
                    separator: settings.url_param_separator.clone(),
                });
            }
        };

        let mut extensions: Vec<(String, TemplateKind)> = Vec::new();
        for raw in &settings.extensions {
            let kind =
                TemplateKind::from_suffix(raw).ok_or_else(|| RegistrationError::UnknownExtension {
                    suffix: raw.clone(),
                })?;
            if extensions.iter().any(|(_, existing)| *existing == kind) {
                return Err(RegistrationError::DuplicateExtension {
                    suffix: raw.clone(),
                });
            }
            extensions.push((kind.suffix().to_string(), kind));
        }

        Ok(Self {
            enabled: settings.enabled,
            interceptor_mode: settings.interceptor_mode,
            url_rewrite: settings.url_rewrite,
            separator,
            deny_paths: settings.deny_paths.clone(),
            allow_paths: settings.allow_paths.clone(),
            extensions,
            probe_cache: settings.probe_cache,
        })
    }
}

pub struct ConventionResolver {
    config: ConventionConfig,
    store: Arc<dyn ResourceStore>,
    probe_cache: Option<HashMap<String, View>>,
}

impl ConventionResolver {
    pub fn new(config: ConventionConfig, store: Arc<dyn ResourceStore>) -> Self {
        let probe_cache = config.probe_cache.then(HashMap::new);
        Self {
            config,
            store,
            probe_cache,
        }
    }

    pub fn config(&self) -> &ConventionConfig {
        &self.config
    }

    /// Deny prefixes are checked first and always win; an empty allow-list
    /// admits every path that was not denied.
    pub fn is_path_allowed(&self, path: &str) -> bool {
        if self
            .config
            .deny_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return false;
        }
        self.config.allow_paths.is_empty()
            || self
                .config
                .allow_paths
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Split URL-rewrite parameters off the path.
    ///
    /// `/user_123_edit` becomes (`/user`, [`123`, `edit`]). Empty segments
    /// are skipped; order is preserved and duplicates are kept.
    pub fn split_url_params(&self, path: &str) -> (String, Vec<String>) {
        if !self.config.url_rewrite {
            return (path.to_string(), Vec::new());
        }
        let mut segments = path
            .split(self.config.separator)
            .filter(|segment| !segment.is_empty());
        match segments.next() {
            Some(base) => (base.to_string(), segments.map(str::to_string).collect()),
            None => (path.to_string(), Vec::new()),
        }
    }

    /// Probe `base + suffix` for each configured suffix in precedence order
    /// and bind a view to the first one that exists.
    pub fn resolve_by_extension(&self, base: &str) -> ResourceResult<Option<View>> {
        if let Some(cache) = &self.probe_cache
            && let Some(hit) = cache.read_sync(base, |_, view| view.clone())
        {
            tracing::trace!(path = base, "Convention probe cache hit");
            return Ok(Some(hit));
        }

        let resolved = self.probe(base)?;

        if let Some(cache) = &self.probe_cache
            && let Some(view) = &resolved
        {
            let _ = cache.insert_sync(base.to_string(), view.clone());
        }
        Ok(resolved)
    }

    fn probe(&self, base: &str) -> ResourceResult<Option<View>> {
        let stem = match base.trim_start_matches('/') {
            "" => ROOT_VIEW,
            stem => stem,
        };
        for (suffix, kind) in &self.config.extensions {
            let candidate = format!("{stem}{suffix}");
            if self.store.exists(&candidate)? {
                tracing::debug!(candidate = %candidate, kind = %kind, "Convention view found");
                return Ok(Some(View::template(*kind, stem)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryResourceStore;

    fn resolver(
        config: ConventionConfig,
        files: &[&str],
    ) -> (ConventionResolver, Arc<InMemoryResourceStore>) {
        let store = Arc::new(InMemoryResourceStore::with_files(files.iter().copied()));
        (ConventionResolver::new(config, store.clone()), store)
    }

    fn with_paths(deny: &[&str], allow: &[&str]) -> ConventionConfig {
        ConventionConfig {
            enabled: true,
            deny_paths: deny.iter().map(|s| s.to_string()).collect(),
            allow_paths: allow.iter().map(|s| s.to_string()).collect(),
            ..ConventionConfig::default()
        }
    }

    #[test]
    fn deny_prefix_beats_allow_prefix() {
        let (resolver, _) = resolver(with_paths(&["/admin"], &["/admin", "/pub"]), &[]);
        assert!(!resolver.is_path_allowed("/admin/x"));
        assert!(resolver.is_path_allowed("/pub/page"));
        assert!(!resolver.is_path_allowed("/other"));
    }

    #[test]
    fn empty_allow_list_admits_everything_not_denied() {
        let (resolver, _) = resolver(with_paths(&["/private"], &[]), &[]);
        assert!(resolver.is_path_allowed("/anything"));
        assert!(!resolver.is_path_allowed("/private/key"));
    }

    #[test]
    fn url_rewrite_split_preserves_order_and_duplicates() {
        let config = ConventionConfig {
            url_rewrite: true,
            ..ConventionConfig::default()
        };
        let (resolver, _) = resolver(config, &[]);

        assert_eq!(
            resolver.split_url_params("/user_123_edit"),
            ("/user".to_string(), vec!["123".to_string(), "edit".to_string()])
        );
        assert_eq!(
            resolver.split_url_params("/tag_b_a_b"),
            ("/tag".to_string(), vec!["b".into(), "a".into(), "b".into()])
        );
        assert_eq!(
            resolver.split_url_params("/page__2"),
            ("/page".to_string(), vec!["2".to_string()])
        );
        assert_eq!(resolver.split_url_params("/plain"), ("/plain".to_string(), vec![]));
    }

    #[test]
    fn split_is_identity_when_rewrite_disabled() {
        let (resolver, _) = resolver(ConventionConfig::default(), &[]);
        assert_eq!(
            resolver.split_url_params("/user_123"),
            ("/user_123".to_string(), vec![])
        );
    }

    #[test]
    fn custom_separator() {
        let config = ConventionConfig {
            url_rewrite: true,
            separator: '-',
            ..ConventionConfig::default()
        };
        let (resolver, _) = resolver(config, &[]);
        assert_eq!(
            resolver.split_url_params("/post-7"),
            ("/post".to_string(), vec!["7".to_string()])
        );
    }

    #[test]
    fn extension_probe_follows_precedence_and_stops_at_first_hit() {
        let (resolver, store) = resolver(ConventionConfig::default(), &["foo.jsp", "foo.ftl"]);

        let view = resolver.resolve_by_extension("/foo").unwrap();
        assert_eq!(view, Some(View::template(TemplateKind::Jsp, "foo")));
        // .html then .jsp; .ftl is never probed
        assert_eq!(store.probes(), 2);
    }

    #[test]
    fn extension_probe_misses() {
        let (resolver, store) = resolver(ConventionConfig::default(), &["bar.html"]);
        assert_eq!(resolver.resolve_by_extension("/foo").unwrap(), None);
        assert_eq!(store.probes(), 4);
    }

    #[test]
    fn root_probes_index() {
        let (resolver, _) = resolver(ConventionConfig::default(), &["index.html"]);
        assert_eq!(
            resolver.resolve_by_extension("/").unwrap(),
            Some(View::template(TemplateKind::Html, "index"))
        );
    }

    #[test]
    fn probe_cache_memoizes_hits_only() {
        let config = ConventionConfig {
            probe_cache: true,
            ..ConventionConfig::default()
        };
        let (resolver, store) = resolver(config, &["docs/intro.vm"]);

        let first = resolver.resolve_by_extension("/docs/intro").unwrap();
        let probes_after_first = store.probes();
        let second = resolver.resolve_by_extension("/docs/intro").unwrap();

        assert_eq!(first, Some(View::template(TemplateKind::Velocity, "docs/intro")));
        assert_eq!(first, second);
        assert_eq!(store.probes(), probes_after_first);

        let probes_before_miss = store.probes();
        assert_eq!(resolver.resolve_by_extension("/missing").unwrap(), None);
        let probes_per_miss = store.probes() - probes_before_miss;
        assert_eq!(resolver.resolve_by_extension("/missing").unwrap(), None);
        assert_eq!(store.probes(), probes_before_miss + 2 * probes_per_miss);
    }

    #[test]
    fn unknown_paths_never_grow_the_probe_cache() {
        let config = ConventionConfig {
            probe_cache: true,
            ..ConventionConfig::default()
        };
        let (resolver, _) = resolver(config, &["docs/intro.html"]);

        for i in 0..500 {
            let path = format!("/scan/{i}");
            assert_eq!(resolver.resolve_by_extension(&path).unwrap(), None);
        }
        resolver.resolve_by_extension("/docs/intro").unwrap();
        resolver.resolve_by_extension("/docs/intro").unwrap();

        let cache = resolver.probe_cache.as_ref().unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn settings_are_validated() {
        let mut settings = ConventionSettings::default();
        let config = ConventionConfig::from_settings(&settings).unwrap();
        assert_eq!(config, ConventionConfig::default());

        settings.extensions = vec![".ftl".into(), ".html".into()];
        let config = ConventionConfig::from_settings(&settings).unwrap();
        assert_eq!(
            config.extensions,
            vec![
                (".ftl".to_string(), TemplateKind::Freemarker),
                (".html".to_string(), TemplateKind::Html)
            ]
        );

        settings.extensions = vec![".html".into(), "html".into()];
        assert_eq!(
            ConventionConfig::from_settings(&settings),
            Err(RegistrationError::DuplicateExtension {
                suffix: "html".into()
            })
        );

        settings.extensions = vec![".php".into()];
        assert!(matches!(
            ConventionConfig::from_settings(&settings),
            Err(RegistrationError::UnknownExtension { .. })
        ));

        settings.extensions = vec![".html".into()];
        settings.url_param_separator = "--".into();
        assert!(matches!(
            ConventionConfig::from_settings(&settings),
            Err(RegistrationError::InvalidSeparator { .. })
        ));
    }
}
