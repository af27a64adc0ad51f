//! Queue routing for build jobs.
//!
//! Every job is dispatched to a named queue. Queue definitions come from
//! configuration and are matched in declaration order against the job's
//! repository and config; the first match wins and unmatched jobs land on
//! the default queue.

use rivet_core::config::first_str;
use rivet_core::{Error, FeatureFlags, Job, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Queue used when nothing matches and no override is configured.
pub const DEFAULT_QUEUE: &str = "builds.linux";

/// A dispatch queue and the predicates a job must satisfy to land on it.
///
/// Unset predicates are "don't care". A queue with no predicate at all never
/// matches; it can only be reached as the default queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    #[serde(rename = "queue")]
    pub name: String,
    /// Exact `owner/name` repository slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Repository owner name. Feature-gated per owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Required sudo value. Feature-gated per owner; an unset job value
    /// never satisfies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sudo: Option<bool>,
    /// Whether the owner must (or must not) be an active education account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<bool>,
    /// Owner feature flag gating `owner` and `sudo`. Defaults to the queue name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

impl Queue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = Some(sudo);
        self
    }

    pub fn with_education(mut self, education: bool) -> Self {
        self.education = Some(education);
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Name of the owner feature flag gating this queue.
    pub fn feature_flag(&self) -> &str {
        self.feature.as_deref().unwrap_or(&self.name)
    }

    fn has_predicates(&self) -> bool {
        self.slug.is_some()
            || self.owner.is_some()
            || self.os.is_some()
            || self.language.is_some()
            || self.sudo.is_some()
            || self.education.is_some()
    }

    fn owner_gated(&self) -> bool {
        self.owner.is_some() || self.sudo.is_some()
    }

    /// Whether a job with these attributes belongs on this queue.
    ///
    /// `owner_flag` is only consulted for owner- or sudo-gated queues.
    fn matches(&self, job: &JobAttributes<'_>, owner_flag: impl FnOnce() -> bool) -> bool {
        if !self.has_predicates() {
            return false;
        }

        let slug = self.slug.as_deref().is_none_or(|s| s == job.slug);
        let owner = self.owner.as_deref().is_none_or(|o| o == job.owner_name);
        let os = self.os.as_deref().is_none_or(|o| Some(o) == job.os);
        let language = self
            .language
            .as_deref()
            .is_none_or(|l| Some(l) == job.language);
        let sudo = self.sudo.is_none_or(|s| Some(s) == job.sudo);
        let education = self.education.is_none_or(|e| e == job.education);

        if !(slug && owner && os && language && sudo && education) {
            return false;
        }

        !self.owner_gated() || owner_flag()
    }
}

/// The job facts queues are matched against.
#[derive(Debug)]
struct JobAttributes<'a> {
    slug: String,
    owner_name: &'a str,
    os: Option<&'a str>,
    language: Option<&'a str>,
    sudo: Option<bool>,
    /// Education account with education routing enabled.
    education: bool,
}

impl<'a> JobAttributes<'a> {
    fn new(job: &'a Job, features: &dyn FeatureFlags) -> Self {
        let repository = &job.repository;
        Self {
            slug: repository.slug(),
            owner_name: &repository.owner_name,
            os: job.config.get("os").and_then(first_str),
            language: job.config.get("language").and_then(first_str),
            sudo: job.config.get("sudo").and_then(sudo_value),
            education: repository.owner.education && features.education_active(),
        }
    }
}

/// Interpret a config `sudo` value; anything unrecognized is unset.
fn sudo_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "required" | "enabled" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Queue definitions as loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default)]
    pub queues: Vec<Queue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_queue: Option<String>,
}

impl QueueSettings {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| Error::InvalidQueueConfig(e.to_string()))
    }

    /// The configured default queue, or [`DEFAULT_QUEUE`].
    pub fn default_queue_name(&self) -> &str {
        self.default_queue.as_deref().unwrap_or(DEFAULT_QUEUE)
    }
}

/// Where the router reads queue definitions from.
pub trait QueueConfigSource: Send + Sync {
    fn queue_settings(&self) -> QueueSettings;
}

impl QueueConfigSource for QueueSettings {
    fn queue_settings(&self) -> QueueSettings {
        self.clone()
    }
}

/// Settings that can be swapped at runtime; call
/// [`QueueRouter::invalidate_cache`] after writing.
impl QueueConfigSource for RwLock<QueueSettings> {
    fn queue_settings(&self) -> QueueSettings {
        match self.read() {
            Ok(settings) => settings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[derive(Debug)]
struct QueueTable {
    queues: Vec<Queue>,
    default: Queue,
}

impl QueueTable {
    fn from_settings(settings: QueueSettings) -> Self {
        let default = Queue::named(settings.default_queue_name());
        Self {
            queues: settings.queues,
            default,
        }
    }
}

/// Selects the dispatch queue for build jobs.
///
/// The queue table is derived from the config source on first use and
/// memoized until [`invalidate_cache`](Self::invalidate_cache) is called.
pub struct QueueRouter {
    source: Arc<dyn QueueConfigSource>,
    features: Arc<dyn FeatureFlags>,
    table: RwLock<Option<Arc<QueueTable>>>,
}

impl QueueRouter {
    pub fn new(source: Arc<dyn QueueConfigSource>, features: Arc<dyn FeatureFlags>) -> Self {
        Self {
            source,
            features,
            table: RwLock::new(None),
        }
    }

    /// The queue a job is dispatched to.
    ///
    /// Education queues are consulted first so that education accounts are
    /// routed there whatever their config says. The remaining queues are
    /// scanned in declaration order.
    pub fn queue_for(&self, job: &Job) -> Queue {
        let table = self.table();
        let attributes = JobAttributes::new(job, self.features.as_ref());
        let owner = &job.repository.owner;

        let matches = |queue: &&Queue| {
            queue.matches(&attributes, || {
                self.features.owner_active(queue.feature_flag(), owner)
            })
        };

        let selected = table
            .queues
            .iter()
            .filter(|q| q.education == Some(true))
            .find(matches)
            .or_else(|| table.queues.iter().find(matches));

        match selected {
            Some(queue) => {
                debug!(queue = %queue.name, slug = %attributes.slug, "Selected queue");
                queue.clone()
            }
            None => {
                debug!(queue = %table.default.name, slug = %attributes.slug, "No queue matched, using default");
                table.default.clone()
            }
        }
    }

    /// The configured queues in declaration order.
    pub fn queues(&self) -> Vec<Queue> {
        self.table().queues.clone()
    }

    pub fn default_queue(&self) -> Queue {
        self.table().default.clone()
    }

    /// Drop the memoized queue table; the next lookup rereads the source.
    pub fn invalidate_cache(&self) {
        let mut table = match self.table.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *table = None;
        info!("Queue table invalidated");
    }

    /// Reread the source now instead of on next use.
    pub fn reload(&self) {
        let fresh = Arc::new(QueueTable::from_settings(self.source.queue_settings()));
        let count = fresh.queues.len();
        let mut table = match self.table.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *table = Some(fresh);
        info!(queues = count, "Queue table reloaded");
    }

    fn table(&self) -> Arc<QueueTable> {
        let cached = match self.table.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(table) = cached {
            return table;
        }

        // Concurrent first lookups may both build a table; the first one
        // stored is kept.
        let fresh = Arc::new(QueueTable::from_settings(self.source.queue_settings()));
        let mut table = match self.table.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = table.as_ref() {
            return existing.clone();
        }
        *table = Some(fresh.clone());
        debug!(queues = fresh.queues.len(), "Queue table loaded");
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rivet_core::{BuildConfig, Owner, Repository, StaticFeatures};
    use serde_json::json;

    fn settings() -> QueueSettings {
        QueueSettings {
            queues: vec![
                Queue::named("builds.rails").with_slug("rails/rails"),
                Queue::named("builds.mac_osx").with_os("osx"),
                Queue::named("builds.docker").with_sudo(false),
                Queue::named("builds.education").with_education(true),
                Queue::named("builds.cloudfoundry").with_owner("cloudfoundry"),
                Queue::named("builds.clojure").with_language("clojure"),
                Queue::named("builds.erlang").with_language("erlang"),
            ],
            default_queue: None,
        }
    }

    fn all_flags() -> StaticFeatures {
        StaticFeatures::new()
            .with_flag_for_all("builds.docker")
            .with_flag_for_all("builds.cloudfoundry")
    }

    fn router(features: StaticFeatures) -> QueueRouter {
        QueueRouter::new(Arc::new(settings()), Arc::new(features))
    }

    fn job(config: Value, owner_name: &str, name: &str) -> Job {
        Job::new(BuildConfig::from_value(config), Repository::new(owner_name, name))
    }

    fn education_job(config: Value) -> Job {
        let repository =
            Repository::new("markronson", "recordcollection").with_owner(Owner::education("markronson"));
        Job::new(BuildConfig::from_value(config), repository)
    }

    #[test]
    fn test_default_queue() {
        assert_eq!(router(all_flags()).default_queue().name, "builds.linux");
    }

    #[test]
    fn test_default_queue_override() {
        let settings = QueueSettings {
            default_queue: Some("builds.common".to_string()),
            ..settings()
        };
        let router = QueueRouter::new(Arc::new(settings), Arc::new(all_flags()));
        assert_eq!(router.default_queue().name, "builds.common");
    }

    #[test]
    fn test_no_match_uses_default() {
        let router = router(all_flags());
        assert_eq!(router.queue_for(&job(json!({}), "travis-ci", "travis-ci")).name, "builds.linux");
    }

    #[test]
    fn test_slug_match() {
        let router = router(all_flags());
        assert_eq!(router.queue_for(&job(json!({}), "rails", "rails")).name, "builds.rails");
    }

    #[test]
    fn test_language_match() {
        let router = router(all_flags());
        let job = job(json!({ "language": "clojure" }), "travis-ci", "travis-ci");
        assert_eq!(router.queue_for(&job).name, "builds.clojure");
    }

    #[test]
    fn test_language_list_uses_first_element() {
        let router = router(all_flags());
        let job = job(json!({ "language": ["clojure"] }), "travis-ci", "travis-ci");
        assert_eq!(router.queue_for(&job).name, "builds.clojure");
    }

    #[test]
    fn test_owner_match() {
        let router = router(all_flags());
        assert_eq!(
            router.queue_for(&job(json!({}), "cloudfoundry", "bosh")).name,
            "builds.cloudfoundry"
        );
    }

    #[test]
    fn test_sudo_match() {
        let router = router(all_flags());
        let job = job(json!({ "sudo": false }), "markronson", "recordcollection");
        assert_eq!(router.queue_for(&job).name, "builds.docker");
    }

    #[test]
    fn test_education_match() {
        let router = router(all_flags().with_education(true));
        assert_eq!(router.queue_for(&education_job(json!({}))).name, "builds.education");
    }

    #[test]
    fn test_education_requires_global_flag() {
        let router = router(all_flags().with_education(false));
        assert_eq!(router.queue_for(&education_job(json!({}))).name, "builds.linux");
    }

    #[test]
    fn test_education_ignores_config() {
        let router = router(all_flags().with_education(true));
        let job = education_job(json!({ "os": "osx" }));
        assert_eq!(router.queue_for(&job).name, "builds.education");
    }

    #[test]
    fn test_os_match() {
        let router = router(all_flags());
        assert_eq!(
            router.queue_for(&job(json!({ "os": "osx" }), "travis-ci", "bosh")).name,
            "builds.mac_osx"
        );
        assert_eq!(
            router
                .queue_for(&job(json!({ "language": "clojure", "os": "osx" }), "travis-ci", "bosh"))
                .name,
            "builds.mac_osx"
        );
    }

    #[test]
    fn test_sudo_with_owner_flag() {
        let router = router(all_flags());
        let job = job(json!({ "language": "clojure", "sudo": false }), "travis-ci", "travis-core");
        assert_eq!(router.queue_for(&job).name, "builds.docker");
    }

    #[test]
    fn test_sudo_without_owner_flag() {
        let router = router(StaticFeatures::new());
        assert_eq!(
            router.queue_for(&job(json!({ "sudo": false }), "travis-ci", "travis-core")).name,
            "builds.linux"
        );
        assert_eq!(
            router
                .queue_for(&job(json!({ "language": "clojure", "sudo": false }), "travis-ci", "travis-core"))
                .name,
            "builds.clojure"
        );
    }

    #[test]
    fn test_owner_flag_is_per_owner() {
        let features = StaticFeatures::new().with_owner("builds.docker", "travis-ci");
        let router = router(features);
        assert_eq!(
            router.queue_for(&job(json!({ "sudo": false }), "travis-ci", "travis-core")).name,
            "builds.docker"
        );
        assert_eq!(
            router.queue_for(&job(json!({ "sudo": false }), "rails", "arel")).name,
            "builds.linux"
        );
    }

    #[test]
    fn test_first_match_wins() {
        let settings = QueueSettings {
            queues: vec![
                Queue::named("builds.rails").with_slug("rails/rails"),
                Queue::named("builds.docker").with_sudo(false),
            ],
            default_queue: None,
        };
        let router = QueueRouter::new(Arc::new(settings), Arc::new(all_flags()));
        let job = job(json!({ "sudo": false }), "rails", "rails");
        assert_eq!(router.queue_for(&job).name, "builds.rails");
    }

    #[test]
    fn test_queues_in_declaration_order() {
        let queues = router(all_flags()).queues();
        let names: Vec<&str> = queues.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "builds.rails",
                "builds.mac_osx",
                "builds.docker",
                "builds.education",
                "builds.cloudfoundry",
                "builds.clojure",
                "builds.erlang",
            ]
        );
        assert_eq!(queues[0].slug.as_deref(), Some("rails/rails"));
        assert_eq!(queues[2].sudo, Some(false));
        assert_eq!(queues[3].education, Some(true));
        assert_eq!(queues[4].owner.as_deref(), Some("cloudfoundry"));
        assert_eq!(queues[5].language.as_deref(), Some("clojure"));
    }

    #[test]
    fn test_queue_for_is_deterministic() {
        let router = router(all_flags());
        let job = job(json!({ "language": "erlang" }), "travis-ci", "travis-ci");
        let first = router.queue_for(&job);
        for _ in 0..5 {
            assert_eq!(router.queue_for(&job), first);
        }
    }

    fn attributes(config: Value) -> JobAttributes<'static> {
        let job = Box::leak(Box::new(job(config, "foo", "bar")));
        JobAttributes::new(job, &StaticFeatures::new())
    }

    #[test]
    fn test_matches_nothing_without_predicates() {
        let queue = Queue::named("builds.linux");
        assert!(!queue.matches(&attributes(json!({ "language": "cobol" })), || true));
    }

    #[test]
    fn test_matches_sudo_false() {
        let queue = Queue::named("builds.docker").with_sudo(false);
        assert!(queue.matches(&attributes(json!({ "sudo": false })), || true));
        assert!(queue.matches(&attributes(json!({ "sudo": "false" })), || true));
        assert!(!queue.matches(&attributes(json!({ "sudo": true })), || true));
        assert!(!queue.matches(&attributes(json!({ "sudo": "required" })), || true));
    }

    #[test]
    fn test_nil_sudo_does_not_match_sudo_false() {
        let queue = Queue::named("builds.docker").with_sudo(false);
        assert!(!queue.matches(&attributes(json!({})), || true));
        assert!(!queue.matches(&attributes(json!({ "sudo": null })), || true));
        assert!(!queue.matches(&attributes(json!({ "sudo": "maybe" })), || true));
    }

    #[test]
    fn test_owner_flag_only_consulted_when_gated() {
        let queue = Queue::named("builds.clojure").with_language("clojure");
        assert!(queue.matches(&attributes(json!({ "language": "clojure" })), || {
            panic!("flag lookup for an ungated queue")
        }));
    }

    #[test]
    fn test_custom_feature_flag_name() {
        let settings = QueueSettings {
            queues: vec![Queue::named("builds.gce").with_sudo(true).with_feature("gce")],
            default_queue: None,
        };
        let router = QueueRouter::new(
            Arc::new(settings),
            Arc::new(StaticFeatures::new().with_flag_for_all("gce")),
        );
        let job = job(json!({ "sudo": "required" }), "travis-ci", "travis-ci");
        assert_eq!(router.queue_for(&job).name, "builds.gce");
    }

    #[test]
    fn test_cache_invalidation() {
        let source = Arc::new(RwLock::new(settings()));
        let router = QueueRouter::new(source.clone(), Arc::new(all_flags()));
        assert_eq!(router.default_queue().name, "builds.linux");

        source.write().unwrap().default_queue = Some("builds.common".to_string());
        assert_eq!(router.default_queue().name, "builds.linux");

        router.invalidate_cache();
        assert_eq!(router.default_queue().name, "builds.common");
    }

    #[test]
    fn test_concurrent_lookups_share_one_table() {
        let source = Arc::new(RwLock::new(settings()));
        let router = QueueRouter::new(source.clone(), Arc::new(all_flags()));
        let lookup = |router: &QueueRouter| {
            let erlang = job(json!({ "language": "erlang" }), "travis-ci", "travis-ci");
            (router.queue_for(&erlang).name, router.default_queue().name)
        };

        let first: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| lookup(&router))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(first
            .iter()
            .all(|found| *found == ("builds.erlang".to_string(), "builds.linux".to_string())));

        source.write().unwrap().default_queue = Some("builds.common".to_string());
        router.invalidate_cache();

        let second: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| lookup(&router))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(second
            .iter()
            .all(|found| *found == ("builds.erlang".to_string(), "builds.common".to_string())));
    }

    #[test]
    fn test_reload() {
        let source = Arc::new(RwLock::new(settings()));
        let router = QueueRouter::new(source.clone(), Arc::new(all_flags()));
        assert_eq!(router.queues().len(), 7);

        source.write().unwrap().queues.truncate(1);
        router.reload();
        assert_eq!(router.queues().len(), 1);
    }

    #[test]
    fn test_settings_from_yaml() {
        let settings = QueueSettings::from_yaml_str(
            r#"
default_queue: builds.common
queues:
  - queue: builds.rails
    slug: rails/rails
  - queue: builds.docker
    sudo: false
    feature: docker
"#,
        )
        .unwrap();

        assert_eq!(settings.default_queue_name(), "builds.common");
        assert_eq!(
            settings.queues,
            vec![
                Queue::named("builds.rails").with_slug("rails/rails"),
                Queue::named("builds.docker").with_sudo(false).with_feature("docker"),
            ]
        );
    }

    #[test]
    fn test_settings_rejects_malformed_yaml() {
        let err = QueueSettings::from_yaml_str("queues: [{ slug: rails/rails }]").unwrap_err();
        assert!(matches!(err, Error::InvalidQueueConfig(_)));
    }
}
