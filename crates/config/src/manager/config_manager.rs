//! The configuration manager

use super::builder::ConfigManagerBuilder;
use super::options::{ManagerOptions, SetOptions, UpdateOptions};
use super::pipeline::{Pipeline, Prepared, Scope};
use super::snapshot::Snapshot;
use super::state::ManagerState;
use crate::changes::{
    ChangeNotification, ChangeNotifier, ChangeReceiver, Subscription, diff_with_sources,
};
use crate::core::document::{json_type_name, merge_json};
use crate::core::{ChangeSource, ConfigError, ConfigProvider, ConfigResult, SourceMap, path};
use crate::portfolio::{PersonalInfo, SeoConfig, SiteConfig, ThemeConfig};
use crate::template::{TemplateContext, TemplateEngine, TemplateIssue, TemplatePreview};
use crate::watchers::FileWatcher;
use arc_swap::ArcSwapOption;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Background {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    watchers: Vec<Arc<FileWatcher>>,
}

/// Owns the committed configuration snapshot
///
/// The manager is the only place configuration changes: every mutation
/// runs validate → default-fill → template-resolve under one async lock,
/// swaps in a new immutable [`Snapshot`], then notifies subscribers after
/// the lock is released. Reads never block on mutations.
///
/// Construct one per application with [`ConfigManager::builder`] and share
/// it behind an `Arc`.
pub struct ConfigManager {
    provider: Arc<dyn ConfigProvider>,
    pipeline: Pipeline,
    snapshot: ArcSwapOption<Snapshot>,
    state: AtomicU8,
    version: AtomicU64,
    mutation: tokio::sync::Mutex<()>,
    cache: DashMap<String, (u64, Option<Value>)>,
    notifier: ChangeNotifier,
    last_error: RwLock<Option<ConfigError>>,
    background: Mutex<Background>,
}

impl ConfigManager {
    /// Start building a manager
    pub fn builder() -> ConfigManagerBuilder {
        ConfigManagerBuilder::new()
    }

    pub(crate) fn from_parts(provider: Arc<dyn ConfigProvider>, pipeline: Pipeline) -> Self {
        Self {
            provider,
            pipeline,
            snapshot: ArcSwapOption::empty(),
            state: AtomicU8::new(ManagerState::Uninitialized.to_u8()),
            version: AtomicU64::new(0),
            mutation: tokio::sync::Mutex::new(()),
            cache: DashMap::new(),
            notifier: ChangeNotifier::new(),
            last_error: RwLock::new(None),
            background: Mutex::new(Background::default()),
        }
    }

    // ==================== Lifecycle ====================

    /// Fetch, validate, resolve and commit the first snapshot
    ///
    /// On failure the manager is `Errored` and the error (including every
    /// schema violation) is returned.
    pub async fn initialize(&self) -> ConfigResult<Arc<Value>> {
        self.refresh().await
    }

    /// Re-fetch from the provider and commit
    ///
    /// Uses the configured reload timeout when one is set. A failed reload
    /// keeps the previous snapshot readable.
    pub async fn reload(&self) -> ConfigResult<Arc<Value>> {
        match self.pipeline.options.reload_timeout {
            Some(timeout) => self.reload_with_timeout(timeout).await,
            None => self.refresh().await,
        }
    }

    /// Reload, giving up after `timeout`
    ///
    /// On expiry the in-flight run is abandoned, the state it replaced and
    /// the previous snapshot stay in place and
    /// [`ConfigError::ReloadTimeout`] is returned. Time spent waiting for
    /// another mutation counts toward the timeout.
    pub async fn reload_with_timeout(&self, timeout: Duration) -> ConfigResult<Arc<Value>> {
        let mut replaced = None;
        let run = async {
            let guard = self.mutation.lock().await;
            replaced = Some(self.state());
            self.refresh_locked(guard).await
        };
        let outcome = tokio::time::timeout(timeout, run).await;
        if let Ok(result) = outcome {
            return result;
        }

        // Only a run that got the lock touched the state
        if let Some(previous) = replaced {
            self.set_state(previous);
        }
        folio_log::warn!(
            timeout = ?timeout,
            state = %self.state(),
            source = %self.provider.describe(),
            "Configuration reload timed out; keeping previous snapshot"
        );
        Err(ConfigError::reload_timeout(timeout))
    }

    async fn refresh(&self) -> ConfigResult<Arc<Value>> {
        let guard = self.mutation.lock().await;
        self.refresh_locked(guard).await
    }

    async fn refresh_locked(
        &self,
        guard: tokio::sync::MutexGuard<'_, ()>,
    ) -> ConfigResult<Arc<Value>> {
        let loaded = self.snapshot.load().is_some();
        let phase = if loaded {
            ManagerState::Reloading
        } else {
            ManagerState::Loading
        };
        self.set_state(phase);
        let started = Instant::now();
        folio_log::debug!(
            source = %self.provider.describe(),
            state = %phase,
            "Fetching configuration"
        );

        let outcome = match self.provider.fetch().await {
            Ok(fetched) => self
                .pipeline
                .run(&fetched.document, Scope::Full)
                .map(|prepared| (prepared, fetched.sources)),
            Err(e) => Err(e),
        };
        let (prepared, sources) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e, phase)),
        };

        let reason = if loaded { "reload" } else { "initialize" };
        let (document, notification) = self.commit(prepared, sources, started, reason);
        drop(guard);
        self.dispatch(notification);
        Ok(document)
    }

    fn fail(&self, error: ConfigError, phase: ManagerState) -> ConfigError {
        self.set_state(ManagerState::Errored);
        folio_log::error!(
            phase = %phase,
            retained_snapshot = self.snapshot.load().is_some(),
            error = %error,
            "Configuration pipeline failed"
        );
        *self.last_error.write() = Some(error.clone());
        error
    }

    /// Stop background tasks, drop subscribers and release the snapshot
    pub async fn shutdown(&self) {
        let (tasks, watchers) = {
            let mut background = self.background.lock();
            background.token.cancel();
            background.token = CancellationToken::new();
            (
                std::mem::take(&mut background.tasks),
                std::mem::take(&mut background.watchers),
            )
        };
        for watcher in &watchers {
            watcher.stop();
        }
        for task in tasks {
            if let Err(e) = task.await
                && e.is_panic()
            {
                folio_log::error!(error = %e, "Background configuration task panicked");
            }
        }

        self.notifier.clear();
        let _guard = self.mutation.lock().await;
        self.snapshot.store(None);
        self.cache.clear();
        *self.last_error.write() = None;
        self.set_state(ManagerState::Uninitialized);
        folio_log::info!("Configuration manager shut down");
    }

    // ==================== Mutations ====================

    /// Set one value and commit
    ///
    /// The candidate is built from the pre-template document, so `value`
    /// may itself contain placeholders. With `validate: false` only the
    /// subtree at `path` is re-validated.
    pub async fn set<V: Serialize>(
        &self,
        path: &str,
        value: V,
        options: SetOptions,
    ) -> ConfigResult<Arc<Value>> {
        let value = serde_json::to_value(value).map_err(|e| {
            ConfigError::type_error(e.to_string(), "JSON value", std::any::type_name::<V>())
        })?;
        let paths = [path.to_string()];
        let scope = if options.validate {
            Scope::Full
        } else {
            Scope::Paths(&paths)
        };
        self.mutate(
            "set",
            scope,
            |raw| path::set(raw, path, value),
            |sources| sources.insert(path, ChangeSource::Runtime),
        )
        .await
    }

    /// Deep-merge a partial document and commit
    ///
    /// Objects merge key-wise and arrays are replaced. With
    /// `validate: false` only the merged top-level sections are
    /// re-validated.
    pub async fn update(&self, partial: Value, options: UpdateOptions) -> ConfigResult<Arc<Value>> {
        let sections: Vec<String> = match &partial {
            Value::Object(obj) if !options.validate => obj.keys().cloned().collect(),
            _ => Vec::new(),
        };
        let scope = if sections.is_empty() {
            Scope::Full
        } else {
            Scope::Paths(&sections)
        };
        let overlay = partial.clone();
        self.mutate(
            "update",
            scope,
            move |raw| {
                let mut candidate = raw.clone();
                merge_json(&mut candidate, overlay);
                Ok(candidate)
            },
            |sources| sources.record_leaves(&partial, ChangeSource::Runtime),
        )
        .await
    }

    async fn mutate<F, A>(
        &self,
        reason: &'static str,
        scope: Scope<'_>,
        apply: F,
        attribute: A,
    ) -> ConfigResult<Arc<Value>>
    where
        F: FnOnce(&Value) -> ConfigResult<Value>,
        A: FnOnce(&mut SourceMap),
    {
        let guard = self.mutation.lock().await;
        let current = self.snapshot.load_full().ok_or(ConfigError::NotLoaded)?;
        let started = Instant::now();

        let prepared = match apply(&current.raw).and_then(|candidate| self.pipeline.run(&candidate, scope)) {
            Ok(prepared) => prepared,
            Err(e) => {
                folio_log::warn!(operation = reason, error = %e, "Rejected configuration change");
                return Err(e);
            }
        };

        let mut sources = current.sources.clone();
        attribute(&mut sources);
        let (document, notification) = self.commit(prepared, sources, started, reason);
        drop(guard);
        self.dispatch(notification);
        Ok(document)
    }

    fn commit(
        &self,
        prepared: Prepared,
        sources: SourceMap,
        started: Instant,
        reason: &'static str,
    ) -> (Arc<Value>, ChangeNotification) {
        let warnings = prepared.warnings.len() + prepared.template_issues.len();
        let previous = self.snapshot.load_full();
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        let resolved = Arc::new(prepared.resolved);

        // The first snapshot has nothing to diff against
        let events = previous
            .as_ref()
            .map(|prev| diff_with_sources(&prev.resolved, &resolved, &sources))
            .unwrap_or_default();

        self.snapshot.store(Some(Arc::new(Snapshot {
            raw: Arc::new(prepared.raw),
            resolved: Arc::clone(&resolved),
            sources,
            version,
            committed_at: Utc::now(),
        })));
        self.cache.clear();
        *self.last_error.write() = None;
        self.set_state(ManagerState::Loaded);

        folio_log::info!(
            version,
            operation = reason,
            changes = events.len(),
            warnings,
            elapsed = ?started.elapsed(),
            "Committed configuration snapshot"
        );

        let notification = ChangeNotification {
            document: Arc::clone(&resolved),
            events,
            version,
        };
        (resolved, notification)
    }

    fn dispatch(&self, notification: ChangeNotification) {
        let changes = notification.events.len();
        let delivered = self.notifier.notify(notification);
        if changes > 0 {
            folio_log::debug!(changes, delivered, "Delivered configuration changes");
        }
    }

    // ==================== Reads ====================

    /// Value at `path` in the committed document
    ///
    /// `None` when nothing is loaded, the path is malformed, or the value
    /// is absent or `null`.
    pub fn get_value(&self, path: &str) -> Option<Value> {
        let snapshot = self.snapshot.load_full()?;
        if !self.pipeline.options.cache {
            return lookup(&snapshot, path);
        }

        if let Some(entry) = self.cache.get(path)
            && entry.0 == snapshot.version
        {
            return entry.1.clone();
        }
        let value = lookup(&snapshot, path);
        self.cache
            .insert(path.to_string(), (snapshot.version, value.clone()));
        value
    }

    /// Typed value at `path`
    ///
    /// Unlike the other reads this reports why nothing came back:
    /// [`ConfigError::NotLoaded`] when no snapshot exists,
    /// [`ConfigError::InvalidPath`], [`ConfigError::PathNotFound`] or
    /// [`ConfigError::TypeError`].
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        if self.snapshot.load().is_none() {
            return Err(ConfigError::NotLoaded);
        }
        path::parse_path(path)?;
        let value = self
            .get_value(path)
            .ok_or_else(|| ConfigError::path_not_found(path))?;
        let actual = json_type_name(&value);
        serde_json::from_value(value).map_err(|e| {
            ConfigError::type_error(e.to_string(), std::any::type_name::<T>(), actual)
        })
    }

    /// Typed value at `path`, or `default`
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Whether `features.<flag>` is `true` or has `enabled: true`
    pub fn is_feature_enabled(&self, flag: &str) -> bool {
        match self.get_value(&format!("features.{flag}")) {
            Some(Value::Bool(enabled)) => enabled,
            Some(Value::Object(obj)) => obj.get("enabled").and_then(Value::as_bool).unwrap_or(false),
            _ => false,
        }
    }

    /// One top-level section
    pub fn section(&self, name: &str) -> Option<Value> {
        self.get_value(name)
    }

    /// Personal details, when present and well-formed
    pub fn personal(&self) -> Option<PersonalInfo> {
        self.get("personal").ok()
    }

    /// Theme, when present and well-formed
    pub fn theme(&self) -> Option<ThemeConfig> {
        self.get("theme").ok()
    }

    /// SEO metadata, when present and well-formed
    pub fn seo(&self) -> Option<SeoConfig> {
        self.get("seo").ok()
    }

    /// Site settings, when present and well-formed
    pub fn site(&self) -> Option<SiteConfig> {
        self.get("site").ok()
    }

    /// The committed document
    pub fn document(&self) -> Option<Arc<Value>> {
        self.snapshot.load_full().map(|s| Arc::clone(&s.resolved))
    }

    /// The committed snapshot with its metadata
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    /// Whether a snapshot is committed
    pub fn is_loaded(&self) -> bool {
        self.snapshot.load().is_some()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ManagerState {
        ManagerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ManagerState) {
        let previous = ManagerState::from_u8(self.state.swap(state.to_u8(), Ordering::AcqRel));
        if previous != state {
            folio_log::trace!(from = %previous, to = %state, "Manager state changed");
        }
    }

    /// Version of the committed snapshot, 0 when none
    pub fn version(&self) -> u64 {
        self.snapshot.load().as_ref().map_or(0, |s| s.version)
    }

    /// Error from the last failed load or reload, cleared by the next commit
    pub fn last_error(&self) -> Option<ConfigError> {
        self.last_error.read().clone()
    }

    /// Engine options
    pub fn options(&self) -> &ManagerOptions {
        &self.pipeline.options
    }

    // ==================== Templates ====================

    /// Template engine used for commits
    pub fn engine(&self) -> &TemplateEngine {
        &self.pipeline.engine
    }

    /// Lookup context over the committed document
    pub fn template_context(&self) -> TemplateContext {
        let config = self
            .document()
            .unwrap_or_else(|| Arc::new(Value::Object(Map::new())));
        self.pipeline.context.with_config(config)
    }

    /// Resolve an ad-hoc template against the committed document
    pub fn render(&self, template: &str) -> String {
        self.pipeline
            .engine
            .resolve(template, &self.template_context(), self.pipeline.options.pattern)
    }

    /// Lint an ad-hoc template
    pub fn validate_template(&self, template: &str) -> Vec<TemplateIssue> {
        self.pipeline
            .engine
            .validate_template(template, self.pipeline.options.pattern)
    }

    /// Lint and resolve an ad-hoc template against the committed document
    pub fn preview(&self, template: &str) -> TemplatePreview {
        self.pipeline.engine.preview(
            template,
            &self.template_context(),
            self.pipeline.options.pattern,
        )
    }

    // ==================== Subscriptions ====================

    /// Call `callback` after every commit that changes at least one leaf
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    /// Channel of change batches for async consumers
    pub fn changes(&self) -> ChangeReceiver {
        self.notifier.channel()
    }

    /// Number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    // ==================== Hot reload ====================

    /// Reload whenever one of `paths` changes on disk
    ///
    /// Failed reloads are logged and the last good snapshot stays
    /// readable. Stops on [`ConfigManager::shutdown`] or when the manager
    /// is dropped. Must be called inside a Tokio runtime.
    pub fn watch_files(self: &Arc<Self>, paths: &[PathBuf]) -> ConfigResult<()> {
        let watcher = Arc::new(FileWatcher::new());
        let mut events = watcher.start(paths)?;
        let token = self.background.lock().token.child_token();
        let manager = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    () = token.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                folio_log::info!(
                    path = %event.path.display(),
                    kind = ?event.kind,
                    "Configuration file changed; reloading"
                );
                if let Err(e) = manager.reload().await {
                    folio_log::warn!(error = %e, "Hot reload failed; keeping last good snapshot");
                }
            }
            folio_log::debug!("File watch task stopped");
        });

        let mut background = self.background.lock();
        background.watchers.push(watcher);
        background.tasks.push(handle);
        Ok(())
    }

    /// Reload every `interval`
    ///
    /// Missed ticks are skipped. Stops on [`ConfigManager::shutdown`] or
    /// when the manager is dropped. Must be called inside a Tokio runtime.
    pub fn with_auto_reload(self: &Arc<Self>, interval: Duration) {
        let interval = interval.max(Duration::from_millis(1));
        let token = self.background.lock().token.child_token();
        let manager = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            timer.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = timer.tick() => {}
                }
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if let Err(e) = manager.reload().await {
                    folio_log::error!(error = %e, "Auto-reload failed");
                }
            }
            folio_log::debug!("Auto-reload task stopped");
        });

        self.background.lock().tasks.push(handle);
    }
}

fn lookup(snapshot: &Snapshot, path: &str) -> Option<Value> {
    path::get(&snapshot.resolved, path)
        .filter(|value| !value.is_null())
        .cloned()
}

impl Drop for ConfigManager {
    fn drop(&mut self) {
        self.background.get_mut().token.cancel();
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("provider", &self.provider.describe())
            .field("state", &self.state())
            .field("version", &self.version())
            .field("has_schema", &self.pipeline.validator.is_some())
            .field("options", &self.pipeline.options)
            .field("subscribers", &self.notifier.subscriber_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::StaticProvider;
    use crate::portfolio;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn site() -> Value {
        json!({
            "personal": { "name": "Jane", "email": "jane@example.com" },
            "skills": { "items": [{ "name": "AutoCAD" }, { "name": "Rhino" }] }
        })
    }

    fn manager(document: Value) -> ConfigManager {
        ConfigManager::builder()
            .document(document)
            .schema(portfolio::schema())
            .env_vars([("DEPLOY_ENV", "test")])
            .runtime_fact("year", 2024)
            .custom_value("currentYear", 2024)
            .build()
    }

    #[tokio::test]
    async fn test_reads_before_initialize() {
        let manager = manager(site());
        assert_eq!(manager.state(), ManagerState::Uninitialized);
        assert!(matches!(manager.get::<String>("personal.name"), Err(ConfigError::NotLoaded)));
        assert_eq!(manager.get_or("personal.name", "anon".to_string()), "anon");
        assert!(manager.get_value("personal").is_none());
        assert!(!manager.is_feature_enabled("contact_form"));
        assert_eq!(manager.version(), 0);
    }

    #[tokio::test]
    async fn test_initialize_resolves_templates() {
        let manager = manager(site());
        let doc = manager.initialize().await.unwrap();
        assert_eq!(manager.state(), ManagerState::Loaded);
        assert_eq!(doc["site"]["title"], json!("Jane | Portfolio"));
        assert_eq!(doc["site"]["footer"], json!("© 2024 Jane"));
        assert_eq!(manager.get::<String>("seo.title").unwrap(), "Jane | Portfolio");
        assert_eq!(manager.version(), 1);
        assert!(manager.is_feature_enabled("contact_form"));
        assert!(!manager.is_feature_enabled("blog"));
        assert_eq!(manager.personal().unwrap().name, "Jane");
        assert_eq!(manager.theme().unwrap().radius, 8);
        assert_eq!(manager.site().unwrap().language, "en");
        assert!(manager.seo().unwrap().keywords.is_empty());
        assert_eq!(manager.render("Built in {{currentYear}}"), "Built in 2024");
        assert_eq!(manager.render("{{env.DEPLOY_ENV}}"), "test");
    }

    #[tokio::test]
    async fn test_get_reports_typed_errors() {
        let manager = manager(site());
        manager.initialize().await.unwrap();
        assert!(matches!(
            manager.get::<String>("personal.phone"),
            Err(ConfigError::PathNotFound { .. })
        ));
        assert!(matches!(
            manager.get::<u32>("personal.name"),
            Err(ConfigError::TypeError { .. })
        ));
        assert!(matches!(
            manager.get::<String>("personal..name"),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_sparse_fills_and_notifies() {
        let manager = manager(site());
        manager.initialize().await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let seen = Arc::clone(&seen);
            manager.on_change(move |n| {
                seen.lock()
                    .extend(n.events.iter().map(|e| (e.path.clone(), e.source)));
            })
        };

        let doc = manager
            .set("skills.items[5].name", "Revit", SetOptions::default())
            .await
            .unwrap();
        let items = doc["skills"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(items[5], json!({ "name": "Revit" }));
        assert_eq!(items[3], Value::Null);
        assert_eq!(items[0]["level"], json!(3));

        let seen = seen.lock();
        assert!(seen.contains(&("skills.items[5].name".to_string(), ChangeSource::Runtime)));
        assert!(seen.contains(&("skills.items[2]".to_string(), ChangeSource::Default)));
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_value_and_keeps_snapshot() {
        let manager = manager(site());
        manager.initialize().await.unwrap();

        let err = manager
            .set("personal.email", "not-an-email", SetOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.validation_errors().len(), 1);
        assert_eq!(err.validation_errors()[0].path, "personal.email");
        assert_eq!(manager.get::<String>("personal.email").unwrap(), "jane@example.com");
        assert_eq!(manager.version(), 1);
        assert_eq!(manager.state(), ManagerState::Loaded);
    }

    #[tokio::test]
    async fn test_set_retemplates_dependents() {
        let manager = manager(site());
        manager.initialize().await.unwrap();
        manager
            .set("personal.name", "Jane Doe", SetOptions::validated())
            .await
            .unwrap();
        assert_eq!(manager.get::<String>("seo.title").unwrap(), "Jane Doe | Portfolio");
        assert_eq!(manager.get::<String>("site.footer").unwrap(), "© 2024 Jane Doe");
    }

    #[tokio::test]
    async fn test_update_merges_partial_document() {
        let manager = manager(site());
        manager.initialize().await.unwrap();
        manager
            .update(
                json!({ "theme": { "mode": "dark" }, "features": { "blog": true } }),
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(manager.theme().unwrap().mode, portfolio::ThemeMode::Dark);
        assert_eq!(manager.get::<String>("theme.primary_color").unwrap(), "#1f2937");
        assert!(manager.is_feature_enabled("blog"));
        assert_eq!(
            manager.snapshot().unwrap().sources().lookup("theme.mode"),
            ChangeSource::Runtime
        );
    }

    #[tokio::test]
    async fn test_mutations_require_snapshot() {
        let manager = manager(site());
        let err = manager
            .set("personal.name", "x", SetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotLoaded));
    }

    #[tokio::test]
    async fn test_failed_initialize_is_errored_without_snapshot() {
        let manager = manager(json!({ "personal": { "name": "Jane", "email": "nope" } }));
        let err = manager.initialize().await.unwrap_err();
        assert!(matches!(err, ConfigError::SchemaViolation { .. }));
        assert_eq!(manager.state(), ManagerState::Errored);
        assert!(manager.last_error().is_some());
        assert!(matches!(manager.get::<String>("personal.name"), Err(ConfigError::NotLoaded)));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_last_good_snapshot() {
        let provider = Arc::new(StaticProvider::defaults(site()));
        let manager = ConfigManager::builder()
            .shared_provider(provider.clone())
            .schema(portfolio::schema())
            .build();
        manager.initialize().await.unwrap();

        provider.replace(json!({ "personal": { "name": "Jane" } }));
        assert!(manager.reload().await.is_err());
        assert_eq!(manager.state(), ManagerState::Errored);
        assert_eq!(manager.get::<String>("personal.name").unwrap(), "Jane");

        provider.replace(json!({ "personal": { "name": "Janet", "email": "janet@example.com" } }));
        manager.reload().await.unwrap();
        assert_eq!(manager.state(), ManagerState::Loaded);
        assert!(manager.last_error().is_none());
        assert_eq!(manager.get::<String>("personal.name").unwrap(), "Janet");
    }

    #[tokio::test]
    async fn test_cache_is_invalidated_on_commit() {
        let manager = manager(site());
        manager.initialize().await.unwrap();
        assert_eq!(manager.get_value("personal.name"), Some(json!("Jane")));
        manager
            .set("personal.name", "Ada", SetOptions::default())
            .await
            .unwrap();
        assert_eq!(manager.get_value("personal.name"), Some(json!("Ada")));
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let manager = manager(site());
        manager.initialize().await.unwrap();
        let _sub = manager.on_change(|_| {});
        manager.shutdown().await;
        assert_eq!(manager.subscriber_count(), 0);
        assert!(!manager.is_loaded());
        assert_eq!(manager.state(), ManagerState::Uninitialized);
        assert!(matches!(manager.get::<String>("personal.name"), Err(ConfigError::NotLoaded)));
    }
}
