//! End-to-end manager behaviour: lifecycle, mutations, notifications

use async_trait::async_trait;
use folio_config::portfolio;
use folio_config::prelude::*;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Provider with a controllable delay and failure switch
struct ScriptedProvider {
    document: Mutex<Value>,
    delay: Mutex<Option<Duration>>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl ScriptedProvider {
    fn new(document: Value) -> Arc<Self> {
        Arc::new(Self {
            document: Mutex::new(document),
            delay: Mutex::new(None),
            failing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ConfigProvider for ScriptedProvider {
    async fn fetch(&self) -> ConfigResult<SourcedDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ConfigError::source_unavailable("scripted", "offline"));
        }
        Ok(SourcedDocument::uniform(
            self.document.lock().clone(),
            ChangeSource::File,
        ))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn jane() -> Value {
    json!({
        "personal": { "name": "Jane", "title": "Architect", "email": "jane@example.com" },
        "skills": { "items": [{ "name": "AutoCAD" }, { "name": "Rhino" }] }
    })
}

fn manager_over(provider: &Arc<ScriptedProvider>) -> Arc<ConfigManager> {
    Arc::new(
        ConfigManager::builder()
            .shared_provider(provider.clone())
            .schema(portfolio::schema())
            .env_vars([("DEPLOY_ENV", "staging")])
            .runtime_fact("year", 2024)
            .custom_value("currentYear", 2024)
            .build(),
    )
}

// ---------------------------------------------------------------------------
// Documented scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_email_fails_initialize_with_one_error() {
    let provider = ScriptedProvider::new(json!({
        "personal": { "name": "Jane", "email": "not-an-email" }
    }));
    let manager = manager_over(&provider);

    let err = manager.initialize().await.unwrap_err();
    let errors = err.validation_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, "personal.email");
    assert_eq!(errors[0].message, "must be a valid email address");

    assert_eq!(manager.state(), ManagerState::Errored);
    assert!(manager.document().is_none());
    assert!(manager.last_error().is_some());
}

#[tokio::test]
async fn custom_namespace_and_pipelines_render() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();

    assert_eq!(manager.render("Built in {{currentYear}}"), "Built in 2024");
    assert_eq!(manager.render("{{personal.name|uppercase}}"), "JANE");
    assert_eq!(manager.render("{{env.DEPLOY_ENV}}/{{missing}}"), "staging/");
}

#[tokio::test]
async fn out_of_range_index_materializes_sparse_sequence() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();

    manager
        .set("skills.items[5].name", "Revit", SetOptions::default())
        .await
        .unwrap();

    let items: Vec<Value> = manager.get("skills.items").unwrap();
    assert_eq!(items.len(), 6);
    assert_eq!(items[2], Value::Null);
    assert_eq!(manager.get::<String>("skills.items[5].name").unwrap(), "Revit");
    assert!(manager.get_value("skills.items[3]").is_none());
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reload_cycle_and_graceful_degradation() {
    let provider = ScriptedProvider::new(jane());
    let manager = manager_over(&provider);
    assert_eq!(manager.state(), ManagerState::Uninitialized);

    manager.initialize().await.unwrap();
    assert_eq!(manager.state(), ManagerState::Loaded);
    assert_eq!(manager.version(), 1);

    provider.document.lock()["personal"]["title"] = json!("Urbanist");
    manager.reload().await.unwrap();
    assert_eq!(manager.state(), ManagerState::Loaded);
    assert_eq!(manager.version(), 2);
    assert_eq!(manager.get::<String>("personal.title").unwrap(), "Urbanist");

    // Source failure keeps the last good snapshot
    provider.failing.store(true, Ordering::SeqCst);
    let err = manager.reload().await.unwrap_err();
    assert!(matches!(err, ConfigError::SourceUnavailable { .. }));
    assert_eq!(manager.state(), ManagerState::Errored);
    assert_eq!(manager.get::<String>("personal.title").unwrap(), "Urbanist");
    assert_eq!(manager.version(), 2);

    // Schema failure does too
    provider.failing.store(false, Ordering::SeqCst);
    provider.document.lock()["theme"] = json!({ "radius": 400 });
    let err = manager.reload().await.unwrap_err();
    assert_eq!(err.validation_errors()[0].path, "theme.radius");
    assert_eq!(manager.get::<u8>("theme.radius").unwrap(), 8);

    provider.document.lock()["theme"] = json!({ "radius": 12 });
    manager.reload().await.unwrap();
    assert_eq!(manager.state(), ManagerState::Loaded);
    assert_eq!(manager.get::<u8>("theme.radius").unwrap(), 12);
    assert!(manager.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn reload_timeout_keeps_previous_snapshot() {
    let provider = ScriptedProvider::new(jane());
    let manager = manager_over(&provider);
    manager.initialize().await.unwrap();

    *provider.delay.lock() = Some(Duration::from_secs(30));
    provider.document.lock()["personal"]["name"] = json!("Slow Jane");

    let err = manager
        .reload_with_timeout(Duration::from_millis(250))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::ReloadTimeout { .. }));
    assert_eq!(manager.state(), ManagerState::Loaded);
    assert_eq!(manager.version(), 1);
    assert_eq!(manager.get::<String>("personal.name").unwrap(), "Jane");

    // The mutation lock was released with the abandoned run
    *provider.delay.lock() = None;
    manager.reload().await.unwrap();
    assert_eq!(manager.get::<String>("personal.name").unwrap(), "Slow Jane");
}

#[tokio::test(start_paused = true)]
async fn reload_timeout_behind_another_reload_settles_loaded() {
    let provider = ScriptedProvider::new(jane());
    let manager = manager_over(&provider);
    manager.initialize().await.unwrap();

    *provider.delay.lock() = Some(Duration::from_millis(50));
    provider.document.lock()["personal"]["name"] = json!("Janet");
    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.reload().await })
    };
    while manager.state() != ManagerState::Reloading {
        tokio::task::yield_now().await;
    }

    // The queued reload waits out the first one, then stalls in fetch
    *provider.delay.lock() = Some(Duration::from_secs(3600));
    let err = manager
        .reload_with_timeout(Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::ReloadTimeout { .. }));

    first.await.unwrap().unwrap();
    assert_eq!(manager.state(), ManagerState::Loaded);
    assert_eq!(manager.version(), 2);
    assert_eq!(manager.get::<String>("personal.name").unwrap(), "Janet");
}

#[tokio::test(start_paused = true)]
async fn reload_timeout_waiting_for_the_lock_leaves_state_alone() {
    let provider = ScriptedProvider::new(jane());
    let manager = manager_over(&provider);
    manager.initialize().await.unwrap();

    *provider.delay.lock() = Some(Duration::from_millis(500));
    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.reload().await })
    };
    while manager.state() != ManagerState::Reloading {
        tokio::task::yield_now().await;
    }

    let err = manager
        .reload_with_timeout(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::ReloadTimeout { .. }));
    assert_eq!(manager.state(), ManagerState::Reloading);

    first.await.unwrap().unwrap();
    assert_eq!(manager.state(), ManagerState::Loaded);
}

#[tokio::test(start_paused = true)]
async fn configured_reload_timeout_applies_to_reload() {
    let provider = ScriptedProvider::new(jane());
    let manager = Arc::new(
        ConfigManager::builder()
            .shared_provider(provider.clone())
            .schema(portfolio::schema())
            .reload_timeout(Duration::from_secs(1))
            .build(),
    );
    manager.initialize().await.unwrap();

    *provider.delay.lock() = Some(Duration::from_secs(5));
    assert!(matches!(
        manager.reload().await,
        Err(ConfigError::ReloadTimeout { .. })
    ));
    assert!(manager.is_loaded());
}

#[tokio::test]
async fn shutdown_releases_everything_and_allows_restart() {
    let provider = ScriptedProvider::new(jane());
    let manager = manager_over(&provider);
    manager.initialize().await.unwrap();
    let _sub = manager.on_change(|_| {});
    assert_eq!(manager.subscriber_count(), 1);

    manager.shutdown().await;
    assert_eq!(manager.state(), ManagerState::Uninitialized);
    assert_eq!(manager.subscriber_count(), 0);
    assert!(matches!(
        manager.get::<String>("personal.name"),
        Err(ConfigError::NotLoaded)
    ));

    manager.initialize().await.unwrap();
    assert_eq!(manager.get::<String>("personal.name").unwrap(), "Jane");
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initial_commit_is_silent_and_reload_reports_sources() {
    let provider = ScriptedProvider::new(jane());
    let manager = manager_over(&provider);
    let seen: Arc<Mutex<Vec<ChangeEvent>>> = Arc::default();
    let sink = seen.clone();
    let _sub = manager.on_change(move |batch| sink.lock().extend(batch.events.iter().cloned()));

    manager.initialize().await.unwrap();
    assert!(seen.lock().is_empty());

    provider.document.lock()["personal"]["name"] = json!("Janet");
    manager.reload().await.unwrap();

    let paths: Vec<String> = seen.lock().iter().map(|e| e.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            "personal.name",
            "seo.description",
            "seo.title",
            "site.footer",
            "site.title"
        ]
    );
    let events = seen.lock();
    let name = &events[0];
    assert_eq!(name.old_value, Some(json!("Jane")));
    assert_eq!(name.new_value, Some(json!("Janet")));
    assert_eq!(name.source, ChangeSource::File);
}

#[tokio::test]
async fn panicking_subscriber_does_not_starve_others() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let _bad = manager.on_change(|_| panic!("subscriber bug"));
    let counter = calls.clone();
    let _good = manager.on_change(move |batch| {
        assert!(batch.touches("theme"));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    manager
        .set("theme.mode", "dark", SetOptions::default())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.get::<String>("theme.mode").unwrap(), "dark");
}

#[tokio::test]
async fn dropped_subscription_stops_delivery() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let sub = manager.on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    manager.set("theme.radius", 4, SetOptions::default()).await.unwrap();
    sub.unsubscribe();
    manager.set("theme.radius", 6, SetOptions::default()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.subscriber_count(), 0);
}

#[tokio::test]
async fn channel_receives_each_commit_in_order() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();
    let mut changes = manager.changes();

    manager.set("theme.radius", 4, SetOptions::default()).await.unwrap();
    manager
        .update(
            json!({ "seo": { "keywords": ["bim", "parametric"] } }),
            UpdateOptions::default(),
        )
        .await
        .unwrap();

    let first = changes.recv().await.unwrap();
    assert_eq!(first.version, 2);
    assert_eq!(first.events[0].path, "theme.radius");
    assert_eq!(first.events[0].source, ChangeSource::Runtime);

    let second = changes.recv().await.unwrap();
    assert_eq!(second.version, 3);
    assert!(second.touches("seo.keywords"));
}

#[tokio::test]
async fn no_op_set_notifies_nobody() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let _sub = manager.on_change(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    manager
        .set("personal.name", "Jane", SetOptions::default())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sets_are_all_committed() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .set(&format!("features.experiment_{i}"), true, SetOptions::default())
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(manager.version(), 17);
    for i in 0..16 {
        assert!(manager.is_feature_enabled(&format!("experiment_{i}")));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_always_see_whole_snapshots() {
    let manager = manager_over(&ScriptedProvider::new(jane()));
    manager.initialize().await.unwrap();

    let writer = {
        let manager = manager.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                manager
                    .update(
                        json!({ "personal": { "name": format!("Jane {i}") } }),
                        UpdateOptions::default(),
                    )
                    .await
                    .unwrap();
            }
        })
    };

    // site.title is derived from personal.name in the same commit
    for _ in 0..200 {
        let doc = manager.document().unwrap();
        let name = doc["personal"]["name"].as_str().unwrap();
        assert_eq!(doc["site"]["title"], json!(format!("{name} | Portfolio")));
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    assert_eq!(manager.get::<String>("personal.name").unwrap(), "Jane 49");
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[tokio::test]
async fn permissive_mode_commits_invalid_documents() {
    let manager = ConfigManager::builder()
        .document(json!({ "personal": { "name": "Jane", "email": "nope" } }))
        .schema(portfolio::schema())
        .permissive(true)
        .load()
        .await
        .unwrap();

    assert_eq!(manager.state(), ManagerState::Loaded);
    assert_eq!(manager.get::<String>("personal.email").unwrap(), "nope");
    assert_eq!(manager.get::<String>("site.title").unwrap(), "Jane | Portfolio");
}

#[tokio::test]
async fn dollar_pattern_leaves_mustache_alone() {
    let manager = ConfigManager::builder()
        .document(json!({
            "name": "Jane",
            "greeting": "Hi ${name}",
            "literal": "{{name}}"
        }))
        .pattern(PatternKind::Dollar)
        .load()
        .await
        .unwrap();

    assert_eq!(manager.get::<String>("greeting").unwrap(), "Hi Jane");
    assert_eq!(manager.get::<String>("literal").unwrap(), "{{name}}");
}

#[tokio::test]
async fn custom_functions_are_available_to_documents() {
    let manager = ConfigManager::builder()
        .document(json!({ "personal": { "name": "Jane", "email": "jane@example.com" },
                          "site": { "title": "{{personal.name|shout}}" } }))
        .schema(portfolio::schema())
        .function("shout", |input, _| Ok(format!("{}!", input.to_uppercase())))
        .load()
        .await
        .unwrap();

    assert_eq!(manager.get::<String>("site.title").unwrap(), "JANE!");
}
