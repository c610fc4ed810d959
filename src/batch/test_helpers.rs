//! Shared test helpers: scripted backends and test BatchDownloader instances.

use crate::batch::{Backends, BatchDownloader};
use crate::config::Config;
use crate::engine::{
    FetchEngine, FetchOutput, FetchProgress, FetchRequest, ProgressCallback, ProgressControl,
};
use crate::error::{EngineError, Error, Result};
use crate::metadata::{CollectionEntry, CollectionListing, CollectionResolver, TitleResolver};
use crate::types::{Event, FetchVariant, JobReference, UNKNOWN_TITLE};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Behaviour of the scripted engine for one source
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Report 0/50/100 percent, then succeed
    Succeed,
    /// Report 0 percent, then fail with the message
    Fail(String),
    /// Keep reporting progress until the callback asks to abort
    Stall,
    /// Sleep without reporting progress, then succeed
    SlowSucceed(Duration),
    /// Return `Aborted` although the callback never asked to stop
    Abort,
    /// Panic in the middle of the fetch
    Panic,
}

type FetchHook = Box<dyn Fn(&FetchRequest) + Send + Sync>;

/// Fetch engine driven by per-source scripts; records every call
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, FetchVariant)>>,
    hook: Mutex<Option<FetchHook>>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Set the script for `source` (default: [`Script::Succeed`])
    pub(crate) fn script(&self, source: &str, script: Script) {
        self.scripts.lock().unwrap().insert(source.to_string(), script);
    }

    /// Run `hook` at the end of every fetch, before the result is returned
    pub(crate) fn on_fetch(&self, hook: impl Fn(&FetchRequest) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Every (source, variant) the engine was asked to fetch, in order
    pub(crate) fn calls(&self) -> Vec<(String, FetchVariant)> {
        self.calls.lock().unwrap().clone()
    }

    /// Sources fetched, in order, one entry per sub-operation
    pub(crate) fn fetched_sources(&self) -> Vec<String> {
        self.calls().into_iter().map(|(source, _)| source).collect()
    }

    fn run_hook(&self, request: &FetchRequest) {
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(request);
        }
    }
}

fn progress(percent: f32) -> FetchProgress {
    FetchProgress {
        percent,
        eta_secs: None,
    }
}

#[async_trait]
impl FetchEngine for ScriptedEngine {
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: &ProgressCallback<'_>,
    ) -> std::result::Result<FetchOutput, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.source.clone(), request.variant));
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&request.source)
            .cloned()
            .unwrap_or(Script::Succeed);

        let result = match script {
            Script::Succeed => {
                let mut result = Ok(FetchOutput {
                    files: vec![request.destination_dir.join(format!(
                        "{}.{}",
                        request.title,
                        request.variant.extension()
                    ))],
                });
                for percent in [0.0, 50.0, 100.0] {
                    if on_progress(progress(percent)) == ProgressControl::Abort {
                        result = Err(EngineError::Aborted);
                        break;
                    }
                }
                result
            }
            Script::Fail(message) => match on_progress(progress(0.0)) {
                ProgressControl::Abort => Err(EngineError::Aborted),
                ProgressControl::Continue => Err(EngineError::Failed(message)),
            },
            Script::Stall => {
                let mut percent = 0.0;
                loop {
                    if on_progress(progress(percent)) == ProgressControl::Abort {
                        break Err(EngineError::Aborted);
                    }
                    percent = (percent + 1.0_f32).min(99.0);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
            Script::SlowSucceed(delay) => {
                tokio::time::sleep(delay).await;
                Ok(FetchOutput::default())
            }
            Script::Abort => Err(EngineError::Aborted),
            Script::Panic => {
                on_progress(progress(10.0));
                panic!("engine exploded on {}", request.source);
            }
        };

        self.run_hook(request);
        result
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Title resolver answering from a fixed map
#[derive(Default)]
pub(crate) struct StaticTitles {
    titles: HashMap<String, String>,
    delay: Option<Duration>,
}

impl StaticTitles {
    pub(crate) fn new(titles: &[(&str, &str)]) -> Self {
        Self {
            titles: titles
                .iter()
                .map(|(source, title)| (source.to_string(), title.to_string()))
                .collect(),
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl TitleResolver for StaticTitles {
    async fn resolve_title(&self, source: &str) -> String {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.titles
            .get(source)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }
}

/// Collection resolver answering from a fixed map
#[derive(Default)]
pub(crate) struct StaticCollections {
    listings: Mutex<HashMap<String, CollectionListing>>,
}

impl StaticCollections {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn insert(&self, source: &str, listing: CollectionListing) {
        self.listings
            .lock()
            .unwrap()
            .insert(source.to_string(), listing);
    }
}

#[async_trait]
impl CollectionResolver for StaticCollections {
    async fn list(&self, source: &str) -> Result<CollectionListing> {
        self.listings
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .ok_or_else(|| Error::ExternalTool(format!("no listing for {source}")))
    }
}

/// Test downloader plus handles to its scripted backends
pub(crate) struct TestHarness {
    pub(crate) downloader: BatchDownloader,
    pub(crate) engine: Arc<ScriptedEngine>,
    pub(crate) collections: Arc<StaticCollections>,
    pub(crate) temp_dir: tempfile::TempDir,
}

/// Create a test BatchDownloader writing into a temp dir
pub(crate) fn create_test_harness() -> TestHarness {
    create_test_harness_with(StaticTitles::default())
}

/// Create a test BatchDownloader with the given title resolver
pub(crate) fn create_test_harness_with(titles: StaticTitles) -> TestHarness {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.destination_dir = temp_dir.path().join("downloads");
    config.events.shutdown_timeout = Duration::from_secs(5);

    let engine = ScriptedEngine::new();
    let collections = StaticCollections::new();
    let backends = Backends {
        engine: engine.clone(),
        titles: Arc::new(titles),
        collections: collections.clone(),
    };

    let downloader = BatchDownloader::with_backends(config, backends).unwrap();

    TestHarness {
        downloader,
        engine,
        collections,
        temp_dir,
    }
}

/// Item with a youtu.be locator and a known title
pub(crate) fn item(id: &str) -> JobReference {
    JobReference::new(format!("https://youtu.be/{id}"), id.to_uppercase())
}

/// Locator of [`item`]
pub(crate) fn source(id: &str) -> String {
    format!("https://youtu.be/{id}")
}

/// Listing entry with an id and title
pub(crate) fn entry(id: &str, title: &str) -> Option<CollectionEntry> {
    Some(CollectionEntry {
        id: id.to_string(),
        title: Some(title.to_string()),
        duration: Some(180),
    })
}

/// Receive events until `RunFinished` (inclusive)
pub(crate) async fn events_until_run_finished(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for RunFinished")
            .expect("event channel closed");
        let done = matches!(event, Event::RunFinished { .. });
        events.push(event);
        if done {
            return events;
        }
    }
}
