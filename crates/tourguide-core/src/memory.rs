//! In-memory collaborators.
//!
//! Used by tests and by the CLI to run the orchestrator against a page
//! snapshot without a browser, a backend or an analytics pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use tourguide_protocols::{
    FeatureFlags, KeyValueStore, Properties, RenderRequest, SourceError, StepActions, StoreError,
    Telemetry, Tour, TourRenderer, TourSource,
};

/// Key-value store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, value: Value) -> Self {
        self.values.write().insert(key.into(), value);
        self
    }

    /// Make every write fail, as a full or unavailable backend would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub fn entries(&self) -> HashMap<String, Value> {
        self.values.read().clone()
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::QuotaExceeded(key.to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.values.write().remove(key);
        Ok(())
    }
}

/// Fixed feature flag values.
#[derive(Default)]
pub struct StaticFlags {
    flags: RwLock<HashMap<String, bool>>,
}

impl StaticFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, enabled: bool) -> Self {
        self.set(key, enabled);
        self
    }

    pub fn set(&self, key: impl Into<String>, enabled: bool) {
        self.flags.write().insert(key.into(), enabled);
    }
}

impl FeatureFlags for StaticFlags {
    fn get_flag(&self, key: &str) -> Option<bool> {
        self.flags.read().get(key).copied()
    }
}

/// Tour source serving a replaceable list.
#[derive(Default)]
pub struct StaticTourSource {
    tours: RwLock<Vec<Tour>>,
    failure: RwLock<Option<String>>,
    fetches: AtomicUsize,
}

impl StaticTourSource {
    pub fn new(tours: Vec<Tour>) -> Self {
        Self {
            tours: RwLock::new(tours),
            ..Self::default()
        }
    }

    pub fn set(&self, tours: Vec<Tour>) {
        *self.tours.write() = tours;
    }

    /// Fail every fetch with `message` until cleared with `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.write() = message.map(str::to_string);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TourSource for StaticTourSource {
    async fn tours(&self) -> Result<Vec<Tour>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.read().clone() {
            return Err(SourceError::Unavailable(message));
        }
        Ok(self.tours.read().clone())
    }
}

/// Telemetry sink that keeps every event.
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<(String, Properties)>>,
    person: Mutex<Vec<Properties>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Properties)> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Properties of every event named `name`, oldest first.
    pub fn named(&self, name: &str) -> Vec<Properties> {
        self.events
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, props)| props.clone())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|(n, _)| n == name).count()
    }

    pub fn last(&self) -> Option<(String, Properties)> {
        self.events.lock().last().cloned()
    }

    pub fn person_properties(&self) -> Vec<Properties> {
        self.person.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
        self.person.lock().clear();
    }
}

impl Telemetry for RecordingTelemetry {
    fn capture(&self, event: &str, properties: Properties) {
        self.events.lock().push((event.to_string(), properties));
    }

    fn set_person_properties(&self, properties: Properties) {
        self.person.lock().push(properties);
    }
}

/// Renderer that records requests and keeps the latest step actions.
#[derive(Default)]
pub struct RecordingRenderer {
    renders: Mutex<Vec<RenderRequest>>,
    actions: Mutex<Option<Arc<dyn StepActions>>>,
    unmounted: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn renders(&self) -> Vec<RenderRequest> {
        self.renders.lock().clone()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    pub fn last(&self) -> Option<RenderRequest> {
        self.renders.lock().last().cloned()
    }

    /// Actions handed over with the most recent render.
    pub fn actions(&self) -> Option<Arc<dyn StepActions>> {
        self.actions.lock().clone()
    }

    pub fn unmounted(&self) -> Vec<String> {
        self.unmounted.lock().clone()
    }
}

impl TourRenderer for RecordingRenderer {
    fn render(&self, request: RenderRequest, actions: Arc<dyn StepActions>) {
        self.renders.lock().push(request);
        *self.actions.lock() = Some(actions);
    }

    fn unmount(&self, tour_id: &str) {
        self.unmounted.lock().push(tour_id.to_string());
    }
}
