//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard as StdMutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::service::{
    BatchPredictRequest, DeploymentState, LocationName, Model, ModelName, ModelService,
    ObjectStore, ServiceFuture, StorageEntry,
};

/// Failures injected by the scripted doubles.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptedError {
    /// Injected `get_model` failure.
    #[error("get model failure")]
    Get,
    /// Injected `deploy_model` failure.
    #[error("deploy failure")]
    Deploy,
    /// Injected `list_models` failure.
    #[error("list models failure")]
    ListModels,
    /// Injected `batch_predict` failure.
    #[error("batch predict failure")]
    Predict,
    /// Injected storage listing failure.
    #[error("list failure for prefix {0}")]
    List(String),
    /// Injected storage delete failure.
    #[error("delete failure for {0}")]
    Delete(String),
}

fn lock<T>(mutex: &Mutex<T>) -> StdMutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds a model snapshot for `name` in the given state.
#[must_use]
pub fn model_snapshot(name: &ModelName, state: DeploymentState) -> Model {
    Model {
        name: name.to_string(),
        display_name: format!("{}-display", name.model_id),
        dataset_id: String::from("TEN0000000000000000000"),
        create_time: Some(String::from("2020-01-01T00:00:00Z")),
        deployment_state: state,
        text_extraction_metadata: None,
    }
}

/// Scripted model service that records calls and mutates a single model.
///
/// `get_model` returns queued states first and falls back to the current
/// state; a successful deploy moves the current state to deployed. A batch
/// prediction writes the configured result objects into the attached store.
#[derive(Clone, Debug, Default)]
pub struct ScriptedModelService {
    state: Arc<Mutex<ModelServiceState>>,
}

#[derive(Debug)]
struct ModelServiceState {
    current: DeploymentState,
    queued: VecDeque<DeploymentState>,
    models: Vec<Model>,
    result_objects: Vec<String>,
    store: Option<InMemoryObjectStore>,
    fail_on_get: bool,
    fail_on_deploy: bool,
    fail_on_list: bool,
    fail_on_predict: bool,
    get_calls: u32,
    deploy_calls: u32,
    predict_calls: u32,
    last_request: Option<BatchPredictRequest>,
}

impl Default for ModelServiceState {
    fn default() -> Self {
        Self {
            current: DeploymentState::Undeployed,
            queued: VecDeque::new(),
            models: Vec::new(),
            result_objects: Vec::new(),
            store: None,
            fail_on_get: false,
            fail_on_deploy: false,
            fail_on_list: false,
            fail_on_predict: false,
            get_calls: 0,
            deploy_calls: 0,
            predict_calls: 0,
            last_request: None,
        }
    }
}

impl ScriptedModelService {
    /// Creates a service whose model starts in `state`.
    #[must_use]
    pub fn with_state(state: DeploymentState) -> Self {
        let service = Self::default();
        lock(&service.state).current = state;
        service
    }

    /// Queues a state returned by the next `get_model` call.
    pub fn push_state(&self, state: DeploymentState) {
        lock(&self.state).queued.push_back(state);
    }

    /// Sets the models returned by `list_models`.
    pub fn set_models(&self, models: Vec<Model>) {
        lock(&self.state).models = models;
    }

    /// Writes `names` (relative to the output prefix) into `store` on each
    /// batch prediction.
    pub fn write_results_to(&self, store: InMemoryObjectStore, names: &[&str]) {
        let mut state = lock(&self.state);
        state.store = Some(store);
        state.result_objects = names.iter().map(|name| (*name).to_owned()).collect();
    }

    /// Makes `get_model` fail.
    pub fn fail_on_get(&self) {
        lock(&self.state).fail_on_get = true;
    }

    /// Makes `deploy_model` fail.
    pub fn fail_on_deploy(&self) {
        lock(&self.state).fail_on_deploy = true;
    }

    /// Makes `list_models` fail.
    pub fn fail_on_list(&self) {
        lock(&self.state).fail_on_list = true;
    }

    /// Makes `batch_predict` fail.
    pub fn fail_on_predict(&self) {
        lock(&self.state).fail_on_predict = true;
    }

    /// Number of `get_model` calls so far.
    #[must_use]
    pub fn get_calls(&self) -> u32 {
        lock(&self.state).get_calls
    }

    /// Number of `deploy_model` calls so far.
    #[must_use]
    pub fn deploy_calls(&self) -> u32 {
        lock(&self.state).deploy_calls
    }

    /// Number of `batch_predict` calls so far.
    #[must_use]
    pub fn predict_calls(&self) -> u32 {
        lock(&self.state).predict_calls
    }

    /// The last batch prediction request received.
    #[must_use]
    pub fn last_request(&self) -> Option<BatchPredictRequest> {
        lock(&self.state).last_request.clone()
    }
}

impl ModelService for ScriptedModelService {
    type Error = ScriptedError;

    fn get_model<'a>(&'a self, name: &'a ModelName) -> ServiceFuture<'a, Model, Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.get_calls += 1;
            if state.fail_on_get {
                return Err(ScriptedError::Get);
            }
            let current = state.current;
            let observed = state.queued.pop_front().unwrap_or(current);
            Ok(model_snapshot(name, observed))
        })
    }

    fn deploy_model<'a>(&'a self, _name: &'a ModelName) -> ServiceFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.deploy_calls += 1;
            if state.fail_on_deploy {
                return Err(ScriptedError::Deploy);
            }
            state.current = DeploymentState::Deployed;
            Ok(())
        })
    }

    fn list_models<'a>(
        &'a self,
        _location: &'a LocationName,
        filter: &'a str,
    ) -> ServiceFuture<'a, Vec<Model>, Self::Error> {
        Box::pin(async move {
            let state = lock(&self.state);
            if state.fail_on_list {
                return Err(ScriptedError::ListModels);
            }
            Ok(state
                .models
                .iter()
                .filter(|model| filter.is_empty() || model.display_name.contains(filter))
                .cloned()
                .collect())
        })
    }

    fn batch_predict<'a>(
        &'a self,
        _name: &'a ModelName,
        request: &'a BatchPredictRequest,
    ) -> ServiceFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.predict_calls += 1;
            state.last_request = Some(request.clone());
            if state.fail_on_predict {
                return Err(ScriptedError::Predict);
            }
            if let Some(store) = state.store.as_ref() {
                let output = &request.output_uri_prefix;
                for name in &state.result_objects {
                    store.insert(&output.bucket, &format!("{}{name}", output.path));
                }
            }
            Ok(())
        })
    }
}

/// In-memory bucket set with Cloud Storage current-directory listing
/// semantics.
///
/// Object names ending in `/` behave as directory placeholders.
#[derive(Clone, Debug, Default)]
pub struct InMemoryObjectStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    objects: BTreeSet<(String, String)>,
    listed_prefixes: Vec<String>,
    deleted: Vec<String>,
    fail_list_on: Option<String>,
    fail_delete_on: Option<String>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object.
    pub fn insert(&self, bucket: &str, name: &str) {
        lock(&self.state)
            .objects
            .insert((bucket.to_owned(), name.to_owned()));
    }

    /// Makes listing `prefix` fail.
    pub fn fail_list_on(&self, prefix: &str) {
        lock(&self.state).fail_list_on = Some(prefix.to_owned());
    }

    /// Makes deleting `name` fail.
    pub fn fail_delete_on(&self, name: &str) {
        lock(&self.state).fail_delete_on = Some(name.to_owned());
    }

    /// Names of every object left in `bucket`, sorted.
    #[must_use]
    pub fn objects(&self, bucket: &str) -> Vec<String> {
        lock(&self.state)
            .objects
            .iter()
            .filter(|(owner, _)| owner == bucket)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Prefixes listed so far, in call order.
    #[must_use]
    pub fn listed_prefixes(&self) -> Vec<String> {
        lock(&self.state).listed_prefixes.clone()
    }

    /// Objects deleted so far, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.state).deleted.clone()
    }

    fn list_now(state: &StoreState, bucket: &str, prefix: &str) -> Vec<StorageEntry> {
        let mut directories = BTreeSet::new();
        let mut entries = Vec::new();
        for (owner, name) in &state.objects {
            if owner != bucket {
                continue;
            }
            let Some(rest) = name.strip_prefix(prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((head, tail)) if !tail.is_empty() => {
                    directories.insert(format!("{prefix}{head}/"));
                }
                _ if name.ends_with('/') => {
                    entries.push(StorageEntry::directory(bucket, name.clone()));
                }
                _ => entries.push(StorageEntry::object(bucket, name.clone())),
            }
        }
        for directory in directories {
            if !entries.iter().any(|entry| entry.name == directory) {
                entries.push(StorageEntry::directory(bucket, directory));
            }
        }
        entries
    }
}

impl ObjectStore for InMemoryObjectStore {
    type Error = ScriptedError;

    fn list<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
    ) -> ServiceFuture<'a, Vec<StorageEntry>, Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.listed_prefixes.push(prefix.to_owned());
            if state.fail_list_on.as_deref() == Some(prefix) {
                return Err(ScriptedError::List(prefix.to_owned()));
            }
            Ok(Self::list_now(&state, bucket, prefix))
        })
    }

    fn delete<'a>(&'a self, entry: &'a StorageEntry) -> ServiceFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            if state.fail_delete_on.as_deref() == Some(entry.name.as_str()) {
                return Err(ScriptedError::Delete(entry.name.clone()));
            }
            state
                .objects
                .remove(&(entry.bucket.clone(), entry.name.clone()));
            state.deleted.push(entry.name.clone());
            Ok(())
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and removes environment variables while holding a global mutex.
    ///
    /// Pairs with a `None` value are removed for the guard's lifetime.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
