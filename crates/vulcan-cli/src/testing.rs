//! In-memory [`ControlPlane`] used by handler and dispatcher tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use vulcan_api_models::{
    Endpoint, Host, Location, LocationOptions, LocationOptionsPatch, StatusSummary, Upstream,
};

use crate::client::{CliError, CliResult, ControlPlane, ObjectKind, Scope, collection_segments};

#[derive(Default)]
struct MemoryState {
    collections: BTreeMap<Vec<String>, Vec<Value>>,
    next_id: u64,
    drain_script: VecDeque<u64>,
    last_drain: u64,
    drain_polls: usize,
    calls: Vec<String>,
    failure: Option<String>,
}

/// Control plane that keeps objects in memory, keyed by collection path.
#[derive(Clone, Default)]
pub(crate) struct MemoryControlPlane {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryControlPlane {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory plane lock")
    }

    /// Connection counts returned by successive drain polls; the last one repeats.
    pub(crate) fn script_drain(&self, counts: &[u64]) {
        let mut state = self.lock();
        state.drain_script = counts.iter().copied().collect();
    }

    pub(crate) fn drain_polls(&self) -> usize {
        self.lock().drain_polls
    }

    /// Make every subsequent call fail with `message`.
    pub(crate) fn fail_with(&self, message: &str) {
        self.lock().failure = Some(message.to_string());
    }

    /// Remote calls observed so far, e.g. `create v1/hosts`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub(crate) fn record(&self, kind: &ObjectKind, scope: &Scope, id: &str) -> Option<Value> {
        let key = collection_segments(kind, scope).ok()?;
        self.lock()
            .collections
            .get(&key)?
            .iter()
            .find(|item| item_id(kind, item) == Some(id))
            .cloned()
    }

    pub(crate) fn location_options(&self, host: &str, id: &str) -> Option<LocationOptions> {
        let record = self.record(&ObjectKind::Location, &Scope::Host(host.to_string()), id)?;
        serde_json::from_value(record.get("Options")?.clone()).ok()
    }

    fn begin(&self, call: String) -> CliResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(message) = state.failure.clone() {
            return Err(CliError::remote(anyhow!("{message}")));
        }
        Ok(state)
    }

    fn records<T: serde::de::DeserializeOwned>(state: &MemoryState, key: &[String]) -> Vec<T> {
        state
            .collections
            .get(key)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn item_id<'v>(kind: &ObjectKind, item: &'v Value) -> Option<&'v str> {
    item.get(kind.id_field()).and_then(Value::as_str)
}

fn not_found(kind: &ObjectKind, scope: &Scope, id: &str) -> CliError {
    CliError::remote(anyhow!("{} '{id}' not found in {scope}", kind.label()))
}

fn segments(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn create_object(
        &self,
        kind: &ObjectKind,
        scope: &Scope,
        fields: Value,
    ) -> CliResult<String> {
        let key = collection_segments(kind, scope)?;
        let mut state = self.begin(format!("create {}", key.join("/")))?;

        let mut fields = fields;
        let supplied = item_id(kind, &fields)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let id = match supplied {
            Some(id) => id,
            None => {
                state.next_id += 1;
                let id = format!("{}{}", kind.label(), state.next_id);
                if let Value::Object(map) = &mut fields {
                    map.insert(kind.id_field().to_string(), Value::String(id.clone()));
                }
                id
            }
        };

        let items = state.collections.entry(key).or_default();
        if items.iter().any(|item| item_id(kind, item) == Some(id.as_str())) {
            return Err(CliError::remote(anyhow!(
                "{} '{id}' already exists",
                kind.label()
            )));
        }
        items.push(fields);
        Ok(id)
    }

    async fn delete_object(&self, kind: &ObjectKind, scope: &Scope, id: &str) -> CliResult<()> {
        let key = collection_segments(kind, scope)?;
        let mut state = self.begin(format!("delete {}/{id}", key.join("/")))?;
        let items = state
            .collections
            .get_mut(&key)
            .ok_or_else(|| not_found(kind, scope, id))?;
        let position = items
            .iter()
            .position(|item| item_id(kind, item) == Some(id))
            .ok_or_else(|| not_found(kind, scope, id))?;
        items.remove(position);
        Ok(())
    }

    async fn list_objects(&self, kind: &ObjectKind, scope: &Scope) -> CliResult<Vec<Value>> {
        let key = collection_segments(kind, scope)?;
        let state = self.begin(format!("list {}", key.join("/")))?;
        Ok(state.collections.get(&key).cloned().unwrap_or_default())
    }

    async fn update_object_options(
        &self,
        kind: &ObjectKind,
        scope: &Scope,
        id: &str,
        fields: Value,
    ) -> CliResult<()> {
        let key = collection_segments(kind, scope)?;
        let mut state = self.begin(format!("update {}/{id}", key.join("/")))?;
        let item = state
            .collections
            .get_mut(&key)
            .and_then(|items| items.iter_mut().find(|item| item_id(kind, item) == Some(id)))
            .ok_or_else(|| not_found(kind, scope, id))?;

        if matches!(kind, ObjectKind::Location) {
            let patch: LocationOptionsPatch = serde_json::from_value(fields)
                .map_err(|err| CliError::remote(anyhow!("bad options patch: {err}")))?;
            let mut options: LocationOptions = item
                .get("Options")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|err| CliError::remote(anyhow!("bad stored options: {err}")))?
                .unwrap_or_default();
            options.apply(&patch);
            let options = serde_json::to_value(options)
                .map_err(|err| CliError::remote(anyhow!("bad options: {err}")))?;
            if let Value::Object(map) = item {
                map.insert("Options".to_string(), options);
            }
        } else {
            let mut fields = fields;
            if let Value::Object(map) = &mut fields {
                map.insert(kind.id_field().to_string(), Value::String(id.to_string()));
            }
            *item = fields;
        }
        Ok(())
    }

    async fn aggregate_status(&self) -> CliResult<StatusSummary> {
        let state = self.begin("status".to_string())?;

        let mut hosts: Vec<Host> = Self::records(&state, &segments(&["v1", "hosts"]));
        for host in &mut hosts {
            host.locations = Self::records::<Location>(
                &state,
                &segments(&["v1", "hosts", host.name.as_str(), "locations"]),
            );
        }

        let mut upstreams: Vec<Upstream> = Self::records(&state, &segments(&["v1", "upstreams"]));
        for upstream in &mut upstreams {
            upstream.endpoints = Self::records::<Endpoint>(
                &state,
                &segments(&["v1", "upstreams", upstream.id.as_str(), "endpoints"]),
            );
        }

        Ok(StatusSummary { hosts, upstreams })
    }

    async fn poll_drain_state(&self, upstream_id: &str) -> CliResult<u64> {
        let mut state = self.begin(format!("drain v1/upstreams/{upstream_id}"))?;
        state.drain_polls += 1;
        if let Some(next) = state.drain_script.pop_front() {
            state.last_drain = next;
        }
        Ok(state.last_drain)
    }
}
