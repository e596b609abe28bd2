//! Error types, the control-plane capability interface, and its HTTP client.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use vulcan_api_models::{DrainState, ProblemDetails, StatusSummary};

use crate::output::OutputFormat;
use crate::policy::PolicyRegistry;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type; every variant renders as a single line.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// The server address option was malformed or missing its value.
    #[error("{0}")]
    MalformedGlobalOption(String),
    /// A noun or verb did not match the command tree.
    #[error("{}", unknown_command_message(.scope, .name, .available))]
    UnknownCommand {
        scope: String,
        name: String,
        available: Vec<String>,
    },
    /// A flag value could not be converted to its declared type.
    #[error("invalid value for -{flag}: {reason}")]
    FlagCoercion { flag: String, reason: String },
    /// Local argument validation failed.
    #[error("{0}")]
    Validation(String),
    /// The control plane rejected the operation or could not be reached.
    #[error("{}", format_chain(.0))]
    Remote(anyhow::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

fn unknown_command_message(scope: &str, name: &str, available: &[String]) -> String {
    let available = available.join(", ");
    if name.is_empty() {
        format!("{scope} required; available: {available}")
    } else {
        format!("unknown {scope} '{name}'; available: {available}")
    }
}

fn format_chain(error: &anyhow::Error) -> String {
    format!("{error:#}")
}

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn coercion(flag: &str, reason: impl Into<String>) -> Self {
        Self::FlagCoercion {
            flag: flag.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn remote(error: impl Into<anyhow::Error>) -> Self {
        Self::Remote(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Output(_) => 1,
            Self::MalformedGlobalOption(_)
            | Self::UnknownCommand { .. }
            | Self::FlagCoercion { .. }
            | Self::Validation(_) => 2,
            Self::Remote(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        self.to_string()
    }
}

/// Serialize a record into the request body sent for `what`.
pub(crate) fn encode_fields(what: &str, record: &impl Serialize) -> CliResult<Value> {
    serde_json::to_value(record)
        .map_err(|err| CliError::validation(format!("failed to encode {what} request: {err}")))
}

/// Decode records returned by [`ControlPlane::list_objects`].
pub(crate) fn decode_records<T: DeserializeOwned>(
    what: &str,
    items: Vec<Value>,
) -> CliResult<Vec<T>> {
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|err| CliError::remote(anyhow!("failed to parse {what} list: {err}")))
        })
        .collect()
}

/// Kinds of objects the control plane manages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum ObjectKind {
    Host,
    Upstream,
    Endpoint,
    Location,
    Policy(String),
}

impl ObjectKind {
    pub(crate) fn label(&self) -> &str {
        match self {
            Self::Host => "host",
            Self::Upstream => "upstream",
            Self::Endpoint => "endpoint",
            Self::Location => "location",
            Self::Policy(kind) => kind,
        }
    }

    /// Field of the record that carries its identifier.
    pub(crate) const fn id_field(&self) -> &'static str {
        match self {
            Self::Host => "Name",
            _ => "Id",
        }
    }
}

/// Parent an object lives under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Scope {
    Root,
    Upstream(String),
    Host(String),
    Location { host: String, location: String },
}

impl Display for Scope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => formatter.write_str("the root scope"),
            Self::Upstream(id) => write!(formatter, "upstream '{id}'"),
            Self::Host(name) => write!(formatter, "host '{name}'"),
            Self::Location { host, location } => {
                write!(formatter, "location '{location}' of host '{host}'")
            }
        }
    }
}

/// Path segments of the collection holding `kind` objects under `scope`.
pub(crate) fn collection_segments(kind: &ObjectKind, scope: &Scope) -> CliResult<Vec<String>> {
    let segments: Vec<&str> = match (kind, scope) {
        (ObjectKind::Host, Scope::Root) => vec!["v1", "hosts"],
        (ObjectKind::Upstream, Scope::Root) => vec!["v1", "upstreams"],
        (ObjectKind::Endpoint, Scope::Upstream(upstream)) => {
            vec!["v1", "upstreams", upstream.as_str(), "endpoints"]
        }
        (ObjectKind::Location, Scope::Host(host)) => {
            vec!["v1", "hosts", host.as_str(), "locations"]
        }
        (ObjectKind::Policy(policy), Scope::Location { host, location }) => vec![
            "v1",
            "hosts",
            host.as_str(),
            "locations",
            location.as_str(),
            "middlewares",
            policy.as_str(),
        ],
        _ => {
            return Err(CliError::validation(format!(
                "{} objects cannot be addressed under {scope}",
                kind.label()
            )));
        }
    };
    Ok(segments.into_iter().map(str::to_string).collect())
}

/// Path segments of a single object, optionally followed by a sub-resource.
pub(crate) fn object_segments(
    kind: &ObjectKind,
    scope: &Scope,
    id: &str,
) -> CliResult<Vec<String>> {
    let mut segments = collection_segments(kind, scope)?;
    segments.push(id.to_string());
    if matches!(kind, ObjectKind::Location) {
        segments.push("options".to_string());
    }
    Ok(segments)
}

/// Operations the CLI needs from a running control plane.
///
/// Exactly one of these is invoked per command, except for upstream draining
/// which polls [`ControlPlane::poll_drain_state`].
#[async_trait]
pub(crate) trait ControlPlane: Send + Sync {
    /// Create an object and return its identifier (caller-supplied or assigned).
    async fn create_object(
        &self,
        kind: &ObjectKind,
        scope: &Scope,
        fields: Value,
    ) -> CliResult<String>;

    async fn delete_object(&self, kind: &ObjectKind, scope: &Scope, id: &str) -> CliResult<()>;

    async fn list_objects(&self, kind: &ObjectKind, scope: &Scope) -> CliResult<Vec<Value>>;

    /// Write `fields` onto an existing object. Location options receive a
    /// sparse patch; policies receive their full replacement body.
    async fn update_object_options(
        &self,
        kind: &ObjectKind,
        scope: &Scope,
        id: &str,
        fields: Value,
    ) -> CliResult<()>;

    async fn aggregate_status(&self) -> CliResult<StatusSummary>;

    /// Number of connections still open against an upstream.
    async fn poll_drain_state(&self, upstream_id: &str) -> CliResult<u64>;
}

/// Application context passed to command handlers.
#[derive(Clone, Copy)]
pub(crate) struct AppContext<'a> {
    pub(crate) plane: &'a dyn ControlPlane,
    pub(crate) registry: &'a PolicyRegistry,
    pub(crate) output: OutputFormat,
    pub(crate) drain_poll_interval: Duration,
}

/// [`ControlPlane`] backed by the control plane's JSON HTTP API.
#[derive(Clone)]
pub(crate) struct HttpControlPlane {
    client: Client,
    base_url: Url,
}

impl HttpControlPlane {
    /// Construct a client that tags every request with `trace_id`.
    pub(crate) fn new(base_url: Url, timeout: Duration, trace_id: &str) -> CliResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(CliError::MalformedGlobalOption(format!(
                "server address '{base_url}' must be an absolute http(s) URL"
            )));
        }

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id)
            .map_err(|_| CliError::validation("trace identifier contains invalid characters"))?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::remote(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[String]) -> CliResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CliError::MalformedGlobalOption(format!(
                    "server address '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, target: &str) -> CliResult<Response> {
        tracing::debug!(%target, "sending control plane request");
        let response = request.send().await.map_err(|err| {
            CliError::remote(anyhow!(err).context(format!("request to {target} failed")))
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(classify_problem(response).await)
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> CliResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|err| CliError::remote(anyhow!("failed to parse {what}: {err}")))
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn create_object(
        &self,
        kind: &ObjectKind,
        scope: &Scope,
        fields: Value,
    ) -> CliResult<String> {
        let url = self.endpoint(&collection_segments(kind, scope)?)?;
        let target = format!("POST {}", url.path());
        let response = self.send(self.client.post(url).json(&fields), &target).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| CliError::remote(anyhow!("failed to read response body: {err}")))?;

        let created = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
        [&created, &fields]
            .into_iter()
            .find_map(|record| record.get(kind.id_field()).and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                CliError::remote(anyhow!(
                    "control plane did not report an identifier for the new {}",
                    kind.label()
                ))
            })
    }

    async fn delete_object(&self, kind: &ObjectKind, scope: &Scope, id: &str) -> CliResult<()> {
        let mut segments = collection_segments(kind, scope)?;
        segments.push(id.to_string());
        let url = self.endpoint(&segments)?;
        let target = format!("DELETE {}", url.path());
        self.send(self.client.delete(url), &target).await?;
        Ok(())
    }

    async fn list_objects(&self, kind: &ObjectKind, scope: &Scope) -> CliResult<Vec<Value>> {
        let url = self.endpoint(&collection_segments(kind, scope)?)?;
        let target = format!("GET {}", url.path());
        let response = self.send(self.client.get(url), &target).await?;
        Self::decode(response, &format!("{} list", kind.label())).await
    }

    async fn update_object_options(
        &self,
        kind: &ObjectKind,
        scope: &Scope,
        id: &str,
        fields: Value,
    ) -> CliResult<()> {
        let url = self.endpoint(&object_segments(kind, scope, id)?)?;
        let target = format!("PUT {}", url.path());
        self.send(self.client.put(url).json(&fields), &target).await?;
        Ok(())
    }

    async fn aggregate_status(&self) -> CliResult<StatusSummary> {
        let url = self.endpoint(&["v1".to_string(), "status".to_string()])?;
        let target = format!("GET {}", url.path());
        let response = self.send(self.client.get(url), &target).await?;
        Self::decode(response, "status summary").await
    }

    async fn poll_drain_state(&self, upstream_id: &str) -> CliResult<u64> {
        let url = self.endpoint(&[
            "v1".to_string(),
            "upstreams".to_string(),
            upstream_id.to_string(),
            "drain".to_string(),
        ])?;
        let target = format!("GET {}", url.path());
        let response = self.send(self.client.get(url), &target).await?;
        let state: DrainState = Self::decode(response, "drain state").await?;
        Ok(state.connections)
    }
}

/// Classify an HTTP error response into a CLI error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).to_string();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();

    let message = problem
        .as_ref()
        .and_then(|p| p.detail.clone())
        .unwrap_or_else(|| {
            problem
                .as_ref()
                .map_or_else(|| body_text.trim().to_string(), |p| p.title.clone())
        });

    let detail = if let Some(problem) = problem {
        format!("{} (status {})", message, problem.status)
    } else if !message.is_empty() {
        format!("{message} (status {status})")
    } else {
        format!("request failed with status {status}")
    };
    CliError::remote(anyhow!(detail))
}
