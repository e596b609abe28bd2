#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Configuration records exchanged with the Vulcan control plane.
//!
//! The records here are transient: the CLI builds them from flags, sends them,
//! and drops them. Field names follow the control plane's `PascalCase` JSON
//! contract. Partial updates are expressed with [`LocationOptionsPatch`] so
//! that unspecified fields are never defaulted on the way through.
use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type", default)]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
}

/// A virtual host served by the proxy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Host {
    /// Host name, doubling as the identifier.
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Locations routed under this host.
    pub locations: Vec<Location>,
}

/// A named pool of backend endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Upstream {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    /// Identifier; empty asks the control plane to assign one.
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Endpoints belonging to the pool.
    pub endpoints: Vec<Endpoint>,
}

/// A single backend address inside an upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    /// Identifier; empty asks the control plane to assign one.
    pub id: String,
    /// Absolute URL of the backend.
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    /// Upstream the endpoint belongs to.
    pub upstream_id: String,
}

/// A `(host, path)` routing rule bound to an upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    /// Identifier; empty asks the control plane to assign one.
    pub id: String,
    #[serde(default)]
    /// Host the location is attached to.
    pub hostname: String,
    /// Path expression matched against incoming requests.
    pub path: String,
    /// Upstream receiving the matched traffic.
    pub upstream: String,
    #[serde(default)]
    /// Per-route proxy options.
    pub options: LocationOptions,
}

/// Upstream connection timeouts, each a duration string such as `"1s"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationTimeouts {
    /// Time allowed to read a response from the upstream.
    pub read: String,
    /// Time allowed to establish a connection.
    pub dial: String,
    /// Time allowed for the TLS handshake.
    pub tls_handshake: String,
}

/// Keep-alive tuning for upstream connections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationKeepAlive {
    /// Keep-alive probe period as a duration string.
    pub period: String,
    /// Idle connections retained per upstream host.
    pub max_idle_conns_per_host: u32,
}

/// Request body size limits, in bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationLimits {
    /// Bytes buffered in memory before spilling to disk.
    pub max_mem_body_bytes: u64,
    /// Hard ceiling for the request body.
    pub max_body_bytes: u64,
}

/// Full option set carried by a location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationOptions {
    /// Upstream timeouts.
    pub timeouts: LocationTimeouts,
    /// Keep-alive settings.
    pub keep_alive: LocationKeepAlive,
    /// Body size limits.
    pub limits: LocationLimits,
    /// Name of the predicate deciding when a request fails over.
    pub failover_predicate: String,
    /// Whether `X-Forwarded-*` headers from clients are trusted.
    pub trust_forward_header: bool,
    /// Host header forwarded to the upstream, when overridden.
    pub hostname: String,
}

/// Partial update for [`LocationTimeouts`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationTimeoutsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement read timeout.
    pub read: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement dial timeout.
    pub dial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement TLS handshake timeout.
    pub tls_handshake: Option<String>,
}

/// Partial update for [`LocationKeepAlive`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationKeepAlivePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement keep-alive period.
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement idle connection ceiling.
    pub max_idle_conns_per_host: Option<u32>,
}

/// Partial update for [`LocationLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationLimitsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement in-memory body limit.
    pub max_mem_body_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement body limit.
    pub max_body_bytes: Option<u64>,
}

/// Partial update for [`LocationOptions`].
///
/// Only fields that are `Some` are written by [`LocationOptions::apply`]; the
/// serialised form omits every unset field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocationOptionsPatch {
    #[serde(skip_serializing_if = "LocationTimeoutsPatch::is_empty")]
    /// Timeout changes.
    pub timeouts: LocationTimeoutsPatch,
    #[serde(skip_serializing_if = "LocationKeepAlivePatch::is_empty")]
    /// Keep-alive changes.
    pub keep_alive: LocationKeepAlivePatch,
    #[serde(skip_serializing_if = "LocationLimitsPatch::is_empty")]
    /// Limit changes.
    pub limits: LocationLimitsPatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement failover predicate.
    pub failover_predicate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement forward-header trust flag.
    pub trust_forward_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Replacement forwarded host name.
    pub hostname: Option<String>,
}

impl LocationTimeoutsPatch {
    /// Returns `true` when no timeout is being changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.read.is_none() && self.dial.is_none() && self.tls_handshake.is_none()
    }
}

impl LocationKeepAlivePatch {
    /// Returns `true` when no keep-alive setting is being changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.period.is_none() && self.max_idle_conns_per_host.is_none()
    }
}

impl LocationLimitsPatch {
    /// Returns `true` when no limit is being changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max_mem_body_bytes.is_none() && self.max_body_bytes.is_none()
    }
}

impl LocationOptionsPatch {
    /// Returns `true` when applying the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.timeouts.is_empty()
            && self.keep_alive.is_empty()
            && self.limits.is_empty()
            && self.failover_predicate.is_none()
            && self.trust_forward_header.is_none()
            && self.hostname.is_none()
    }
}

fn overwrite<T: Clone>(target: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        target.clone_from(value);
    }
}

impl LocationOptions {
    /// Write every field present in `patch` and leave the rest untouched.
    pub fn apply(&mut self, patch: &LocationOptionsPatch) {
        overwrite(&mut self.timeouts.read, patch.timeouts.read.as_ref());
        overwrite(&mut self.timeouts.dial, patch.timeouts.dial.as_ref());
        overwrite(
            &mut self.timeouts.tls_handshake,
            patch.timeouts.tls_handshake.as_ref(),
        );
        overwrite(&mut self.keep_alive.period, patch.keep_alive.period.as_ref());
        overwrite(
            &mut self.keep_alive.max_idle_conns_per_host,
            patch.keep_alive.max_idle_conns_per_host.as_ref(),
        );
        overwrite(
            &mut self.limits.max_mem_body_bytes,
            patch.limits.max_mem_body_bytes.as_ref(),
        );
        overwrite(
            &mut self.limits.max_body_bytes,
            patch.limits.max_body_bytes.as_ref(),
        );
        overwrite(
            &mut self.failover_predicate,
            patch.failover_predicate.as_ref(),
        );
        overwrite(
            &mut self.trust_forward_header,
            patch.trust_forward_header.as_ref(),
        );
        overwrite(&mut self.hostname, patch.hostname.as_ref());
    }
}

/// Request-rate policy scoped to a location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RateLimit {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    /// Identifier; empty asks the control plane to assign one.
    pub id: String,
    /// Requests admitted per period.
    pub requests: u64,
    /// Period length in seconds.
    pub period_seconds: u64,
    /// Requests allowed to exceed the rate momentarily.
    pub burst: u64,
    /// Request attribute the limit is keyed on, e.g. `client.ip`.
    pub variable: String,
}

/// Concurrent-connection policy scoped to a location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ConnLimit {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    /// Identifier; empty asks the control plane to assign one.
    pub id: String,
    /// Simultaneous connections admitted per key.
    pub connections: u64,
    /// Request attribute the limit is keyed on, e.g. `client.ip`.
    pub variable: String,
}

/// Aggregate view of the proxy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct StatusSummary {
    /// Configured hosts with their locations.
    pub hosts: Vec<Host>,
    /// Configured upstreams with their endpoints.
    pub upstreams: Vec<Upstream>,
}

/// Connection count reported while an upstream drains.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DrainState {
    /// Connections still open against the upstream.
    pub connections: u64,
}
