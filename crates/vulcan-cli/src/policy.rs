//! Registry of traffic-shaping policy kinds.
//!
//! Every registered kind becomes its own noun in the command tree with `add`,
//! `update` and `rm` verbs scoped to a `(host, location)` pair. The kind
//! supplies the flags specific to it and turns parsed flags into the request
//! body sent to the control plane.

use serde_json::Value;
use vulcan_api_models::{ConnLimit, RateLimit};

use crate::client::{CliError, CliResult, encode_fields};
use crate::schema::{FlagSpec, FlagValues};

/// A policy kind that can be managed from the command line.
pub(crate) trait PolicyCommandFactory: Send + Sync {
    /// Noun under which the policy's verbs are exposed, e.g. `ratelimit`.
    fn kind(&self) -> &'static str;

    fn about(&self) -> &'static str;

    /// Flags beyond the `-host`/`-loc`/`-id` scoping flags added by the tree.
    fn flag_schema(&self) -> Vec<FlagSpec>;

    /// Build the request body for `add`/`update`. `id` is empty when the
    /// control plane should assign one.
    fn build(&self, id: &str, flags: &FlagValues) -> CliResult<Value>;
}

/// Ordered set of policy factories, unique by kind.
#[derive(Default)]
pub(crate) struct PolicyRegistry {
    factories: Vec<Box<dyn PolicyCommandFactory>>,
}

impl PolicyRegistry {
    /// Registry with the policy kinds every control plane ships with.
    pub(crate) fn with_builtin() -> CliResult<Self> {
        let mut registry = Self::default();
        registry.register(Box::new(RateLimitPolicy))?;
        registry.register(Box::new(ConnLimitPolicy))?;
        Ok(registry)
    }

    pub(crate) fn register(&mut self, factory: Box<dyn PolicyCommandFactory>) -> CliResult<()> {
        if self.get(factory.kind()).is_some() {
            return Err(CliError::validation(format!(
                "policy kind '{}' is already registered",
                factory.kind()
            )));
        }
        self.factories.push(factory);
        Ok(())
    }

    pub(crate) fn get(&self, kind: &str) -> Option<&dyn PolicyCommandFactory> {
        self.factories
            .iter()
            .find(|factory| factory.kind() == kind)
            .map(AsRef::as_ref)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &dyn PolicyCommandFactory> {
        self.factories.iter().map(AsRef::as_ref)
    }
}

/// Requests-per-period limit keyed on a request attribute.
pub(crate) struct RateLimitPolicy;

impl PolicyCommandFactory for RateLimitPolicy {
    fn kind(&self) -> &'static str {
        "ratelimit"
    }

    fn about(&self) -> &'static str {
        "Manage request rate limits"
    }

    fn flag_schema(&self) -> Vec<FlagSpec> {
        vec![
            FlagSpec::uint("requests", "Requests allowed per period").with_default("1"),
            FlagSpec::uint("period", "Period length in seconds").with_default("1"),
            FlagSpec::uint("burst", "Requests allowed above the rate momentarily")
                .with_default("1"),
            FlagSpec::text("variable", "Request attribute to limit on").with_default("client.ip"),
        ]
    }

    fn build(&self, id: &str, flags: &FlagValues) -> CliResult<Value> {
        let record = RateLimit {
            id: id.to_string(),
            requests: flags.uint("requests")?.unwrap_or(1),
            period_seconds: flags.uint("period")?.unwrap_or(1),
            burst: flags.uint("burst")?.unwrap_or(1),
            variable: flags.required_text("variable")?.to_string(),
        };
        encode_fields(self.kind(), &record)
    }
}

/// Concurrent-connection limit keyed on a request attribute.
pub(crate) struct ConnLimitPolicy;

impl PolicyCommandFactory for ConnLimitPolicy {
    fn kind(&self) -> &'static str {
        "connlimit"
    }

    fn about(&self) -> &'static str {
        "Manage concurrent connection limits"
    }

    fn flag_schema(&self) -> Vec<FlagSpec> {
        vec![
            FlagSpec::uint("connections", "Simultaneous connections allowed").with_default("1"),
            FlagSpec::text("variable", "Request attribute to limit on").with_default("client.ip"),
        ]
    }

    fn build(&self, id: &str, flags: &FlagValues) -> CliResult<Value> {
        let record = ConnLimit {
            id: id.to_string(),
            connections: flags.uint("connections")?.unwrap_or(1),
            variable: flags.required_text("variable")?.to_string(),
        };
        encode_fields(self.kind(), &record)
    }
}
