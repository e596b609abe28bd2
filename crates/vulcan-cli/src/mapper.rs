//! Mapping of flat location flags onto nested [`LocationOptions`] records.
//!
//! `location add` builds a complete record where every omitted flag takes its
//! declared default. `location set_options` builds a [`LocationOptionsPatch`]
//! holding only the flags that were present on the command line.

use vulcan_api_models::{
    LocationKeepAlive, LocationKeepAlivePatch, LocationLimits, LocationLimitsPatch,
    LocationOptions, LocationOptionsPatch, LocationTimeouts, LocationTimeoutsPatch,
};

use crate::client::CliResult;
use crate::schema::{FlagSpec, FlagValues};

const READ_TIMEOUT: &str = "readTimeout";
const DIAL_TIMEOUT: &str = "dialTimeout";
const HANDSHAKE_TIMEOUT: &str = "handshakeTimeout";
const KEEP_ALIVE_PERIOD: &str = "keepAlivePeriod";
const MAX_IDLE_CONNS: &str = "maxIdleConns";
const MAX_MEM_BODY_KB: &str = "maxMemBodyKB";
const MAX_BODY_KB: &str = "maxBodyKB";
const FAILOVER_PREDICATE: &str = "failoverPredicate";
const TRUST_FORWARD_HEADER: &str = "trustForwardHeader";
const FORWARD_HOST: &str = "forwardHost";

/// Flags shared by `location add` and `location set_options`.
pub(crate) fn location_option_flags() -> Vec<FlagSpec> {
    vec![
        FlagSpec::duration(READ_TIMEOUT, "Read timeout, e.g. 1s").with_default(""),
        FlagSpec::duration(DIAL_TIMEOUT, "Dial timeout, e.g. 1s").with_default(""),
        FlagSpec::duration(HANDSHAKE_TIMEOUT, "TLS handshake timeout, e.g. 1s").with_default(""),
        FlagSpec::duration(KEEP_ALIVE_PERIOD, "Keep-alive period, e.g. 30s").with_default(""),
        FlagSpec::uint(MAX_IDLE_CONNS, "Maximum idle connections per upstream host")
            .with_default("0"),
        FlagSpec::kilobytes(MAX_MEM_BODY_KB, "Request body buffered in memory, in KB")
            .with_default("0"),
        FlagSpec::kilobytes(MAX_BODY_KB, "Maximum request body size, in KB").with_default("0"),
        FlagSpec::text(FAILOVER_PREDICATE, "Predicate deciding when to fail over")
            .with_default(""),
        FlagSpec::switch(
            TRUST_FORWARD_HEADER,
            "Trust X-Forwarded-* headers sent by clients",
        ),
        FlagSpec::text(FORWARD_HOST, "Host header forwarded to the upstream").with_default(""),
    ]
}

/// Build a complete option record; omitted flags take their declared defaults.
///
/// Any coercion failure aborts the whole build.
pub(crate) fn build_location_options(flags: &FlagValues) -> CliResult<LocationOptions> {
    Ok(LocationOptions {
        timeouts: LocationTimeouts {
            read: flags.duration(READ_TIMEOUT)?.unwrap_or_default(),
            dial: flags.duration(DIAL_TIMEOUT)?.unwrap_or_default(),
            tls_handshake: flags.duration(HANDSHAKE_TIMEOUT)?.unwrap_or_default(),
        },
        keep_alive: LocationKeepAlive {
            period: flags.duration(KEEP_ALIVE_PERIOD)?.unwrap_or_default(),
            max_idle_conns_per_host: flags.uint32(MAX_IDLE_CONNS)?.unwrap_or_default(),
        },
        limits: LocationLimits {
            max_mem_body_bytes: flags.kilobytes_as_bytes(MAX_MEM_BODY_KB)?.unwrap_or_default(),
            max_body_bytes: flags.kilobytes_as_bytes(MAX_BODY_KB)?.unwrap_or_default(),
        },
        failover_predicate: flags
            .text(FAILOVER_PREDICATE)?
            .unwrap_or_default()
            .to_string(),
        trust_forward_header: flags.switch(TRUST_FORWARD_HEADER)?,
        hostname: flags.text(FORWARD_HOST)?.unwrap_or_default().to_string(),
    })
}

/// Build a patch carrying only the flags present on the command line.
pub(crate) fn build_location_options_patch(flags: &FlagValues) -> CliResult<LocationOptionsPatch> {
    let owned_text =
        |flags: &FlagValues, name: &str| flags.text(name).map(|value| value.map(str::to_string));

    Ok(LocationOptionsPatch {
        timeouts: LocationTimeoutsPatch {
            read: flags.supplied(READ_TIMEOUT, FlagValues::duration)?,
            dial: flags.supplied(DIAL_TIMEOUT, FlagValues::duration)?,
            tls_handshake: flags.supplied(HANDSHAKE_TIMEOUT, FlagValues::duration)?,
        },
        keep_alive: LocationKeepAlivePatch {
            period: flags.supplied(KEEP_ALIVE_PERIOD, FlagValues::duration)?,
            max_idle_conns_per_host: flags.supplied(MAX_IDLE_CONNS, FlagValues::uint32)?,
        },
        limits: LocationLimitsPatch {
            max_mem_body_bytes: flags.supplied(MAX_MEM_BODY_KB, FlagValues::kilobytes_as_bytes)?,
            max_body_bytes: flags.supplied(MAX_BODY_KB, FlagValues::kilobytes_as_bytes)?,
        },
        failover_predicate: flags.supplied(FAILOVER_PREDICATE, owned_text)?,
        trust_forward_header: flags.is_present(TRUST_FORWARD_HEADER).then_some(true),
        hostname: flags.supplied(FORWARD_HOST, owned_text)?,
    })
}
