//! Output renderers and formatting helpers for CLI commands.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::json;
use vulcan_api_models::{Host, StatusSummary, Upstream};

use crate::client::{CliError, CliResult};

/// Renderer selected by the per-verb `--output` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl OutputFormat {
    pub(crate) fn from_flag(raw: &str) -> CliResult<Self> {
        match raw {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(CliError::coercion(
                "output",
                format!("'{other}' is not one of table, json"),
            )),
        }
    }
}

/// What a mutating command did to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Added,
    Deleted,
    Updated,
}

impl Outcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Updated => "updated",
        }
    }
}

fn write_json(value: &impl Serialize, out: &mut dyn Write) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        CliError::Output(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to format JSON: {err}"),
        ))
    })?;
    writeln!(out, "{text}")?;
    Ok(())
}

/// One-line confirmation such as `Host added (id: example.com)`.
pub(crate) fn render_outcome(
    label: &str,
    outcome: Outcome,
    id: &str,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(
            &json!({"Kind": label, "Result": outcome.as_str(), "Id": id}),
            out,
        ),
        OutputFormat::Table => {
            writeln!(out, "{} {} (id: {id})", capitalize(label), outcome.as_str())?;
            Ok(())
        }
    }
}

pub(crate) fn render_status(
    summary: &StatusSummary,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(summary, out),
        OutputFormat::Table => {
            writeln!(out, "hosts:")?;
            if summary.hosts.is_empty() {
                writeln!(out, "  (none)")?;
            }
            for host in &summary.hosts {
                writeln!(out, "  {}", host.name)?;
                for location in &host.locations {
                    writeln!(
                        out,
                        "    {:<20} {:<30} -> {}",
                        location.id, location.path, location.upstream
                    )?;
                }
            }

            writeln!(out, "upstreams:")?;
            if summary.upstreams.is_empty() {
                writeln!(out, "  (none)")?;
            }
            for upstream in &summary.upstreams {
                writeln!(out, "  {}", upstream.id)?;
                for endpoint in &upstream.endpoints {
                    writeln!(out, "    {:<20} {}", endpoint.id, endpoint.url)?;
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn render_host_list(
    hosts: &[Host],
    format: OutputFormat,
    out: &mut dyn Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(&hosts, out),
        OutputFormat::Table => {
            writeln!(out, "{:<40} LOCATIONS", "NAME")?;
            for host in hosts {
                writeln!(out, "{:<40} {}", host.name, host.locations.len())?;
            }
            Ok(())
        }
    }
}

pub(crate) fn render_upstream_list(
    upstreams: &[Upstream],
    format: OutputFormat,
    out: &mut dyn Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(&upstreams, out),
        OutputFormat::Table => {
            writeln!(out, "{:<36} ENDPOINTS", "ID")?;
            for upstream in upstreams {
                let urls: Vec<&str> = upstream
                    .endpoints
                    .iter()
                    .map(|endpoint| endpoint.url.as_str())
                    .collect();
                writeln!(out, "{:<36} {}", upstream.id, urls.join(", "))?;
            }
            Ok(())
        }
    }
}

/// Final report of an upstream drain.
pub(crate) fn render_drain(
    connections: u64,
    drained: bool,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(
            &json!({"Connections": connections, "Drained": drained}),
            out,
        ),
        OutputFormat::Table => {
            let note = if drained {
                "drained"
            } else {
                "timeout reached"
            };
            writeln!(out, "Connections: {connections} ({note})")?;
            Ok(())
        }
    }
}

pub(crate) fn render_key(key: &str, format: OutputFormat, out: &mut dyn Write) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json(&json!({"Key": key}), out),
        OutputFormat::Table => {
            writeln!(out, "{key}")?;
            Ok(())
        }
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
