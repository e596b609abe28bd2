//! Command handlers grouped by the object they manage.

use std::io::Write;

use crate::client::{AppContext, CliError, CliResult};
use crate::output::OutputFormat;
use crate::schema::FlagValues;
use crate::tree::{Operation, ResolvedCommand};

pub(crate) mod endpoints;
pub(crate) mod hosts;
pub(crate) mod key;
pub(crate) mod locations;
pub(crate) mod policies;
pub(crate) mod status;
pub(crate) mod upstreams;

/// Run an operation that needs no control plane.
pub(crate) fn execute_local(
    command: &ResolvedCommand<'_>,
    format: OutputFormat,
    out: &mut dyn Write,
) -> CliResult<()> {
    match command.verb.operation {
        Operation::KeyNew => key::handle_key_new(format, out),
        other => Err(CliError::validation(format!(
            "{other:?} requires a control plane connection"
        ))),
    }
}

/// Run a resolved command against the control plane in `ctx`.
pub(crate) async fn execute(
    ctx: &AppContext<'_>,
    command: &ResolvedCommand<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    match command.verb.operation {
        Operation::Status => status::handle_status(ctx, out).await,
        Operation::HostAdd => hosts::handle_host_add(ctx, flags, out).await,
        Operation::HostRemove => hosts::handle_host_remove(ctx, flags, out).await,
        Operation::HostList => hosts::handle_host_list(ctx, out).await,
        Operation::UpstreamAdd => upstreams::handle_upstream_add(ctx, flags, out).await,
        Operation::UpstreamRemove => upstreams::handle_upstream_remove(ctx, flags, out).await,
        Operation::UpstreamList => upstreams::handle_upstream_list(ctx, out).await,
        Operation::UpstreamDrain => upstreams::handle_upstream_drain(ctx, flags, out).await,
        Operation::EndpointAdd => endpoints::handle_endpoint_add(ctx, flags, out).await,
        Operation::EndpointRemove => endpoints::handle_endpoint_remove(ctx, flags, out).await,
        Operation::LocationAdd => locations::handle_location_add(ctx, flags, out).await,
        Operation::LocationRemove => locations::handle_location_remove(ctx, flags, out).await,
        Operation::LocationSetOptions => {
            locations::handle_location_set_options(ctx, flags, out).await
        }
        Operation::PolicyAdd => policies::handle_policy_add(ctx, command.noun, flags, out).await,
        Operation::PolicyUpdate => {
            policies::handle_policy_update(ctx, command.noun, flags, out).await
        }
        Operation::PolicyRemove => {
            policies::handle_policy_remove(ctx, command.noun, flags, out).await
        }
        Operation::KeyNew => key::handle_key_new(ctx.output, out),
    }
}
