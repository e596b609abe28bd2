use std::io::Write;

use vulcan_api_models::Endpoint;

use crate::client::{AppContext, CliError, CliResult, ObjectKind, Scope, encode_fields};
use crate::output::{Outcome, render_outcome};
use crate::schema::FlagValues;

pub(crate) async fn handle_endpoint_add(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    // Validated as a URL, sent as typed so the control plane sees the exact text.
    if flags.url("url")?.is_none() {
        return Err(CliError::validation("missing required flag -url"));
    }
    let upstream_id = flags.required_text("up")?.to_string();
    let endpoint = Endpoint {
        id: flags.optional_text("id")?.unwrap_or_default(),
        url: flags.required_text("url")?.to_string(),
        upstream_id: upstream_id.clone(),
    };

    let id = ctx
        .plane
        .create_object(
            &ObjectKind::Endpoint,
            &Scope::Upstream(upstream_id),
            encode_fields("endpoint", &endpoint)?,
        )
        .await?;
    render_outcome("endpoint", Outcome::Added, &id, ctx.output, out)
}

pub(crate) async fn handle_endpoint_remove(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let id = flags.required_text("id")?;
    let scope = Scope::Upstream(flags.required_text("up")?.to_string());
    ctx.plane
        .delete_object(&ObjectKind::Endpoint, &scope, id)
        .await?;
    render_outcome("endpoint", Outcome::Deleted, id, ctx.output, out)
}
