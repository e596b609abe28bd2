use std::io::Write;

use vulcan_api_models::Location;

use crate::client::{AppContext, CliError, CliResult, ObjectKind, Scope, encode_fields};
use crate::mapper::{build_location_options, build_location_options_patch};
use crate::output::{Outcome, render_outcome};
use crate::schema::FlagValues;

pub(crate) async fn handle_location_add(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let host = flags.required_text("host")?.to_string();
    let location = Location {
        id: flags.optional_text("id")?.unwrap_or_default(),
        hostname: host.clone(),
        path: flags.required_text("path")?.to_string(),
        upstream: flags.required_text("up")?.to_string(),
        options: build_location_options(flags)?,
    };

    let id = ctx
        .plane
        .create_object(
            &ObjectKind::Location,
            &Scope::Host(host),
            encode_fields("location", &location)?,
        )
        .await?;
    render_outcome("location", Outcome::Added, &id, ctx.output, out)
}

pub(crate) async fn handle_location_remove(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let scope = Scope::Host(flags.required_text("host")?.to_string());
    let id = flags.required_text("id")?;
    ctx.plane
        .delete_object(&ObjectKind::Location, &scope, id)
        .await?;
    render_outcome("location", Outcome::Deleted, id, ctx.output, out)
}

/// Send only the option flags present on the command line as one update.
pub(crate) async fn handle_location_set_options(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let scope = Scope::Host(flags.required_text("host")?.to_string());
    let id = flags.required_text("id")?;
    let patch = build_location_options_patch(flags)?;
    if patch.is_empty() {
        return Err(CliError::validation(
            "no options supplied; pass at least one option flag",
        ));
    }

    ctx.plane
        .update_object_options(
            &ObjectKind::Location,
            &scope,
            id,
            encode_fields("location options", &patch)?,
        )
        .await?;
    render_outcome("location", Outcome::Updated, id, ctx.output, out)
}
