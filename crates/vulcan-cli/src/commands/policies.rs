use std::io::Write;

use crate::client::{AppContext, CliError, CliResult, ObjectKind, Scope};
use crate::output::{Outcome, render_outcome};
use crate::policy::PolicyCommandFactory;
use crate::schema::FlagValues;

fn factory<'a>(ctx: &AppContext<'a>, kind: &str) -> CliResult<&'a dyn PolicyCommandFactory> {
    ctx.registry
        .get(kind)
        .ok_or_else(|| CliError::validation(format!("policy kind '{kind}' is not registered")))
}

fn location_scope(flags: &FlagValues) -> CliResult<Scope> {
    Ok(Scope::Location {
        host: flags.required_text("host")?.to_string(),
        location: flags.required_text("loc")?.to_string(),
    })
}

pub(crate) async fn handle_policy_add(
    ctx: &AppContext<'_>,
    kind: &str,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let factory = factory(ctx, kind)?;
    let scope = location_scope(flags)?;
    let requested = flags.optional_text("id")?.unwrap_or_default();
    let body = factory.build(&requested, flags)?;

    let id = ctx
        .plane
        .create_object(&ObjectKind::Policy(kind.to_string()), &scope, body)
        .await?;
    render_outcome(kind, Outcome::Added, &id, ctx.output, out)
}

/// Replace a policy's settings with the ones given on the command line.
pub(crate) async fn handle_policy_update(
    ctx: &AppContext<'_>,
    kind: &str,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let factory = factory(ctx, kind)?;
    let scope = location_scope(flags)?;
    let id = flags.required_text("id")?;
    let body = factory.build(id, flags)?;

    ctx.plane
        .update_object_options(&ObjectKind::Policy(kind.to_string()), &scope, id, body)
        .await?;
    render_outcome(kind, Outcome::Updated, id, ctx.output, out)
}

pub(crate) async fn handle_policy_remove(
    ctx: &AppContext<'_>,
    kind: &str,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    factory(ctx, kind)?;
    let scope = location_scope(flags)?;
    let id = flags.required_text("id")?;
    ctx.plane
        .delete_object(&ObjectKind::Policy(kind.to_string()), &scope, id)
        .await?;
    render_outcome(kind, Outcome::Deleted, id, ctx.output, out)
}
