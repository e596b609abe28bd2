use std::io::Write;

use vulcan_api_models::Host;

use crate::client::{AppContext, CliResult, ObjectKind, Scope, decode_records, encode_fields};
use crate::output::{Outcome, render_host_list, render_outcome};
use crate::schema::FlagValues;

pub(crate) async fn handle_host_add(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let host = Host {
        name: flags.required_text("name")?.to_string(),
        locations: Vec::new(),
    };
    let id = ctx
        .plane
        .create_object(&ObjectKind::Host, &Scope::Root, encode_fields("host", &host)?)
        .await?;
    render_outcome("host", Outcome::Added, &id, ctx.output, out)
}

pub(crate) async fn handle_host_remove(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let name = flags.required_text("name")?;
    ctx.plane
        .delete_object(&ObjectKind::Host, &Scope::Root, name)
        .await?;
    render_outcome("host", Outcome::Deleted, name, ctx.output, out)
}

pub(crate) async fn handle_host_list(ctx: &AppContext<'_>, out: &mut dyn Write) -> CliResult<()> {
    let items = ctx
        .plane
        .list_objects(&ObjectKind::Host, &Scope::Root)
        .await?;
    let hosts: Vec<Host> = decode_records("host", items)?;
    render_host_list(&hosts, ctx.output, out)
}
