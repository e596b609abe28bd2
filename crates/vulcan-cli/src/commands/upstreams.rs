use std::io::Write;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use vulcan_api_models::Upstream;

use crate::client::{
    AppContext, CliResult, ControlPlane, ObjectKind, Scope, decode_records, encode_fields,
};
use crate::output::{Outcome, render_drain, render_outcome, render_upstream_list};
use crate::schema::FlagValues;

const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 5;

pub(crate) async fn handle_upstream_add(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let upstream = Upstream {
        id: flags.optional_text("id")?.unwrap_or_default(),
        endpoints: Vec::new(),
    };
    let id = ctx
        .plane
        .create_object(
            &ObjectKind::Upstream,
            &Scope::Root,
            encode_fields("upstream", &upstream)?,
        )
        .await?;
    render_outcome("upstream", Outcome::Added, &id, ctx.output, out)
}

pub(crate) async fn handle_upstream_remove(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let id = flags.required_text("id")?;
    ctx.plane
        .delete_object(&ObjectKind::Upstream, &Scope::Root, id)
        .await?;
    render_outcome("upstream", Outcome::Deleted, id, ctx.output, out)
}

pub(crate) async fn handle_upstream_list(
    ctx: &AppContext<'_>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let items = ctx
        .plane
        .list_objects(&ObjectKind::Upstream, &Scope::Root)
        .await?;
    let upstreams: Vec<Upstream> = decode_records("upstream", items)?;
    render_upstream_list(&upstreams, ctx.output, out)
}

pub(crate) async fn handle_upstream_drain(
    ctx: &AppContext<'_>,
    flags: &FlagValues,
    out: &mut dyn Write,
) -> CliResult<()> {
    let id = flags.required_text("id")?;
    let timeout = Duration::from_secs(
        flags
            .uint("timeout")?
            .unwrap_or(DEFAULT_DRAIN_TIMEOUT_SECS),
    );
    let outcome = drain_connections(ctx.plane, id, timeout, ctx.drain_poll_interval).await?;
    render_drain(outcome.connections, outcome.drained, ctx.output, out)
}

/// Last connection count observed while draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrainOutcome {
    pub(crate) connections: u64,
    /// `false` when the timeout elapsed with connections still open.
    pub(crate) drained: bool,
}

/// Poll an upstream's connection count until it reaches zero or `timeout`
/// elapses. The count is always polled at least once. A timeout too large to
/// place on the clock waits for the drain without a deadline.
pub(crate) async fn drain_connections(
    plane: &dyn ControlPlane,
    upstream_id: &str,
    timeout: Duration,
    interval: Duration,
) -> CliResult<DrainOutcome> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        let connections = plane.poll_drain_state(upstream_id).await?;
        tracing::debug!(upstream = upstream_id, connections, "polled upstream connections");
        if connections == 0 {
            return Ok(DrainOutcome {
                connections,
                drained: true,
            });
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(DrainOutcome {
                        connections,
                        drained: false,
                    });
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        sleep(pause).await;
    }
}
