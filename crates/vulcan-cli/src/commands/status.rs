use std::io::Write;

use crate::client::{AppContext, CliResult};
use crate::output::render_status;

pub(crate) async fn handle_status(ctx: &AppContext<'_>, out: &mut dyn Write) -> CliResult<()> {
    let summary = ctx.plane.aggregate_status().await?;
    render_status(&summary, ctx.output, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, flags, text};
    use crate::commands::{hosts, locations, upstreams};
    use crate::output::OutputFormat;
    use crate::policy::PolicyRegistry;
    use crate::testing::MemoryControlPlane;

    #[tokio::test]
    async fn status_reflects_configured_objects() {
        let plane = MemoryControlPlane::default();
        let registry = PolicyRegistry::default();
        let ctx = context(&plane, &registry);

        let host = flags(&["host", "add", "-name", "h"]);
        hosts::handle_host_add(&ctx, &host, &mut std::io::sink())
            .await
            .expect("host");
        let upstream = flags(&["upstream", "add", "-id", "up1"]);
        upstreams::handle_upstream_add(&ctx, &upstream, &mut std::io::sink())
            .await
            .expect("upstream");
        let location = flags(&[
            "location", "add", "-host", "h", "-id", "loc1", "-up", "up1", "-path", "/api",
        ]);
        locations::handle_location_add(&ctx, &location, &mut std::io::sink())
            .await
            .expect("location");

        let mut out = Vec::new();
        handle_status(&ctx, &mut out).await.expect("status");
        let rendered = text(out);
        assert!(rendered.contains("hosts"));
        assert!(rendered.contains("loc1"));
        assert!(rendered.contains("up1"));
    }

    #[tokio::test]
    async fn status_as_json_uses_wire_names() {
        let plane = MemoryControlPlane::default();
        let registry = PolicyRegistry::default();
        let ctx = AppContext {
            output: OutputFormat::Json,
            ..context(&plane, &registry)
        };

        let mut out = Vec::new();
        handle_status(&ctx, &mut out).await.expect("status");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert!(value["Hosts"].is_array());
        assert!(value["Upstreams"].is_array());
    }

    #[tokio::test]
    async fn unreachable_plane_is_remote_error() {
        let plane = MemoryControlPlane::default();
        plane.fail_with("connection refused");
        let registry = PolicyRegistry::default();
        let ctx = context(&plane, &registry);

        let err = handle_status(&ctx, &mut std::io::sink())
            .await
            .expect_err("unreachable");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("connection refused"));
    }
}
