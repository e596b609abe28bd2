//! Argument handling and the single execution path of one invocation.
//!
//! The `-vulcan` option is extracted first, then the `(noun, verb)` pair is
//! resolved and its flags parsed. At most one control-plane operation runs
//! (draining polls repeatedly) and exactly one result or error is written.

use std::env;
use std::io::{self, Write};

use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, ControlPlane, HttpControlPlane};
use crate::commands;
use crate::config::{CliConfig, parse_server_address};
use crate::global::find_server_address;
use crate::output::OutputFormat;
use crate::policy::PolicyRegistry;
use crate::telemetry::init_logging;
use crate::tree::{CommandTree, OUTPUT_FLAG, ParsedFlags, Resolution, ResolvedCommand};

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    if let Err(err) = init_logging(&config.log_level, config.log_format) {
        eprintln!("warning: {err:#}");
    }

    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    execute(args, &config, connect_http, &mut stdout, &mut stderr).await
}

fn connect_http(
    address: Url,
    config: &CliConfig,
    trace_id: &str,
) -> CliResult<Box<dyn ControlPlane>> {
    Ok(Box::new(HttpControlPlane::new(
        address,
        config.http_timeout,
        trace_id,
    )?))
}

/// Run one invocation, writing command output to `out` and the error line,
/// if any, to `err`.
pub(crate) async fn execute<C>(
    args: Vec<String>,
    config: &CliConfig,
    connect: C,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32
where
    C: Fn(Url, &CliConfig, &str) -> CliResult<Box<dyn ControlPlane>>,
{
    let trace_id = Uuid::new_v4().to_string();
    match dispatch(args, config, &connect, &trace_id, out).await {
        Ok(()) => 0,
        Err(error) => {
            let message = error.display_message();
            tracing::debug!(%trace_id, error = %message, "command failed");
            if writeln!(err, "error: {message}").is_err() {
                tracing::warn!(%trace_id, "failed to write error message");
            }
            error.exit_code()
        }
    }
}

async fn dispatch<C>(
    args: Vec<String>,
    config: &CliConfig,
    connect: &C,
    trace_id: &str,
    out: &mut dyn Write,
) -> CliResult<()>
where
    C: Fn(Url, &CliConfig, &str) -> CliResult<Box<dyn ControlPlane>>,
{
    let (address, args) = find_server_address(args, &config.server_address)?;
    let registry = PolicyRegistry::with_builtin()?;
    let tree = CommandTree::new(&registry)?;

    let command = match tree.resolve(&args)? {
        Resolution::Usage => {
            write!(out, "{}", tree.usage())?;
            return Ok(());
        }
        Resolution::Command(command) => command,
    };

    let span = tracing::info_span!(
        "command",
        noun = command.noun,
        verb = command.verb.name,
        trace_id = %trace_id
    );
    let invocation = Invocation {
        config,
        registry: &registry,
        address: &address,
        trace_id,
    };
    invocation
        .run(&command, connect, out)
        .instrument(span)
        .await
}

struct Invocation<'a> {
    config: &'a CliConfig,
    registry: &'a PolicyRegistry,
    address: &'a str,
    trace_id: &'a str,
}

impl Invocation<'_> {
    async fn run<C>(
        &self,
        command: &ResolvedCommand<'_>,
        connect: &C,
        out: &mut dyn Write,
    ) -> CliResult<()>
    where
        C: Fn(Url, &CliConfig, &str) -> CliResult<Box<dyn ControlPlane>>,
    {
        let flags = match command.parse_flags()? {
            ParsedFlags::Help(text) => {
                write!(out, "{text}")?;
                return Ok(());
            }
            ParsedFlags::Values(flags) => flags,
        };
        let format = OutputFormat::from_flag(flags.required_text(OUTPUT_FLAG)?)?;

        if !command.verb.operation.is_remote() {
            return commands::execute_local(command, format, out);
        }

        let address = parse_server_address(self.address)?;
        tracing::debug!(command = %command.path(), server = %address, "dispatching");
        let plane = connect(address, self.config, self.trace_id)?;
        let ctx = AppContext {
            plane: plane.as_ref(),
            registry: self.registry,
            output: format,
            drain_poll_interval: self.config.drain_poll_interval,
        };
        commands::execute(&ctx, command, &flags, out).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::client::{ObjectKind, Scope};
    use crate::testing::MemoryControlPlane;

    struct Harness {
        plane: MemoryControlPlane,
        config: CliConfig,
        addresses: Arc<Mutex<Vec<String>>>,
    }

    struct Run {
        code: i32,
        stdout: String,
        stderr: String,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                plane: MemoryControlPlane::default(),
                config: CliConfig {
                    drain_poll_interval: Duration::from_millis(1),
                    ..CliConfig::default()
                },
                addresses: Arc::new(Mutex::new(Vec::new())),
            }
        }

        async fn run(&self, tokens: &[&str]) -> Run {
            let args = tokens.iter().map(ToString::to_string).collect();
            let plane = self.plane.clone();
            let addresses = Arc::clone(&self.addresses);
            let connect = move |address: Url,
                                _: &CliConfig,
                                _: &str|
                  -> CliResult<Box<dyn ControlPlane>> {
                addresses
                    .lock()
                    .expect("addresses")
                    .push(address.to_string());
                Ok(Box::new(plane.clone()))
            };

            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let code = execute(args, &self.config, connect, &mut stdout, &mut stderr).await;
            Run {
                code,
                stdout: String::from_utf8(stdout).expect("stdout"),
                stderr: String::from_utf8(stderr).expect("stderr"),
            }
        }

        fn addresses(&self) -> Vec<String> {
            self.addresses.lock().expect("addresses").clone()
        }
    }

    #[tokio::test]
    async fn host_add_rm_then_rm_again_fails_remotely() {
        let harness = Harness::new();

        let added = harness.run(&["host", "add", "-name", "host"]).await;
        assert_eq!(added.code, 0);
        assert_eq!(added.stdout, "Host added (id: host)\n");

        let removed = harness.run(&["host", "rm", "-name", "host"]).await;
        assert_eq!(removed.code, 0);
        assert_eq!(removed.stdout, "Host deleted (id: host)\n");

        let again = harness.run(&["host", "rm", "-name", "host"]).await;
        assert_eq!(again.code, 3);
        assert!(again.stdout.is_empty());
        assert!(again.stderr.starts_with("error: host 'host' not found"));
        assert_eq!(again.stderr.lines().count(), 1);
    }

    #[tokio::test]
    async fn upstream_add_without_id_reports_assigned_identifier() {
        let harness = Harness::new();
        let run = harness.run(&["upstream", "add"]).await;
        assert_eq!(run.code, 0);
        assert_eq!(run.stdout, "Upstream added (id: upstream1)\n");
    }

    #[tokio::test]
    async fn drain_with_zero_timeout_on_idle_upstream_succeeds_immediately() {
        let harness = Harness::new();
        let run = harness
            .run(&["upstream", "drain", "--id", "up", "--timeout", "0"])
            .await;
        assert_eq!(run.code, 0);
        assert_eq!(run.stdout, "Connections: 0 (drained)\n");
        assert_eq!(harness.plane.drain_polls(), 1);
    }

    #[tokio::test]
    async fn drain_timeout_reports_last_count_and_succeeds() {
        let harness = Harness::new();
        harness.plane.script_drain(&[7]);
        let run = harness
            .run(&["upstream", "drain", "-id", "up", "-timeout", "0"])
            .await;
        assert_eq!(run.code, 0);
        assert_eq!(run.stdout, "Connections: 7 (timeout reached)\n");
    }

    #[tokio::test]
    async fn drain_with_maximum_timeout_waits_for_zero() {
        let harness = Harness::new();
        harness.plane.script_drain(&[2, 1, 0]);
        let run = harness
            .run(&[
                "upstream",
                "drain",
                "-id",
                "up",
                "-timeout",
                "18446744073709551615",
            ])
            .await;
        assert_eq!(run.code, 0, "stderr: {}", run.stderr);
        assert_eq!(run.stdout, "Connections: 0 (drained)\n");
        assert_eq!(harness.plane.drain_polls(), 3);
    }

    #[tokio::test]
    async fn listing_is_idempotent() {
        let harness = Harness::new();
        harness.run(&["upstream", "add", "-id", "a"]).await;
        harness.run(&["upstream", "add", "-id", "b"]).await;

        let first = harness.run(&["upstream", "ls"]).await;
        let second = harness.run(&["upstream", "ls"]).await;
        assert_eq!(first.code, 0);
        assert_eq!(first.stdout, second.stdout);
        assert!(first.stdout.contains('a') && first.stdout.contains('b'));

        let hosts = harness.run(&["host", "ls", "--output", "json"]).await;
        assert_eq!(hosts.stdout.trim(), "[]");
    }

    #[tokio::test]
    async fn global_option_is_accepted_anywhere() {
        let harness = Harness::new();
        let before = harness
            .run(&["-vulcan", "http://one:1", "host", "add", "-name", "a"])
            .await;
        let between = harness
            .run(&["host", "--vulcan=http://two:2", "add", "-name", "b"])
            .await;
        let after = harness
            .run(&["host", "add", "-name", "c", "--vulcan", "http://three:3"])
            .await;
        assert_eq!((before.code, between.code, after.code), (0, 0, 0));
        assert_eq!(
            harness.addresses(),
            ["http://one:1/", "http://two:2/", "http://three:3/"]
        );
    }

    #[tokio::test]
    async fn default_address_comes_from_config() {
        let harness = Harness::new();
        harness.run(&["status"]).await;
        assert_eq!(harness.addresses(), ["http://localhost:8182/"]);
    }

    #[tokio::test]
    async fn missing_global_option_value_runs_nothing() {
        let harness = Harness::new();
        let run = harness.run(&["host", "ls", "-vulcan"]).await;
        assert_eq!(run.code, 2);
        assert!(run.stderr.starts_with("error: "));
        assert!(harness.plane.calls().is_empty());
        assert!(harness.addresses().is_empty());
    }

    #[tokio::test]
    async fn malformed_address_is_rejected_before_connecting() {
        let harness = Harness::new();
        let run = harness.run(&["-vulcan", "nowhere", "status"]).await;
        assert_eq!(run.code, 2);
        assert!(harness.addresses().is_empty());
    }

    #[tokio::test]
    async fn unknown_noun_and_verb_list_alternatives() {
        let harness = Harness::new();
        let noun = harness.run(&["frontend", "add"]).await;
        assert_eq!(noun.code, 2);
        assert!(noun.stderr.contains("unknown command 'frontend'"));
        assert!(noun.stderr.contains("upstream"));

        let verb = harness.run(&["location", "ls"]).await;
        assert_eq!(verb.code, 2);
        assert!(
            verb.stderr
                .contains("unknown location subcommand 'ls'; available: add, rm, set_options")
        );
        assert!(harness.plane.calls().is_empty());
    }

    #[tokio::test]
    async fn coercion_failure_makes_no_remote_call() {
        let harness = Harness::new();
        let run = harness
            .run(&[
                "location", "add", "-host", "h", "-up", "u", "-path", "/", "-maxBodyKB", "big",
            ])
            .await;
        assert_eq!(run.code, 2);
        assert!(run.stderr.contains("-maxBodyKB"));
        assert!(harness.plane.calls().is_empty());
    }

    #[tokio::test]
    async fn set_options_patches_a_single_field() {
        let harness = Harness::new();
        let added = harness
            .run(&[
                "location", "add", "-host", "h", "-id", "loc", "-up", "u", "-path", "/",
                "-readTimeout", "1s", "-dialTimeout", "2s", "-keepAlivePeriod", "30s",
            ])
            .await;
        assert_eq!(added.code, 0);

        let updated = harness
            .run(&[
                "location", "set_options", "-host", "h", "-id", "loc", "-dialTimeout", "20s",
            ])
            .await;
        assert_eq!(updated.code, 0);
        assert_eq!(updated.stdout, "Location updated (id: loc)\n");

        let options = harness.plane.location_options("h", "loc").expect("options");
        assert_eq!(options.timeouts.dial, "20s");
        assert_eq!(options.timeouts.read, "1s");
        assert_eq!(options.keep_alive.period, "30s");
    }

    #[tokio::test]
    async fn policy_nouns_are_dispatched_from_registry() {
        let harness = Harness::new();
        let run = harness
            .run(&[
                "connlimit", "add", "-host", "h", "-loc", "loc", "-id", "cl", "-connections", "3",
            ])
            .await;
        assert_eq!(run.code, 0);
        assert_eq!(run.stdout, "Connlimit added (id: cl)\n");
        let stored = harness
            .plane
            .record(
                &ObjectKind::Policy("connlimit".into()),
                &Scope::Location {
                    host: "h".into(),
                    location: "loc".into(),
                },
                "cl",
            )
            .expect("stored");
        assert_eq!(stored["Connections"], 3);
    }

    #[tokio::test]
    async fn key_new_never_connects() {
        let harness = Harness::new();
        let run = harness.run(&["key", "new", "-vulcan", "nowhere"]).await;
        assert_eq!(run.code, 0);
        assert_eq!(run.stdout.trim().len(), 44);
        assert!(harness.addresses().is_empty());
    }

    #[tokio::test]
    async fn usage_and_verb_help_exit_zero() {
        let harness = Harness::new();
        let usage = harness.run(&[]).await;
        assert_eq!(usage.code, 0);
        assert!(usage.stdout.contains("ratelimit"));

        let help = harness.run(&["location", "set_options", "-help"]).await;
        assert_eq!(help.code, 0);
        assert!(help.stdout.contains("--dialTimeout"));
        assert!(harness.plane.calls().is_empty());
    }

    #[tokio::test]
    async fn remote_failures_render_one_error_line() {
        let harness = Harness::new();
        harness.plane.fail_with("connection refused");
        let run = harness.run(&["status"]).await;
        assert_eq!(run.code, 3);
        assert_eq!(run.stderr, "error: connection refused\n");
        assert!(run.stdout.is_empty());
    }
}
