//! Two-level `(noun, verb)` command tree.
//!
//! Static nouns are declared here; one extra noun is appended per policy kind
//! found in the [`PolicyRegistry`]. Resolution matches the first token against
//! the nouns and the second against that noun's verbs, then hands the rest of
//! the argument vector to the verb's flag schema.

use clap::error::{ContextKind, ErrorKind};

use crate::client::{CliError, CliResult};
use crate::global::normalize_flag_prefix;
use crate::mapper::location_option_flags;
use crate::policy::{PolicyCommandFactory, PolicyRegistry};
use crate::schema::{FlagSpec, FlagValues, build_command};

pub(crate) const OUTPUT_FLAG: &str = "output";
const OUTPUT_FORMATS: &[&str] = &["table", "json"];

/// Handler selected by a resolved command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Status,
    HostAdd,
    HostRemove,
    HostList,
    UpstreamAdd,
    UpstreamRemove,
    UpstreamList,
    UpstreamDrain,
    EndpointAdd,
    EndpointRemove,
    LocationAdd,
    LocationRemove,
    LocationSetOptions,
    KeyNew,
    PolicyAdd,
    PolicyUpdate,
    PolicyRemove,
}

impl Operation {
    /// Whether the operation talks to the control plane at all.
    pub(crate) const fn is_remote(self) -> bool {
        !matches!(self, Self::KeyNew)
    }
}

/// A verb with its declared flags.
#[derive(Debug, Clone)]
pub(crate) struct VerbCommand {
    pub(crate) name: &'static str,
    pub(crate) about: &'static str,
    pub(crate) operation: Operation,
    pub(crate) flags: Vec<FlagSpec>,
}

impl VerbCommand {
    fn new(
        name: &'static str,
        about: &'static str,
        operation: Operation,
        flags: Vec<FlagSpec>,
    ) -> Self {
        let mut flags = flags;
        flags.push(
            FlagSpec::choice(OUTPUT_FLAG, OUTPUT_FORMATS, "Output format")
                .with_default(OUTPUT_FORMATS[0]),
        );
        Self {
            name,
            about,
            operation,
            flags,
        }
    }

    const fn name_or(&self, noun: &'static str) -> &'static str {
        if self.name.is_empty() { noun } else { self.name }
    }
}

#[derive(Debug, Clone)]
enum NounBody {
    /// Noun that runs directly without a verb token (`status`).
    Leaf(VerbCommand),
    Verbs(Vec<VerbCommand>),
}

/// A top-level noun and its verbs.
#[derive(Debug, Clone)]
pub(crate) struct NounCommand {
    pub(crate) name: &'static str,
    pub(crate) about: &'static str,
    body: NounBody,
}

impl NounCommand {
    fn leaf(name: &'static str, about: &'static str, verb: VerbCommand) -> Self {
        Self {
            name,
            about,
            body: NounBody::Leaf(verb),
        }
    }

    fn with_verbs(name: &'static str, about: &'static str, verbs: Vec<VerbCommand>) -> Self {
        Self {
            name,
            about,
            body: NounBody::Verbs(verbs),
        }
    }

    pub(crate) fn verb_names(&self) -> Vec<String> {
        match &self.body {
            NounBody::Leaf(_) => Vec::new(),
            NounBody::Verbs(verbs) => verbs.iter().map(|verb| verb.name.to_string()).collect(),
        }
    }
}

/// Outcome of resolving an argument vector against the tree.
#[derive(Debug)]
pub(crate) enum Resolution<'t> {
    /// No command given, or an explicit request for the command list.
    Usage,
    Command(ResolvedCommand<'t>),
}

/// A matched `(noun, verb)` pair plus the tokens left for flag parsing.
#[derive(Debug)]
pub(crate) struct ResolvedCommand<'t> {
    pub(crate) noun: &'static str,
    pub(crate) verb: &'t VerbCommand,
    pub(crate) args: Vec<String>,
}

/// Result of parsing a verb's flags.
#[derive(Debug)]
pub(crate) enum ParsedFlags {
    Values(FlagValues),
    Help(String),
}

impl ResolvedCommand<'_> {
    /// Display path such as `location set_options`.
    pub(crate) fn path(&self) -> String {
        if self.verb.name.is_empty() {
            self.noun.to_string()
        } else {
            format!("{} {}", self.noun, self.verb.name)
        }
    }

    pub(crate) fn parse_flags(&self) -> CliResult<ParsedFlags> {
        let tokens: Vec<String> = self
            .args
            .iter()
            .map(|token| normalize_flag_prefix(token))
            .collect();
        let command = build_command(
            self.verb.name_or(self.noun),
            format!("vulcanctl {}", self.path()),
            self.verb.about,
            &self.verb.flags,
        );

        match command.try_get_matches_from(tokens) {
            Ok(matches) => Ok(ParsedFlags::Values(FlagValues::new(matches))),
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    Ok(ParsedFlags::Help(err.render().to_string()))
                }
                ErrorKind::InvalidValue | ErrorKind::ValueValidation => {
                    let flag = err
                        .get(ContextKind::InvalidArg)
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    let flag = flag
                        .trim_start_matches('-')
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    Err(CliError::coercion(&flag, summary(&err)))
                }
                _ => Err(CliError::validation(summary(&err))),
            },
        }
    }
}

/// First paragraph of a clap error, folded onto one line.
fn summary(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let text = rendered
        .lines()
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    text.strip_prefix("error: ").unwrap_or(&text).to_string()
}

/// The full command surface for one invocation.
#[derive(Debug, Clone)]
pub(crate) struct CommandTree {
    nouns: Vec<NounCommand>,
}

impl CommandTree {
    /// Static nouns followed by one noun per registered policy kind.
    pub(crate) fn new(registry: &PolicyRegistry) -> CliResult<Self> {
        let mut nouns = static_nouns();
        for factory in registry.iter() {
            if nouns.iter().any(|noun| noun.name == factory.kind()) {
                return Err(CliError::validation(format!(
                    "policy kind '{}' collides with a built-in command",
                    factory.kind()
                )));
            }
            nouns.push(policy_noun(factory));
        }
        Ok(Self { nouns })
    }

    pub(crate) fn noun_names(&self) -> Vec<String> {
        self.nouns.iter().map(|noun| noun.name.to_string()).collect()
    }

    /// Match the leading tokens of `args` against the tree.
    pub(crate) fn resolve(&self, args: &[String]) -> CliResult<Resolution<'_>> {
        let Some(first) = args.first() else {
            return Ok(Resolution::Usage);
        };
        if matches!(first.as_str(), "help" | "-h" | "--help" | "-help") {
            return Ok(Resolution::Usage);
        }

        let noun = self
            .nouns
            .iter()
            .find(|noun| noun.name == first)
            .ok_or_else(|| CliError::UnknownCommand {
                scope: "command".to_string(),
                name: first.clone(),
                available: self.noun_names(),
            })?;

        match &noun.body {
            NounBody::Leaf(verb) => Ok(Resolution::Command(ResolvedCommand {
                noun: noun.name,
                verb,
                args: args[1..].to_vec(),
            })),
            NounBody::Verbs(verbs) => {
                let requested = args.get(1).map(String::as_str).unwrap_or_default();
                let verb = verbs
                    .iter()
                    .find(|verb| verb.name == requested)
                    .ok_or_else(|| CliError::UnknownCommand {
                        scope: format!("{} subcommand", noun.name),
                        name: requested.to_string(),
                        available: noun.verb_names(),
                    })?;
                Ok(Resolution::Command(ResolvedCommand {
                    noun: noun.name,
                    verb,
                    args: args[2..].to_vec(),
                }))
            }
        }
    }

    /// Command list shown for `vulcanctl`, `vulcanctl help` and `--help`.
    pub(crate) fn usage(&self) -> String {
        let mut text = String::from(
            "Command line interface to a running vulcan instance\n\n\
             Usage: vulcanctl [-vulcan <address>] <command> [<subcommand>] [flags]\n\n\
             Commands:\n",
        );
        for noun in &self.nouns {
            let verbs = noun.verb_names();
            if verbs.is_empty() {
                text.push_str(&format!("  {:<12}{}\n", noun.name, noun.about));
            } else {
                text.push_str(&format!(
                    "  {:<12}{} ({})\n",
                    noun.name,
                    noun.about,
                    verbs.join(", ")
                ));
            }
        }
        text
    }
}

fn static_nouns() -> Vec<NounCommand> {
    vec![
        NounCommand::leaf(
            "status",
            "Show hosts, locations and upstreams",
            VerbCommand::new("", "Show aggregate status", Operation::Status, Vec::new()),
        ),
        NounCommand::with_verbs(
            "host",
            "Manage hosts",
            vec![
                VerbCommand::new(
                    "add",
                    "Add a host",
                    Operation::HostAdd,
                    vec![FlagSpec::text("name", "Host name").required()],
                ),
                VerbCommand::new(
                    "rm",
                    "Remove a host",
                    Operation::HostRemove,
                    vec![FlagSpec::text("name", "Host name").required()],
                ),
                VerbCommand::new("ls", "List hosts", Operation::HostList, Vec::new()),
            ],
        ),
        NounCommand::with_verbs(
            "upstream",
            "Manage upstreams",
            vec![
                VerbCommand::new(
                    "add",
                    "Add an upstream",
                    Operation::UpstreamAdd,
                    vec![FlagSpec::text("id", "Upstream id, assigned when omitted")],
                ),
                VerbCommand::new(
                    "rm",
                    "Remove an upstream",
                    Operation::UpstreamRemove,
                    vec![FlagSpec::text("id", "Upstream id").required()],
                ),
                VerbCommand::new("ls", "List upstreams", Operation::UpstreamList, Vec::new()),
                VerbCommand::new(
                    "drain",
                    "Wait for connections to an upstream to close",
                    Operation::UpstreamDrain,
                    vec![
                        FlagSpec::text("id", "Upstream id").required(),
                        FlagSpec::uint("timeout", "Seconds to wait before giving up")
                            .with_default("5"),
                    ],
                ),
            ],
        ),
        NounCommand::with_verbs(
            "endpoint",
            "Manage upstream endpoints",
            vec![
                VerbCommand::new(
                    "add",
                    "Add an endpoint to an upstream",
                    Operation::EndpointAdd,
                    vec![
                        FlagSpec::text("id", "Endpoint id, assigned when omitted"),
                        FlagSpec::url("url", "Endpoint URL").required(),
                        FlagSpec::text("up", "Upstream id").required(),
                    ],
                ),
                VerbCommand::new(
                    "rm",
                    "Remove an endpoint",
                    Operation::EndpointRemove,
                    vec![
                        FlagSpec::text("id", "Endpoint id").required(),
                        FlagSpec::text("up", "Upstream id").required(),
                    ],
                ),
            ],
        ),
        NounCommand::with_verbs(
            "location",
            "Manage host locations",
            vec![
                VerbCommand::new("add", "Add a location", Operation::LocationAdd, {
                    let mut flags = vec![
                        FlagSpec::text("host", "Host name").required(),
                        FlagSpec::text("id", "Location id, assigned when omitted"),
                        FlagSpec::text("up", "Upstream id").required(),
                        FlagSpec::text("path", "Path expression").required(),
                    ];
                    flags.extend(location_option_flags());
                    flags
                }),
                VerbCommand::new(
                    "rm",
                    "Remove a location",
                    Operation::LocationRemove,
                    vec![
                        FlagSpec::text("host", "Host name").required(),
                        FlagSpec::text("id", "Location id").required(),
                    ],
                ),
                VerbCommand::new(
                    "set_options",
                    "Update options of a location, leaving unspecified ones unchanged",
                    Operation::LocationSetOptions,
                    {
                        let mut flags = vec![
                            FlagSpec::text("host", "Host name").required(),
                            FlagSpec::text("id", "Location id").required(),
                        ];
                        flags.extend(location_option_flags());
                        flags
                    },
                ),
            ],
        ),
        NounCommand::with_verbs(
            "key",
            "Manage sealing keys",
            vec![VerbCommand::new(
                "new",
                "Generate a new sealing key",
                Operation::KeyNew,
                Vec::new(),
            )],
        ),
    ]
}

fn policy_noun(factory: &dyn PolicyCommandFactory) -> NounCommand {
    let scoped = |id: FlagSpec| {
        vec![
            FlagSpec::text("host", "Host name").required(),
            FlagSpec::text("loc", "Location id").required(),
            id,
        ]
    };
    let with_schema = |id: FlagSpec| {
        let mut flags = scoped(id);
        flags.extend(factory.flag_schema());
        flags
    };

    NounCommand::with_verbs(
        factory.kind(),
        factory.about(),
        vec![
            VerbCommand::new(
                "add",
                "Add a policy to a location",
                Operation::PolicyAdd,
                with_schema(FlagSpec::text("id", "Policy id, assigned when omitted")),
            ),
            VerbCommand::new(
                "update",
                "Replace a policy's settings",
                Operation::PolicyUpdate,
                with_schema(FlagSpec::text("id", "Policy id").required()),
            ),
            VerbCommand::new(
                "rm",
                "Remove a policy",
                Operation::PolicyRemove,
                scoped(FlagSpec::text("id", "Policy id").required()),
            ),
        ],
    )
}
