//! Declared flag schemas and typed access to parsed flag values.
//!
//! Each verb declares its flags as a list of [`FlagSpec`]s. The list is rendered
//! into a `clap` command for parsing; the resulting [`FlagValues`] then coerces
//! raw strings into typed values and reports whether a flag was actually
//! supplied, independent of its default.

use std::time::Duration;

use clap::builder::PossibleValuesParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use url::Url;

use crate::client::{CliError, CliResult};

/// Value type a flag is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagKind {
    Text,
    Uint,
    Duration,
    Kilobytes,
    Url,
    Switch,
    Choice(&'static [&'static str]),
}

/// One named flag: type, default, and whether it must be supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlagSpec {
    pub(crate) name: &'static str,
    pub(crate) kind: FlagKind,
    pub(crate) default: Option<&'static str>,
    pub(crate) required: bool,
    pub(crate) help: &'static str,
}

impl FlagSpec {
    const fn new(name: &'static str, kind: FlagKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: false,
            help,
        }
    }

    pub(crate) const fn text(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Text, help)
    }

    pub(crate) const fn uint(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Uint, help)
    }

    pub(crate) const fn duration(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Duration, help)
    }

    pub(crate) const fn kilobytes(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Kilobytes, help)
    }

    pub(crate) const fn url(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Url, help)
    }

    pub(crate) const fn switch(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Switch, help)
    }

    pub(crate) const fn choice(
        name: &'static str,
        values: &'static [&'static str],
        help: &'static str,
    ) -> Self {
        Self::new(name, FlagKind::Choice(values), help)
    }

    #[must_use]
    pub(crate) const fn with_default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub(crate) const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn to_arg(&self) -> Arg {
        let arg = Arg::new(self.name).long(self.name).help(self.help);
        let arg = match self.kind {
            FlagKind::Switch => return arg.action(ArgAction::SetTrue),
            FlagKind::Choice(values) => {
                arg.value_parser(PossibleValuesParser::new(values.iter().copied()))
            }
            _ => arg,
        };
        let arg = arg.action(ArgAction::Set).required(self.required);
        match self.default {
            Some(value) => arg.default_value(value),
            None => arg,
        }
    }
}

/// Render a schema into a `clap` command that parses only flag tokens.
pub(crate) fn build_command(
    name: &'static str,
    bin_name: String,
    about: &'static str,
    schema: &[FlagSpec],
) -> Command {
    let command = Command::new(name)
        .bin_name(bin_name)
        .about(about)
        .no_binary_name(true)
        .disable_version_flag(true)
        .args_override_self(true);
    schema
        .iter()
        .fold(command, |command, spec| command.arg(spec.to_arg()))
}

/// Parsed flags with presence tracking and typed coercion.
#[derive(Debug, Clone)]
pub(crate) struct FlagValues {
    matches: ArgMatches,
}

impl FlagValues {
    pub(crate) const fn new(matches: ArgMatches) -> Self {
        Self { matches }
    }

    /// `true` only when the flag appeared on the command line; a default value
    /// never counts as present.
    pub(crate) fn is_present(&self, name: &str) -> bool {
        matches!(
            self.matches.value_source(name),
            Some(ValueSource::CommandLine)
        )
    }

    /// Raw value of a flag, falling back to its declared default.
    pub(crate) fn text(&self, name: &str) -> CliResult<Option<&str>> {
        self.matches
            .try_get_one::<String>(name)
            .map(|value| value.map(String::as_str))
            .map_err(|err| CliError::validation(format!("flag -{name} is not declared: {err}")))
    }

    /// Value of a flag that must be non-empty.
    pub(crate) fn required_text(&self, name: &str) -> CliResult<&str> {
        match self.text(name)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(CliError::validation(format!("missing required flag -{name}"))),
        }
    }

    /// Value of an optional identifier flag; empty means "not supplied".
    pub(crate) fn optional_text(&self, name: &str) -> CliResult<Option<String>> {
        Ok(self
            .text(name)?
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string))
    }

    pub(crate) fn uint(&self, name: &str) -> CliResult<Option<u64>> {
        self.text(name)?
            .map(|raw| {
                raw.parse::<u64>().map_err(|err| {
                    CliError::coercion(
                        name,
                        format!("'{raw}' is not a non-negative integer: {err}"),
                    )
                })
            })
            .transpose()
    }

    /// Unsigned value narrowed to `u32`.
    pub(crate) fn uint32(&self, name: &str) -> CliResult<Option<u32>> {
        self.uint(name)?
            .map(|value| {
                u32::try_from(value)
                    .map_err(|_| CliError::coercion(name, format!("{value} is out of range")))
            })
            .transpose()
    }

    /// Duration flag validated as a duration but kept in its original spelling.
    /// An empty value means "unset" and is accepted as-is.
    pub(crate) fn duration(&self, name: &str) -> CliResult<Option<String>> {
        self.text(name)?
            .map(|raw| {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    parse_duration(trimmed).map_err(|reason| CliError::coercion(name, reason))?;
                }
                Ok(trimmed.to_string())
            })
            .transpose()
    }

    /// Size flag supplied in kilobytes, converted to bytes.
    pub(crate) fn kilobytes_as_bytes(&self, name: &str) -> CliResult<Option<u64>> {
        self.uint(name)?
            .map(|kilobytes| {
                kilobytes.checked_mul(1024).ok_or_else(|| {
                    CliError::coercion(name, format!("{kilobytes}KB does not fit in bytes"))
                })
            })
            .transpose()
    }

    pub(crate) fn url(&self, name: &str) -> CliResult<Option<Url>> {
        self.text(name)?
            .map(|raw| {
                raw.parse::<Url>()
                    .map_err(|err| CliError::coercion(name, format!("invalid URL '{raw}': {err}")))
            })
            .transpose()
    }

    pub(crate) fn switch(&self, name: &str) -> CliResult<bool> {
        self.matches
            .try_get_one::<bool>(name)
            .map(|value| value.copied().unwrap_or(false))
            .map_err(|err| CliError::validation(format!("flag -{name} is not declared: {err}")))
    }

    /// Coerce a flag only when it was supplied on the command line.
    pub(crate) fn supplied<T>(
        &self,
        name: &str,
        coerce: impl FnOnce(&Self, &str) -> CliResult<Option<T>>,
    ) -> CliResult<Option<T>> {
        if self.is_present(name) {
            coerce(self, name)
        } else {
            Ok(None)
        }
    }
}

/// Accept the duration spellings the control plane understands (`1s`,
/// `250ms`, `1m30s`).
pub(crate) fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|err| format!("invalid duration '{raw}': {err}"))
}
