//! Argument-vector preprocessing that runs ahead of flag parsing.
//!
//! The server address may appear anywhere in argv (before, between or after the
//! noun/verb tokens), so it is pulled out by a dedicated pass instead of being
//! declared on every command.

use crate::client::{CliError, CliResult};

/// Address used when neither argv nor the environment names a server.
pub(crate) const DEFAULT_SERVER_ADDRESS: &str = "http://localhost:8182";

const SHORT_FORM: &str = "-vulcan";
const LONG_FORM: &str = "--vulcan";

/// Remove the first `-vulcan`/`--vulcan` option from `args`.
///
/// Returns the address it carried (or `default` when absent) together with the
/// remaining tokens in their original relative order.
///
/// In the `=` form everything after the first `=` is the address, so
/// `--vulcan=http://a/?x=1` yields `http://a/?x=1`. This deliberately differs
/// from splitting on every `=` and keeping the second segment, which would
/// yield `http://a/?x`.
pub(crate) fn find_server_address(
    mut args: Vec<String>,
    default: &str,
) -> CliResult<(String, Vec<String>)> {
    let Some(index) = args.iter().position(|arg| is_server_option(arg)) else {
        return Ok((default.to_string(), args));
    };

    if let Some(value) = inline_value(&args[index]) {
        if value.is_empty() {
            return Err(CliError::MalformedGlobalOption(format!(
                "'{}' does not name a server address",
                args[index]
            )));
        }
        let address = value.to_string();
        args.drain(index..=index);
        return Ok((address, args));
    }

    let Some(address) = args.get(index + 1).cloned() else {
        return Err(CliError::MalformedGlobalOption(format!(
            "{} requires a server address, e.g. {} {DEFAULT_SERVER_ADDRESS}",
            args[index], args[index]
        )));
    };
    args.drain(index..index + 2);
    Ok((address, args))
}

fn is_server_option(arg: &str) -> bool {
    arg == SHORT_FORM || arg == LONG_FORM || inline_value(arg).is_some()
}

fn inline_value(arg: &str) -> Option<&str> {
    arg.strip_prefix(LONG_FORM)
        .or_else(|| arg.strip_prefix(SHORT_FORM))
        .and_then(|rest| rest.strip_prefix('='))
}

/// Rewrite single-dash long flags (`-readTimeout`) into the `--readTimeout`
/// spelling understood by the flag parser.
///
/// Negative numbers and one-letter short flags pass through unchanged.
pub(crate) fn normalize_flag_prefix(token: &str) -> String {
    let Some(rest) = token.strip_prefix('-') else {
        return token.to_string();
    };
    let long_name = rest
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic())
        && rest.split('=').next().is_some_and(|name| name.len() > 1);

    if long_name {
        format!("-{token}")
    } else {
        token.to_string()
    }
}
