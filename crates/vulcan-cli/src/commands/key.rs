use std::io::Write;

use base64::{Engine as _, engine::general_purpose};

use crate::client::CliResult;
use crate::output::{OutputFormat, render_key};

const SEALING_KEY_BYTES: usize = 32;

/// Fresh random sealing key, base64 encoded.
pub(crate) fn generate_sealing_key() -> String {
    let key: [u8; SEALING_KEY_BYTES] = rand::random();
    general_purpose::STANDARD.encode(key)
}

pub(crate) fn handle_key_new(format: OutputFormat, out: &mut dyn Write) -> CliResult<()> {
    render_key(&generate_sealing_key(), format, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::text;

    #[test]
    fn keys_decode_to_32_bytes_and_differ() {
        let first = generate_sealing_key();
        let second = generate_sealing_key();
        let decoded = general_purpose::STANDARD.decode(&first).expect("base64");
        assert_eq!(decoded.len(), SEALING_KEY_BYTES);
        assert_ne!(first, second);
    }

    #[test]
    fn key_is_printed_on_one_line() {
        let mut out = Vec::new();
        handle_key_new(OutputFormat::Table, &mut out).expect("key");
        let printed = text(out);
        assert_eq!(printed.lines().count(), 1);
        assert_eq!(printed.trim().len(), 44);
    }
}
