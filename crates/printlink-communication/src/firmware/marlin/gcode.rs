//! G-code command framing
//!
//! Marlin accepts a bare command body, a body prefixed with `N<line>`, or a
//! line-numbered body followed by `*<checksum>`. The checksum is the XOR of
//! every byte of the prefixed text.

use printlink_core::{Command, CommandStyle};
use uuid::Uuid;

/// XOR checksum over the bytes of `text`
pub fn checksum(text: &str) -> u8 {
    text.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Frame a command body for the wire
///
/// The line number is only used by styles that carry one. Every call yields
/// a command with a fresh id.
pub fn compile(line_number: u32, text: &str, style: CommandStyle) -> Command {
    let id = Uuid::new_v4();
    match style {
        CommandStyle::WithoutLine => Command::new(id, None, text, false),
        CommandStyle::WithLine => {
            Command::new(id, Some(line_number), format!("N{} {}", line_number, text), false)
        }
        CommandStyle::WithLineAndChecksum => {
            let framed = format!("N{} {}", line_number, text);
            let sum = checksum(&framed);
            Command::new(id, Some(line_number), format!("{}*{}", framed, sum), true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_known_value() {
        assert_eq!(checksum("N1 M115"), 39);
        assert_eq!(checksum(""), 0);
    }

    #[test]
    fn test_compile_with_checksum() {
        let command = compile(1, "M115", CommandStyle::WithLineAndChecksum);
        assert_eq!(command.text(), "N1 M115*39");
        assert_eq!(command.line_number(), Some(1));
        assert!(command.has_checksum());
    }

    #[test]
    fn test_compile_with_line() {
        let command = compile(1, "M115", CommandStyle::WithLine);
        assert_eq!(command.text(), "N1 M115");
        assert_eq!(command.line_number(), Some(1));
        assert!(!command.has_checksum());
    }

    #[test]
    fn test_compile_without_line() {
        let command = compile(7, "M105", CommandStyle::WithoutLine);
        assert_eq!(command.text(), "M105");
        assert_eq!(command.line_number(), None);
        assert!(!command.has_checksum());
    }

    #[test]
    fn test_every_compile_has_fresh_id() {
        let a = compile(1, "G28", CommandStyle::WithLine);
        let b = compile(1, "G28", CommandStyle::WithLine);
        assert_eq!(a.text(), b.text());
        assert_ne!(a.id(), b.id());
    }

    proptest! {
        #[test]
        fn prop_framing_invariants(line in 0u32..100_000, body in "[ -~]{0,40}") {
            for style in [
                CommandStyle::WithoutLine,
                CommandStyle::WithLine,
                CommandStyle::WithLineAndChecksum,
            ] {
                let command = compile(line, &body, style);
                if command.line_number().is_some() {
                    prop_assert!(command.text().starts_with('N'));
                }
                if command.has_checksum() {
                    prop_assert!(command.text().contains('*'));
                }
            }
        }

        #[test]
        fn prop_checksum_suffix_matches_prefix(line in 0u32..100_000, body in "[A-Z][0-9]{1,3}( [A-Z][0-9.]{1,6}){0,4}") {
            let command = compile(line, &body, CommandStyle::WithLineAndChecksum);
            let (framed, sum) = command.text().rsplit_once('*').unwrap();
            prop_assert_eq!(framed, format!("N{} {}", line, body));
            prop_assert_eq!(sum.parse::<u8>().unwrap(), checksum(framed));
        }
    }
}
