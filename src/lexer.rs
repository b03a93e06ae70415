//! Token classifier for a single command line.
//!
//! This is the "external collaborator" described by the command
//! grammar: given a line of input it recognizes which command was
//! issued and extracts its operand list. No crate in this family's
//! dependency graph implements this grammar, so it lives here as a
//! small, self-contained module behind a narrow `next_command`
//! function — the interpreter only ever sees a [`Command`], never a
//! raw line, which keeps it testable against a canned token stream.

use crate::constants::{MAX_STRING_SIZE, MAX_WRITE_SIZE};
use std::io::BufRead;

/// A single classified command, along with whatever operands the
/// grammar for that command carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `WRITE [(k1,v1)(k2,v2)...]`
    Write(Vec<(String, String)>),
    /// `READ [k1,k2,...]`
    Read(Vec<String>),
    /// `DELETE [k1,k2,...]`
    Delete(Vec<String>),
    /// `SHOW`
    Show,
    /// `WAIT <delay_ms>`
    Wait(u64),
    /// `BACKUP`
    Backup,
    /// `HELP`
    Help,
    /// Blank line or comment.
    Empty,
    /// Recognized keyword but malformed or empty operand list.
    Invalid,
    /// End of command stream (EOF on the input).
    Eoc,
}

/// Reads and classifies the next command from `reader`.
///
/// This never returns an I/O error for malformed operand syntax —
/// unparsable operands produce [`Command::Invalid`], matching the
/// source grammar's "invalid command, continue" contract. A genuine
/// I/O failure reading the line is reported to the caller.
pub fn next_command<R: BufRead>(reader: &mut R) -> std::io::Result<Command> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line)?;
    if bytes_read == 0 {
        return Ok(Command::Eoc);
    }

    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(Command::Empty);
    }

    let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((kw, rest)) => (kw, rest.trim()),
        None => (trimmed, ""),
    };

    Ok(match keyword.to_ascii_uppercase().as_str() {
        "WRITE" => parse_write(rest),
        "READ" => parse_key_list(rest).map(Command::Read).unwrap_or(Command::Invalid),
        "DELETE" => parse_key_list(rest).map(Command::Delete).unwrap_or(Command::Invalid),
        "SHOW" => Command::Show,
        "WAIT" => rest
            .parse::<u64>()
            .map(Command::Wait)
            .unwrap_or(Command::Invalid),
        "BACKUP" => Command::Backup,
        "HELP" => Command::Help,
        _ => Command::Invalid,
    })
}

/// Strips a single layer of matching `[` `]` brackets, returning the
/// interior. `None` if the operand isn't bracketed.
fn strip_brackets(s: &str) -> Option<&str> {
    let s = s.trim();
    s.strip_prefix('[').and_then(|s| s.strip_suffix(']'))
}

/// Splits `WRITE`'s bracketed operand into a list of `(key, value)`
/// pairs, each written as `(key,value)` with no separating comma
/// between consecutive pairs. Returns `Invalid` on any malformed
/// pair, an empty list, or a count exceeding `MAX_WRITE_SIZE`.
fn parse_write(operand: &str) -> Command {
    let interior = match strip_brackets(operand) {
        Some(i) => i,
        None => return Command::Invalid,
    };

    let mut pairs = Vec::new();
    let mut remaining = interior.trim();
    while !remaining.is_empty() {
        let open = match remaining.strip_prefix('(') {
            Some(r) => r,
            None => return Command::Invalid,
        };
        let close_idx = match open.find(')') {
            Some(idx) => idx,
            None => return Command::Invalid,
        };
        let body = &open[..close_idx];
        let (key, value) = match body.split_once(',') {
            Some(kv) => kv,
            None => return Command::Invalid,
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || key.len() > MAX_STRING_SIZE || value.len() > MAX_STRING_SIZE {
            return Command::Invalid;
        }
        pairs.push((key.to_owned(), value.to_owned()));
        remaining = open[close_idx + 1..].trim();
        if pairs.len() > MAX_WRITE_SIZE {
            return Command::Invalid;
        }
    }

    if pairs.is_empty() {
        Command::Invalid
    } else {
        Command::Write(pairs)
    }
}

/// Splits `READ`/`DELETE`'s bracketed, comma-separated key list.
/// Returns `None` on malformed syntax, an empty list, or a count
/// exceeding `MAX_WRITE_SIZE`.
fn parse_key_list(operand: &str) -> Option<Vec<String>> {
    let interior = strip_brackets(operand)?;
    let keys: Vec<String> = interior
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    if keys.is_empty() || keys.len() > MAX_WRITE_SIZE {
        return None;
    }
    if keys.iter().any(|k| k.len() > MAX_STRING_SIZE) {
        return None;
    }
    Some(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn parse_one(line: &str) -> Command {
        let mut reader = BufReader::new(line.as_bytes());
        next_command(&mut reader).unwrap()
    }

    #[test]
    fn classifies_write() {
        assert_eq!(
            parse_one("WRITE [(a,1)(b,2)]\n"),
            Command::Write(vec![("a".into(), "1".into()), ("b".into(), "2".into())])
        );
    }

    #[test]
    fn classifies_read() {
        assert_eq!(
            parse_one("READ [a,b,c]\n"),
            Command::Read(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn classifies_delete() {
        assert_eq!(
            parse_one("DELETE [a,c]\n"),
            Command::Delete(vec!["a".into(), "c".into()])
        );
    }

    #[test]
    fn classifies_show_backup_help() {
        assert_eq!(parse_one("SHOW\n"), Command::Show);
        assert_eq!(parse_one("BACKUP\n"), Command::Backup);
        assert_eq!(parse_one("HELP\n"), Command::Help);
    }

    #[test]
    fn classifies_wait() {
        assert_eq!(parse_one("WAIT 100\n"), Command::Wait(100));
    }

    #[test]
    fn blank_line_and_comment_are_empty() {
        assert_eq!(parse_one("\n"), Command::Empty);
        assert_eq!(parse_one("# a comment\n"), Command::Empty);
    }

    #[test]
    fn unknown_keyword_is_invalid() {
        assert_eq!(parse_one("FROBNICATE\n"), Command::Invalid);
    }

    #[test]
    fn malformed_write_is_invalid() {
        assert_eq!(parse_one("WRITE [(a,1)\n"), Command::Invalid);
        assert_eq!(parse_one("WRITE []\n"), Command::Invalid);
        assert_eq!(parse_one("WRITE\n"), Command::Invalid);
    }

    #[test]
    fn eof_yields_eoc() {
        let mut reader = BufReader::new("".as_bytes());
        assert_eq!(next_command(&mut reader).unwrap(), Command::Eoc);
    }
}
