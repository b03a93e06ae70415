//! Drives a single command stream to completion against a [`Store`],
//! writing command output to a caller-supplied sink and routing
//! diagnostics through `tracing`.

use crate::error::{KvsError, KvsErrorKind};
use crate::lexer::{next_command, Command};
use crate::snapshot::SnapshotManager;
use crate::store::Store;
use crate::Result;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const HELP_TEXT: &str = "Available commands:\n\
  WRITE [(key,value)(key2,value2),...]\n\
  READ [key,key2,...]\n\
  DELETE [key,key2,...]\n\
  SHOW\n\
  WAIT <delay_ms>\n\
  BACKUP\n\
  HELP\n";

/// Runs `input` to end-of-commands against `store`, writing command
/// output to `output`. `job_name` is only used to label diagnostics;
/// backup numbering and the `max_backups` cap live in `snapshots`.
///
/// When `prompt` is set, `"> "` is written to `output` before each
/// read — the distinction between the interactive REPL and batch job
/// processing named in `SPEC_FULL.md` §9.
pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    job_name: &str,
    store: &Arc<Store>,
    snapshots: &Arc<SnapshotManager>,
    prompt: bool,
) -> Result<()> {
    loop {
        if prompt {
            output.write_all(b"> ")?;
            output.flush()?;
        }
        match next_command(input)? {
            Command::Write(pairs) => {
                for (key, value) in pairs {
                    if let Err(err) = store.write(&key, &value) {
                        error!(job = job_name, key = %key, %err, "failed to write pair");
                    }
                }
            }
            Command::Read(keys) => run_read(output, store, job_name, keys)?,
            Command::Delete(keys) => run_delete(output, store, job_name, keys)?,
            Command::Show => store.show(output)?,
            Command::Wait(delay_ms) => {
                if delay_ms > 0 {
                    info!(job = job_name, delay_ms, "Waiting...");
                    std::thread::sleep(Duration::from_millis(delay_ms));
                }
            }
            Command::Backup => {
                if let Err(err) = snapshots.request(store) {
                    error!(job = job_name, %err, "failed to perform backup");
                }
            }
            Command::Help => {
                output.write_all(HELP_TEXT.as_bytes())?;
            }
            Command::Empty => {}
            Command::Invalid => {
                let err: KvsError =
                    KvsErrorKind::ParseError("unrecognized command or malformed operand list".into())
                        .into();
                warn!(job = job_name, %err, "skipping invalid command; see HELP for usage");
            }
            Command::Eoc => return Ok(()),
        }
    }
}

fn run_read<W: Write>(
    output: &mut W,
    store: &Arc<Store>,
    job_name: &str,
    keys: Vec<String>,
) -> Result<()> {
    let mut rendered: Vec<(String, String)> = Vec::with_capacity(keys.len());
    for key in keys {
        let value = match store.read(&key) {
            Ok(Some(v)) => v,
            Ok(None) => "KVSERROR".to_owned(),
            Err(err) => {
                error!(job = job_name, %key, %err, "failed to read key");
                "KVSERROR".to_owned()
            }
        };
        rendered.push((key, value));
    }
    rendered.sort_by(|a, b| a.0.cmp(&b.0));

    output.write_all(b"[")?;
    for (key, value) in &rendered {
        write!(output, "({},{})", key, value)?;
    }
    output.write_all(b"]\n")?;
    Ok(())
}

fn run_delete<W: Write>(
    output: &mut W,
    store: &Arc<Store>,
    job_name: &str,
    keys: Vec<String>,
) -> Result<()> {
    let mut missing = Vec::new();
    for key in keys {
        match store.delete(&key) {
            Ok(true) => {}
            Ok(false) => missing.push(key),
            Err(err) => {
                error!(job = job_name, %key, %err, "failed to delete key");
                missing.push(key);
            }
        }
    }

    if !missing.is_empty() {
        output.write_all(b"[")?;
        for key in &missing {
            write!(output, "({},KVSMISSING)", key)?;
        }
        output.write_all(b"]\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn run_script(script: &str, max_backups: usize) -> String {
        let store = Arc::new(Store::new());
        let snapshots = Arc::new(SnapshotManager::new("job", max_backups));
        let mut reader = BufReader::new(script.as_bytes());
        let mut out = Vec::new();
        run(&mut reader, &mut out, "job", &store, &snapshots, false).unwrap();
        snapshots.join_all().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn basic_upsert_scenario() {
        let out = run_script("WRITE [(a,1)(b,2)]\nREAD [a,b,c]\n", 1);
        assert_eq!(out, "[(a,1)(b,2)(c,KVSERROR)]\n");
    }

    #[test]
    fn delete_scenario() {
        let out = run_script(
            "WRITE [(a,1)(b,2)]\nDELETE [a,c]\nREAD [a,b]\n",
            1,
        );
        assert_eq!(out, "[(c,KVSMISSING)]\n[(a,KVSERROR)(b,2)]\n");
    }

    #[test]
    fn delete_with_no_missing_keys_emits_nothing() {
        let out = run_script("WRITE [(a,1)]\nDELETE [a]\n", 1);
        assert_eq!(out, "");
    }

    #[test]
    fn upsert_override_scenario() {
        let out = run_script("WRITE [(k,v1)]\nWRITE [(k,v2)]\nREAD [k]\n", 1);
        assert_eq!(out, "[(k,v2)]\n");
    }

    #[test]
    fn show_scenario() {
        let store = Arc::new(Store::new());
        let snapshots = Arc::new(SnapshotManager::new("job", 1));
        let mut reader = BufReader::new("WRITE [(x,9)(y,8)]\nSHOW\n".as_bytes());
        let mut out = Vec::new();
        run(&mut reader, &mut out, "job", &store, &snapshots, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: std::collections::HashSet<&str> = text.lines().collect();
        let expected: std::collections::HashSet<&str> = ["(x, 9)", "(y, 8)"].iter().copied().collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn help_emits_fixed_text() {
        let out = run_script("HELP\n", 1);
        assert_eq!(out, HELP_TEXT);
    }

    #[test]
    fn invalid_and_empty_commands_produce_no_output() {
        let out = run_script("\nFROBNICATE\n# comment\n", 1);
        assert_eq!(out, "");
    }
}
