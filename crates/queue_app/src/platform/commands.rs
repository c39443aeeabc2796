use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use queue_logging::{queue_debug, queue_warn};
use thiserror::Error;

pub const HELP: &str = "commands: open | close | show | hide | refresh | \
download <id> [title] | fail <id> | cancel <id> | clear | status | help | quit";

/// A line typed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Show,
    Hide,
    Refresh,
    Download { id: String, title: String },
    Fail { id: String },
    Cancel { id: String },
    Clear,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs a job id")]
    MissingId(&'static str),
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "open" => Command::Open,
        "close" => Command::Close,
        "show" => Command::Show,
        "hide" => Command::Hide,
        "refresh" | "r" => Command::Refresh,
        "download" | "dl" => {
            let (id, title) = match rest.split_once(char::is_whitespace) {
                Some((id, title)) => (id, title.trim()),
                None => (rest, ""),
            };
            Command::Download {
                id: required_id(id, "download")?,
                title: title.to_string(),
            }
        }
        "fail" => Command::Fail {
            id: required_id(rest, "fail")?,
        },
        "cancel" => Command::Cancel {
            id: required_id(rest, "cancel")?,
        },
        "clear" => Command::Clear,
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn required_id(value: &str, command: &'static str) -> Result<String, CommandError> {
    match value.split_whitespace().next() {
        Some(id) => Ok(id.to_string()),
        None => Err(CommandError::MissingId(command)),
    }
}

/// Reads commands from stdin until EOF, which counts as `quit`.
pub fn spawn_stdin_reader<T, F>(tx: mpsc::Sender<T>, wrap: F) -> std::io::Result<()>
where
    T: Send + 'static,
    F: Fn(Command) -> T + Send + 'static,
{
    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        queue_warn!("Failed to read stdin: {}", err);
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if tx.send(wrap(command)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => eprintln!("{err}. {HELP}"),
                }
            }
            queue_debug!("stdin closed");
            let _ = tx.send(wrap(Command::Quit));
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn download_takes_id_and_free_text_title() {
        assert_eq!(
            parse_command("  download b1   Dune  Messiah ").unwrap(),
            Some(Command::Download {
                id: "b1".to_string(),
                title: "Dune  Messiah".to_string(),
            })
        );
        assert_eq!(
            parse_command("dl b2").unwrap(),
            Some(Command::Download {
                id: "b2".to_string(),
                title: String::new(),
            })
        );
    }

    #[test]
    fn simple_words_and_aliases() {
        assert_eq!(parse_command("OPEN").unwrap(), Some(Command::Open));
        assert_eq!(parse_command("r").unwrap(), Some(Command::Refresh));
        assert_eq!(parse_command("exit").unwrap(), Some(Command::Quit));
        assert_eq!(
            parse_command("cancel q1 extra").unwrap(),
            Some(Command::Cancel {
                id: "q1".to_string()
            })
        );
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn errors_name_the_problem() {
        assert_eq!(
            parse_command("fail"),
            Err(CommandError::MissingId("fail"))
        );
        assert_eq!(
            parse_command("download"),
            Err(CommandError::MissingId("download"))
        );
        assert_eq!(
            parse_command("frobnicate now"),
            Err(CommandError::Unknown("frobnicate".to_string()))
        );
    }
}
