//! Menu actions, delivered to the scheduler over a channel

use std::io::BufRead;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

use crate::error::{Result, WatchError};

/// Something the user asked for from the action menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    OpenWatchlist,
    OpenSite,
    OpenInterval,
    CheckNow,
    Restart,
    Exit,
    /// Open the page of the n-th most recent match (1-based)
    OpenTitle(usize),
    Help,
}

pub const MENU_HELP: &str = "\
  c          check now
  w          open watchlist
  s          open site file
  i          open interval file
  o <n>      open the n-th most recent match in the browser
  r          restart (re-read the interval)
  q          exit
  h          this help";

impl Action {
    /// Parse a line typed at the action prompt. Blank input yields `None`.
    pub fn parse(input: &str) -> Result<Option<Action>> {
        let mut parts = input.split_whitespace();
        let Some(word) = parts.next() else {
            return Ok(None);
        };

        let action = match word.to_lowercase().as_str() {
            "c" | "check" => Action::CheckNow,
            "w" | "watchlist" => Action::OpenWatchlist,
            "s" | "site" => Action::OpenSite,
            "i" | "interval" => Action::OpenInterval,
            "r" | "restart" => Action::Restart,
            "q" | "quit" | "exit" => Action::Exit,
            "h" | "help" | "?" => Action::Help,
            "o" | "open" => {
                let n = match parts.next() {
                    Some(n) => n.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                        WatchError::ConfigError(format!("'{}' is not a match number", n))
                    })?,
                    None => 1,
                };
                Action::OpenTitle(n)
            }
            other => {
                return Err(WatchError::ConfigError(format!(
                    "Unknown action '{}' (type h for help)",
                    other
                )))
            }
        };
        Ok(Some(action))
    }
}

/// Forward lines from stdin as actions until stdin closes or the
/// receiving side hangs up.
pub fn spawn_stdin_reader(tx: Sender<Action>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match Action::parse(&line) {
                Ok(Some(action)) => {
                    if tx.send(action).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => println!("  {}", e),
            }
        }
    })
}

/// Command used to open files and URLs with the desktop's default handler
fn opener() -> (&'static str, Vec<&'static str>) {
    if cfg!(target_os = "macos") {
        ("open", vec![])
    } else if cfg!(windows) {
        ("cmd", vec!["/c", "start", ""])
    } else {
        ("xdg-open", vec![])
    }
}

fn run_opener(target: &str) -> Result<()> {
    let (program, args) = opener();
    let status = Command::new(program)
        .args(args)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| WatchError::ConfigError(format!("Could not run {}: {}", program, e)))?;

    if !status.success() {
        return Err(WatchError::ConfigError(format!(
            "{} could not open {}",
            program, target
        )));
    }
    Ok(())
}

/// Open a config file. With `use_editor`, `$EDITOR` is preferred and
/// waited on; otherwise the desktop handler is used.
pub fn open_file(path: &Path, use_editor: bool) -> Result<()> {
    if !path.exists() {
        return Err(WatchError::ConfigMissing(path.display().to_string()));
    }

    if use_editor {
        if let Ok(editor) = std::env::var("EDITOR") {
            let status = Command::new(&editor).arg(path).status()?;
            if !status.success() {
                return Err(WatchError::ConfigError(format!("{} exited with error", editor)));
            }
            return Ok(());
        }
    }

    run_opener(&path.to_string_lossy())
}

/// Open a title page in the browser
pub fn open_url(url: &str) -> Result<()> {
    url::Url::parse(url)?;
    run_opener(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(Action::parse("c").unwrap(), Some(Action::CheckNow));
        assert_eq!(Action::parse("  Watchlist ").unwrap(), Some(Action::OpenWatchlist));
        assert_eq!(Action::parse("s").unwrap(), Some(Action::OpenSite));
        assert_eq!(Action::parse("interval").unwrap(), Some(Action::OpenInterval));
        assert_eq!(Action::parse("r").unwrap(), Some(Action::Restart));
        assert_eq!(Action::parse("exit").unwrap(), Some(Action::Exit));
        assert_eq!(Action::parse("?").unwrap(), Some(Action::Help));
        assert_eq!(Action::parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_open_title() {
        assert_eq!(Action::parse("o").unwrap(), Some(Action::OpenTitle(1)));
        assert_eq!(Action::parse("open 3").unwrap(), Some(Action::OpenTitle(3)));
        assert!(Action::parse("o 0").is_err());
        assert!(Action::parse("o two").is_err());
    }

    #[test]
    fn test_unknown_action() {
        let err = Action::parse("dance").unwrap_err();
        assert!(err.to_string().contains("dance"));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_file(&dir.path().join("nope.txt"), false).unwrap_err();
        assert!(matches!(err, WatchError::ConfigMissing(_)));
    }

    #[test]
    fn test_open_url_rejects_garbage() {
        assert!(open_url("not a url").is_err());
    }
}
