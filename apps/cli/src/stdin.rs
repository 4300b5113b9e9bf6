//! Optional profile name piped on stdin

use std::io::{self, BufRead, IsTerminal};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Default wait for a piped profile name, in milliseconds
pub const STDIN_TIMEOUT_MS: u64 = 50;

/// Read one line from stdin if it is not a terminal.
///
/// The read runs on a detached thread so a writer that never closes the pipe
/// cannot hold up the pass; after `timeout` the line is ignored.
pub fn read_profile(timeout: Duration) -> Option<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return None;
    }

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_ok() {
            let _ = tx.send(line);
        }
    });

    match rx.recv_timeout(timeout) {
        Ok(line) => first_word(&line),
        Err(_) => {
            tracing::debug!("no profile on stdin");
            None
        }
    }
}

fn first_word(line: &str) -> Option<String> {
    line.split_whitespace().next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_word() {
        assert_eq!(first_word("ci\n").as_deref(), Some("ci"));
        assert_eq!(first_word("  ops  \r\n").as_deref(), Some("ops"));
        assert_eq!(first_word("\n"), None);
        assert_eq!(first_word(""), None);
    }
}
