//! Operator consent before the destructive test

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};

/// Print `question` and wait for an answer on stdin.
///
/// Only an answer starting with `Y` counts as yes. When stdin is not a
/// terminal nobody can answer, so this prints a notice and says no.
pub fn confirm(question: &str) -> Result<bool> {
    print!("{question}");
    io::stdout().flush().context("Error writing standard output")?;

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        println!("\nYou can only do this from a terminal");
        return Ok(false);
    }
    read_answer(stdin.lock())
}

fn read_answer<R: BufRead>(mut input: R) -> Result<bool> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Error reading standard input")?;
    Ok(line.starts_with('Y'))
}
