//! Line driver for the CLI.
//!
//! Implements the [`Driver`] trait over any async line source and blocking
//! writer. Each input line is either a slash command or a message to send.
//! Rendering prints only what changed since the previous frame.

use std::{
    collections::VecDeque,
    io::{self, Stdout, Write, stdout},
};

use kennel_app::{Driver, ThreadView, UserInput};
use kennel_proto::{ThreadId, UserId};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin, stdin};

use crate::Screen;

/// Line driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Translate one input line into user input.
///
/// - `/open <thread>` opens a conversation
/// - `/new <user> [greeting]` talks to a user, starting the conversation
///   with the greeting if it does not exist yet
/// - `/threads` reloads the conversation list
/// - `/quit` ends the session
/// - anything else is typed into the draft and sent
///
/// Blank lines and unknown commands produce nothing.
pub fn parse_line(line: &str) -> Vec<UserInput> {
    let line = line.trim();
    if line.is_empty() {
        return vec![];
    }

    let Some(command) = line.strip_prefix('/') else {
        return vec![UserInput::Draft(line.to_owned()), UserInput::Submit];
    };

    let (name, args) = split_word(command);
    match name {
        "open" if is_word(args) => vec![UserInput::Open(ThreadId::new(args))],
        "new" if !args.is_empty() => {
            let (user, greeting) = split_word(args);
            let greeting = (!greeting.is_empty()).then(|| greeting.to_owned());
            vec![UserInput::StartThread { with: UserId::new(user), greeting }]
        },
        "threads" if args.is_empty() => vec![UserInput::RefreshThreads],
        "quit" if args.is_empty() => vec![UserInput::Quit],
        _ => {
            tracing::warn!(%line, "unknown command");
            vec![]
        },
    }
}

/// First word and the trimmed rest.
fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn is_word(text: &str) -> bool {
    !text.is_empty() && !text.contains(char::is_whitespace)
}

/// Driver reading lines from `R` and printing to `W`.
pub struct LineDriver<R, W> {
    lines: Lines<R>,
    out: W,
    /// Parsed input not yet handed to the runtime.
    pending: VecDeque<UserInput>,
    /// Last screen printed.
    shown: Screen,
}

impl LineDriver<BufReader<Stdin>, Stdout> {
    /// Driver over the process's standard input and output.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(stdin()), stdout())
    }
}

impl<R, W> LineDriver<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Create a driver over `input` and `out`.
    pub fn new(input: R, out: W) -> Self {
        Self { lines: input.lines(), out, pending: VecDeque::new(), shown: Screen::default() }
    }

    /// Output written so far.
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn print(&mut self, next: Screen) -> io::Result<()> {
        let shown = &self.shown;
        let kept = shown.transcript.iter().zip(&next.transcript).take_while(|(a, b)| a == b).count();

        let fresh = if kept == shown.transcript.len() {
            &next.transcript[kept..]
        } else {
            // Something above the last line changed: reprint everything.
            if !shown.transcript.is_empty() {
                writeln!(self.out, "--")?;
            }
            &next.transcript[..]
        };
        for line in fresh {
            writeln!(self.out, "{line}")?;
        }

        if next.link != shown.link {
            writeln!(self.out, "* {}", next.link)?;
        }
        if next.typing != shown.typing
            && let Some(typing) = &next.typing
        {
            writeln!(self.out, "  {typing}")?;
        }
        if next.status != shown.status
            && let Some(status) = &next.status
        {
            writeln!(self.out, "! {status}")?;
        }
        self.out.flush()?;

        self.shown = next;
        Ok(())
    }
}

impl<R, W> Driver for LineDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = TerminalError;

    async fn poll_input(&mut self) -> Result<Option<UserInput>, TerminalError> {
        loop {
            if let Some(input) = self.pending.pop_front() {
                return Ok(Some(input));
            }
            // `next_line` is cancel safe; parsed input is buffered only after
            // a complete line arrived.
            match self.lines.next_line().await? {
                Some(line) => self.pending.extend(parse_line(&line)),
                None => return Ok(None),
            }
        }
    }

    fn render(&mut self, view: &ThreadView) -> Result<(), TerminalError> {
        Ok(self.print(Screen::of(view))?)
    }

    fn stop(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::debug!(error = %e, "flush on stop failed");
        }
    }
}
