// SPDX-License-Identifier: MIT
//!
//! Line oriented interactive front-end
//!

use crate::rag::Direction;
use crate::render;
use crate::session::Session;
use std::io::Write;
use tokio::io::AsyncBufReadExt;

const HELP: &str = "\
Lines without a leading ':' are translated as typed.
Commands:
  :upload PATH [SHEET]   upload glossary spreadsheet and build the index
  :translate TEXT        translate TEXT
  :direction en2ar|ar2en set translation direction
  :key CREDENTIAL        set API key sent with each request
  :sheet NAME            default sheet name for uploads
  :status                show index status
  :show                  show last result
  :help                  this help
  :quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Upload {
        path: Option<std::path::PathBuf>,
        sheet_name: Option<String>,
    },
    Translate(String),
    Direction(Direction),
    Key(String),
    Sheet(String),
    Status,
    Show,
    Help,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = std::io::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Self::Translate(line.to_string()));
        };
        let (word, rest) = command
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((command, ""));

        let cmd = match word.to_ascii_lowercase().as_str() {
            "upload" => {
                let (path, sheet_name) = rest
                    .split_once(char::is_whitespace)
                    .map(|(path, sheet)| (path, sheet.trim()))
                    .unwrap_or((rest, ""));
                Self::Upload {
                    path: non_empty(path).map(std::path::PathBuf::from),
                    sheet_name: non_empty(sheet_name).map(str::to_string),
                }
            }
            "translate" | "t" => Self::Translate(rest.to_string()),
            "direction" | "dir" => Self::Direction(rest.parse()?),
            "key" => Self::Key(rest.to_string()),
            "sheet" => Self::Sheet(rest.to_string()),
            "status" => Self::Status,
            "show" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("unknown command :{}, try :help", word),
                ))
            }
        };
        Ok(cmd)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Input fields that are not part of the presentation state
#[derive(Clone, Debug, Default)]
pub struct Form {
    pub api_key: Option<String>,
    pub direction: Direction,
    pub sheet_name: Option<String>,
}

impl Form {
    async fn apply<W: Write>(
        &mut self,
        session: &Session,
        cmd: Command,
        out: &mut W,
    ) -> std::io::Result<()> {
        match cmd {
            Command::Upload { path, sheet_name } => {
                let sheet_name = sheet_name.or_else(|| self.sheet_name.clone());
                let settled = session
                    .submit_upload(
                        path.as_deref(),
                        sheet_name.as_deref(),
                        self.api_key.as_deref(),
                    )
                    .await;
                if settled.is_some() {
                    writeln!(out, "{}", render::render(&session.state()))?;
                }
            }
            Command::Translate(text) => {
                let settled = session
                    .submit_query(&text, self.direction, self.api_key.as_deref())
                    .await;
                if settled.is_some() {
                    writeln!(out, "{}", render::render(&session.state()))?;
                }
            }
            Command::Direction(direction) => {
                self.direction = direction;
                writeln!(out, "Direction: {}", direction.label())?;
            }
            Command::Key(key) => {
                self.api_key = non_empty(&key).map(str::to_string);
                writeln!(
                    out,
                    "{}",
                    if self.api_key.is_some() {
                        "API key set"
                    } else {
                        "API key cleared"
                    }
                )?;
            }
            Command::Sheet(name) => {
                self.sheet_name = non_empty(&name).map(str::to_string);
            }
            Command::Status => match session.state().status {
                Some(status) => writeln!(out, "{}", render::status_line(&status))?,
                None => writeln!(out, "Index status unknown")?,
            },
            Command::Show => writeln!(out, "{}", render::render(&session.state()))?,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => {}
        }
        Ok(())
    }
}

/// Run interactive session until `:quit` or end of input
///
/// The status probe runs concurrently with the first commands; whichever of
/// probe and upload settles last wins. A probe still pending when input ends
/// is dropped.
pub async fn run<R, W>(session: &Session, mut form: Form, input: R, out: &mut W) -> std::io::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: Write,
{
    let repl = async {
        writeln!(out, "English ↔ Arabic RAG Translator")?;
        writeln!(out, "{}", HELP)?;

        let mut lines = input.lines();
        loop {
            write!(out, "{}> ", form.direction)?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(cmd) => form.apply(session, cmd, out).await?,
                Err(err) => writeln!(out, "{}", err)?,
            }
        }
        writeln!(out)?;
        Ok::<(), std::io::Error>(())
    };

    let probe = session.probe_status();
    tokio::pin!(repl);
    tokio::pin!(probe);
    let mut probed = false;
    loop {
        tokio::select! {
            biased;
            result = &mut repl => return result,
            _ = &mut probe, if !probed => probed = true,
        }
    }
}
