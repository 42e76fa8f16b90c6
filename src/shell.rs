//! Line-oriented front end for the dashboard.
//!
//! The shell owns the page selector and the two upload widgets. Every accepted
//! command is one interaction: the current page is evaluated again and printed.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    dashboard::{Dashboard, Page, PageView, Upload, Uploads},
    error::{DashboardError, Source},
    io_utils,
    session::SessionId,
};

const PROMPT: &str = "dashboard> ";

const HELP: &str = "\
Commands:
  page <home|ingestion|summary|about>   switch page (alias: go)
  upload <1|2> <path>                   upload a CSV file into slot 1 or 2
  clear <1|2>                           remove an upload
  show                                  re-render the current page
  help                                  show this help
  quit                                  leave the dashboard (alias: exit)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Page(Page),
    Upload(Source, PathBuf),
    Clear(Source),
    Show,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "page" | "go" => Command::Page(rest.parse()?),
        "upload" => {
            let (slot, path) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "Usage: upload <1|2> <path>".to_string())?;
            Command::Upload(parse_slot(slot)?, PathBuf::from(path.trim()))
        }
        "clear" => Command::Clear(parse_slot(rest)?),
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{other}'. Type 'help' for commands.")),
    };
    Ok(Some(command))
}

fn parse_slot(value: &str) -> Result<Source, String> {
    match value.trim() {
        "1" => Ok(Source::First),
        "2" => Ok(Source::Second),
        other => Err(format!("Upload slot must be 1 or 2, got '{other}'")),
    }
}

pub struct Shell {
    dashboard: Dashboard,
    session: SessionId,
    page: Page,
    uploads: Uploads,
}

impl Shell {
    pub fn new(mut dashboard: Dashboard) -> Self {
        let session = dashboard.open_session();
        info!("Dashboard session {session} started");
        Self {
            dashboard,
            session,
            page: Page::default(),
            uploads: Uploads::default(),
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Fills an upload widget from a file. On failure the widget is emptied.
    pub fn upload(&mut self, slot: Source, path: &std::path::Path) -> Result<(), DashboardError> {
        let result = io_utils::read_upload(path).map_err(|err| DashboardError::Upload {
            slot: slot.ordinal(),
            reason: format!("{err:#}"),
        });
        let widget = self.uploads.slot_mut(slot);
        match result {
            Ok(bytes) => {
                debug!("Upload {} now holds {} byte(s)", slot.ordinal(), bytes.len());
                *widget = Some(Upload::new(path, bytes));
                Ok(())
            }
            Err(err) => {
                *widget = None;
                Err(err)
            }
        }
    }

    pub fn evaluate(&mut self) -> PageView {
        self.dashboard
            .evaluate(self.session, self.page, &self.uploads)
    }

    pub fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        write!(output, "{}", self.evaluate().render()).context("Writing page")?;
        write!(output, "{PROMPT}").context("Writing prompt")?;
        output.flush().context("Flushing output")?;

        for line in input.lines() {
            let line = line.context("Reading command")?;
            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(Command::Quit)) => break,
                Ok(Some(Command::Help)) => writeln!(output, "{HELP}")?,
                Ok(Some(command)) => {
                    self.apply(command, &mut output)?;
                    write!(output, "{}", self.evaluate().render()).context("Writing page")?;
                }
                Err(hint) => writeln!(output, "{hint}")?,
            }
            write!(output, "{PROMPT}").context("Writing prompt")?;
            output.flush().context("Flushing output")?;
        }
        writeln!(output)?;
        info!("Dashboard session {} ended", self.session);
        Ok(())
    }

    fn apply<W: Write>(&mut self, command: Command, output: &mut W) -> Result<()> {
        match command {
            Command::Page(page) => self.page = page,
            Command::Upload(slot, path) => {
                if let Err(err) = self.upload(slot, &path) {
                    writeln!(output, "[error] {err}")?;
                }
            }
            Command::Clear(slot) => *self.uploads.slot_mut(slot) = None,
            Command::Show | Command::Help | Command::Quit => {}
        }
        Ok(())
    }
}
