use std::{io::Write, num::NonZeroU32};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use client_core::{Field, ItemForm, ListSynchronizer, Operation, SyncError};
use shared::domain::{ItemType, Period};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::write_items;

const HELP: &str = "\
commands:
  type <task|recurring|shopping-item>
  label <text>
  deadline <YYYY-MM-DD|none>
  frequency <n|none>
  period <day|week|month>
  amount <n>
  submit                 add the draft to the list
  complete <n>           complete the n-th list entry
  list | refresh | retry | help | quit";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Type(ItemType),
    Label(String),
    Deadline(Option<NaiveDate>),
    Frequency(Option<u32>),
    Period(Period),
    Amount(NonZeroU32),
    Submit,
    Complete(usize),
    List,
    Refresh,
    Retry,
    Help,
    Quit,
}

/// Blank lines parse to `None`.
pub(crate) fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word.to_ascii_lowercase().as_str() {
        "type" => Command::Type(rest.parse()?),
        "label" => Command::Label(rest.to_string()),
        "deadline" => Command::Deadline(optional(rest, |v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").context("deadline must be YYYY-MM-DD")
        })?),
        "frequency" => Command::Frequency(optional(rest, |v| {
            v.parse::<u32>().context("frequency must be a whole number")
        })?),
        "period" => Command::Period(rest.parse()?),
        "amount" => Command::Amount(rest.parse().context("amount must be a positive number")?),
        "submit" | "add" => Command::Submit,
        "complete" | "done" => {
            let position: usize = rest.parse().context("complete takes a list position")?;
            if position == 0 {
                bail!("list positions start at 1");
            }
            Command::Complete(position)
        }
        "list" | "ls" => Command::List,
        "refresh" => Command::Refresh,
        "retry" => Command::Retry,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(Some(command))
}

fn optional<T>(value: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<Option<T>> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse(value).map(Some)
    }
}

struct Session<'a, W> {
    sync: &'a ListSynchronizer,
    form: ItemForm,
    last_failed: Option<Operation>,
    out: W,
}

impl<W: Write> Session<'_, W> {
    async fn apply(&mut self, command: Command) -> Result<()> {
        let sync = self.sync;
        match command {
            Command::Type(item_type) => self.form.set_type(item_type),
            Command::Label(label) => self.form.set_label(label),
            Command::Deadline(deadline) => self.form.set_deadline(deadline)?,
            Command::Frequency(Some(frequency)) => self.form.set_frequency(frequency)?,
            Command::Frequency(None) => self.form.clear_frequency()?,
            Command::Period(period) => self.form.set_period(period)?,
            Command::Amount(amount) => self.form.set_amount(amount)?,
            Command::Submit => {
                let item = self.form.submit()?;
                let pending = sync.add(item);
                write_items(&mut self.out, &sync.items())?;
                let result = pending.await;
                self.track(result)?;
                write_items(&mut self.out, &sync.items())?;
            }
            Command::Complete(position) => {
                let items = sync.items();
                let item = items
                    .get(position - 1)
                    .ok_or_else(|| anyhow!("no entry at position {position}"))?;
                let item_id = item
                    .id
                    .clone()
                    .ok_or_else(|| anyhow!("'{}' is still being saved", item.label))?;
                let pending = sync.remove(item_id);
                write_items(&mut self.out, &sync.items())?;
                let result = pending.await;
                self.track(result)?;
                write_items(&mut self.out, &sync.items())?;
            }
            Command::List => write_items(&mut self.out, &sync.items())?,
            Command::Refresh => {
                let result = sync.refresh().await;
                self.track(result)?;
                write_items(&mut self.out, &sync.items())?;
            }
            Command::Retry => {
                let operation = self
                    .last_failed
                    .take()
                    .ok_or_else(|| anyhow!("nothing to retry"))?;
                let result = sync.retry(operation).await;
                self.track(result)?;
                write_items(&mut self.out, &sync.items())?;
            }
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn track(&mut self, result: Result<(), SyncError>) -> Result<()> {
        if let Err(SyncError::Backend { operation, .. }) = &result {
            self.last_failed = Some(operation.clone());
        }
        result.map_err(|err| anyhow!("{err} (type 'retry' to try again)"))
    }

    fn render_form(&mut self) -> std::io::Result<()> {
        let draft = self.form.draft();
        writeln!(self.out, "draft [{}]", draft.item_type)?;
        for field in self.form.visible_fields() {
            let value = match field {
                Field::Label => format!("{:?}", draft.label),
                Field::Deadline => display_or_dash(draft.deadline),
                Field::Frequency => display_or_dash(draft.frequency),
                Field::Period => draft.period.to_string(),
                Field::Amount => draft.amount.to_string(),
            };
            writeln!(self.out, "  {field:<9} {value}")?;
        }
        let submit = if self.form.is_submittable() {
            "enabled"
        } else {
            "disabled"
        };
        writeln!(self.out, "  submit    {submit}")
    }
}

fn display_or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub(crate) async fn run(sync: &ListSynchronizer, out: impl Write) -> Result<()> {
    let mut session = Session {
        sync,
        form: ItemForm::new(),
        last_failed: None,
        out,
    };
    let loaded = sync.initialize().await;
    if let Err(err) = session.track(loaded) {
        warn!(error = %err, "initial load failed");
        eprintln!("error: {err}");
    }
    write_items(&mut session.out, &sync.items())?;
    writeln!(session.out, "{HELP}")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        session.render_form()?;
        write!(session.out, "> ")?;
        session.out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(err) = session.apply(command).await {
                    eprintln!("error: {err}");
                }
            }
            Ok(None) => {}
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/interactive_tests.rs"]
mod tests;
