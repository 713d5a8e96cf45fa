use std::{io::Write, num::NonZeroU32, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use client_core::{HttpTodoBackend, ItemForm, ListSynchronizer};
use shared::domain::{Item, ItemId, ItemType, Period};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod interactive;

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Terminal client for the to-do server")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "TODO_SERVER_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    server_url: String,
    #[arg(long, global = true, env = "TODO_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the open items.
    List,
    /// Submit a new item.
    Add(AddArgs),
    /// Mark an item as completed by its server id.
    Complete { item_id: String },
    /// Line-oriented editing session.
    Interactive,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    label: String,
    #[arg(long = "type", default_value = "task")]
    item_type: ItemType,
    #[arg(long)]
    deadline: Option<NaiveDate>,
    #[arg(long)]
    frequency: Option<u32>,
    #[arg(long)]
    period: Option<Period>,
    #[arg(long)]
    amount: Option<NonZeroU32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let backend = HttpTodoBackend::with_timeout(
        &cli.server_url,
        Duration::from_secs(cli.timeout_secs),
    )?;
    info!(server_url = %backend.base_url(), "using server");
    let sync = ListSynchronizer::new(Arc::new(backend));

    match cli.command {
        Command::List => {
            sync.initialize().await?;
        }
        Command::Add(args) => {
            let item = fill_form(args)?.submit()?;
            sync.initialize().await?;
            sync.add(item).await?;
        }
        Command::Complete { item_id } => {
            sync.initialize().await?;
            sync.remove(ItemId::new(item_id)).await?;
        }
        Command::Interactive => {
            return interactive::run(&sync, std::io::stdout()).await;
        }
    }
    write_items(&mut std::io::stdout().lock(), &sync.items())?;
    Ok(())
}

fn fill_form(args: AddArgs) -> Result<ItemForm> {
    let mut form = ItemForm::new();
    form.set_type(args.item_type);
    form.set_label(args.label);
    if let Some(deadline) = args.deadline {
        form.set_deadline(Some(deadline))?;
    }
    if let Some(frequency) = args.frequency {
        form.set_frequency(frequency)?;
    }
    if let Some(period) = args.period {
        form.set_period(period)?;
    }
    if let Some(amount) = args.amount {
        form.set_amount(amount)?;
    }
    Ok(form)
}

fn write_items(out: &mut impl Write, items: &[Item]) -> std::io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "(no open items)");
    }
    for (index, item) in items.iter().enumerate() {
        match &item.id {
            Some(id) => writeln!(out, "{:>3}. {item}  [{id}]", index + 1)?,
            None => writeln!(out, "{:>3}. {item}  [saving]", index + 1)?,
        }
    }
    Ok(())
}
