use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use quote_core::db::RepositoryRegistry;
use quote_core::{
    CalculatorRepository, CalculatorSession, Change, EntryCollection, EntryField, EntryId,
    FieldUpdate, LineItem, NewCalculator, Summary, UuidGenerator,
};
use quote_data::{AppConfig, EntryImporter, FileFormat, export};
use quote_db_sqlite::SqliteRepositoryFactory;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Price quotes from the command line.
///
/// Calculators live in the database named by the config file
/// (`[database] connection_string`). Without a config file an in-memory
/// database is used, which only makes sense for `summary`.
#[derive(Parser, Debug)]
#[command(name = "quote-cli")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price the entries in a CSV or JSON file without touching the database
    Summary {
        #[arg(short, long)]
        file: PathBuf,
    },
    #[command(flatten)]
    Stored(StoredCommand),
}

/// Commands that work on calculators in the database.
#[derive(Subcommand, Debug)]
enum StoredCommand {
    /// Create the schema and store the configured default settings
    Init,
    /// Create a calculator, optionally filled from a file
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List calculators with their totals
    List,
    /// Print a calculator's entries and summary
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Replace a calculator's entries from a CSV or JSON file
    Import {
        #[arg(long)]
        id: i64,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Write a calculator to a .csv or .json file
    Export {
        #[arg(long)]
        id: i64,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Append an entry with the default rates
    Add {
        #[arg(long)]
        id: i64,
    },
    /// Copy an entry and insert the copy right after it
    Duplicate {
        #[arg(long)]
        id: i64,
        #[arg(short, long)]
        entry: String,
    },
    /// Remove an entry
    Delete {
        #[arg(long)]
        id: i64,
        #[arg(short, long)]
        entry: String,
    },
    /// Move the entry at position FROM to position TO (0-based)
    Move {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Set one input field of an entry (e.g. --field timer --value 2,5)
    Set {
        #[arg(long)]
        id: i64,
        #[arg(short, long)]
        entry: String,
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;

    match args.command {
        Command::Summary { file } => {
            let entries = read_entries(&file)?;
            let collection = EntryCollection::from_entries(entries);
            print_entries(collection.iter());
            print_summary(&collection.summary());
        }
        Command::Stored(command) => {
            let repo = open_repository(&config).await?;
            run_stored(command, repo.as_ref(), &config).await?;
        }
    }

    Ok(())
}

async fn open_repository(config: &AppConfig) -> Result<Box<dyn CalculatorRepository>> {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
        .create(&config.database)
        .await
        .with_context(|| format!("Failed to open database '{}'", config.database.connection_string))
}

async fn run_stored(
    command: StoredCommand,
    repo: &dyn CalculatorRepository,
    config: &AppConfig,
) -> Result<()> {
    match command {
        StoredCommand::Init => {
            repo.save_default_settings(&config.defaults)
                .await
                .context("Failed to store default settings")?;
            println!(
                "Database ready. Defaults: kostpris {}, timepris {}, påslag {}%",
                config.defaults.kostpris, config.defaults.timepris, config.defaults.paslag_materiell
            );
        }
        StoredCommand::Create { name, file } => {
            let calculator = repo
                .create_calculator(NewCalculator { name })
                .await
                .context("Failed to create calculator")?;
            if let Some(file) = file {
                let mut session = open_session(repo, calculator.id).await?;
                let _ = session.replace_entries(read_entries(&file)?);
                session.save(repo, calculator.id).await.context("Failed to save entries")?;
                println!(
                    "Created calculator {} with {} entries (total {})",
                    calculator.id,
                    session.entries().len(),
                    session.summary().total_sum
                );
            } else {
                println!("Created calculator {}", calculator.id);
            }
        }
        StoredCommand::List => {
            let calculators = repo.list_calculators().await.context("Failed to list calculators")?;
            if calculators.is_empty() {
                println!("No calculators.");
            }
            for calculator in calculators {
                println!(
                    "{:>5}  {:<30} {:>4} entries  total {:>12}  updated {}",
                    calculator.id,
                    calculator.name,
                    calculator.entries.len(),
                    calculator.summary.total_sum,
                    calculator.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        StoredCommand::Show { id } => {
            let session = open_session(repo, id).await?;
            print_entries(session.entries().iter());
            print_summary(session.summary());
        }
        StoredCommand::Import { id, file } => {
            let mut session = open_session(repo, id).await?;
            let change = session.replace_entries(read_entries(&file)?);
            save_if_changed(&mut session, repo, id, change).await?;
            print_summary(session.summary());
        }
        StoredCommand::Export { id, out } => {
            let session = open_session(repo, id).await?;
            let snapshot = session.snapshot();
            match FileFormat::from_path(&out)? {
                FileFormat::Csv => {
                    let file = File::create(&out)
                        .with_context(|| format!("Failed to create: {}", out.display()))?;
                    export::write_csv(BufWriter::new(file), &snapshot.entries)
                        .with_context(|| format!("Failed to write CSV: {}", out.display()))?;
                }
                FileFormat::Json => {
                    let json = export::to_json(&snapshot).context("Failed to render JSON")?;
                    std::fs::write(&out, json)
                        .with_context(|| format!("Failed to write: {}", out.display()))?;
                }
            }
            info!(calculator_id = id, path = %out.display(), "Exported calculator");
            println!("Exported {} entries to {}", snapshot.entries.len(), out.display());
        }
        StoredCommand::Add { id } => {
            let mut session = open_session(repo, id).await?;
            let entry = session.add_entry();
            save_if_changed(&mut session, repo, id, Change::Modified).await?;
            println!("Added entry {entry}");
        }
        StoredCommand::Duplicate { id, entry } => {
            let mut session = open_session(repo, id).await?;
            let Some(copy) = session.duplicate_entry(&EntryId::new(entry.as_str())) else {
                bail!("No entry '{entry}' in calculator {id}");
            };
            save_if_changed(&mut session, repo, id, Change::Modified).await?;
            println!("Added copy {copy}");
        }
        StoredCommand::Delete { id, entry } => {
            let mut session = open_session(repo, id).await?;
            let change = session.delete_entry(&EntryId::new(entry.as_str()));
            if !change.is_modified() {
                bail!("No entry '{entry}' in calculator {id}");
            }
            save_if_changed(&mut session, repo, id, change).await?;
            print_summary(session.summary());
        }
        StoredCommand::Move { id, from, to } => {
            let mut session = open_session(repo, id).await?;
            let change = session.reorder(from, to);
            save_if_changed(&mut session, repo, id, change).await?;
            print_entries(session.entries().iter());
        }
        StoredCommand::Set {
            id,
            entry,
            field,
            value,
        } => {
            let field: EntryField = field.parse()?;
            let update = FieldUpdate::parse(field, &value)?;
            let entry_id = EntryId::new(entry.as_str());

            let mut session = open_session(repo, id).await?;
            if session.entries().get(&entry_id).is_none() {
                bail!("No entry '{entry}' in calculator {id}");
            }
            let change = session.update_field(&entry_id, update);
            save_if_changed(&mut session, repo, id, change).await?;
            if let Some(updated) = session.entries().get(&entry_id) {
                print_entries(std::iter::once(updated));
            }
            print_summary(session.summary());
        }
    }

    Ok(())
}

/// Loads a calculator into a session using the stored default settings.
async fn open_session(
    repo: &dyn CalculatorRepository,
    id: i64,
) -> Result<CalculatorSession> {
    let defaults = repo
        .get_default_settings()
        .await
        .context("Failed to read default settings (has the database been initialised?)")?;
    let calculator = repo
        .get_calculator(id)
        .await
        .with_context(|| format!("Failed to load calculator {id}"))?;

    let mut session = CalculatorSession::with_id_generator(defaults, UuidGenerator);
    session.load(calculator.snapshot());
    Ok(session)
}

async fn save_if_changed(
    session: &mut CalculatorSession,
    repo: &dyn CalculatorRepository,
    id: i64,
    change: Change,
) -> Result<()> {
    if !change.is_modified() || !session.is_dirty() {
        println!("Nothing changed.");
        return Ok(());
    }
    session
        .save(repo, id)
        .await
        .with_context(|| format!("Failed to save calculator {id}"))
}

fn read_entries(path: &Path) -> Result<Vec<LineItem>> {
    let format = FileFormat::from_path(path)?;
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let entries = EntryImporter::parse(format, file, &UuidGenerator)
        .with_context(|| format!("Failed to import: {}", path.display()))?;
    info!(path = %path.display(), rows = entries.len(), "Read entries");
    Ok(entries)
}

fn print_entries<'a>(entries: impl IntoIterator<Item = &'a LineItem>) {
    println!(
        "{:<36}  {:<8} {:<30} {:>8} {:>10} {:>6} {:>12} {:>12}",
        "id", "post", "beskrivelse", "antall", "materiell", "timer", "enhetspris", "sum"
    );
    for entry in entries {
        println!(
            "{:<36}  {:<8} {:<30} {:>8} {:>10} {:>6} {:>12} {:>12}",
            entry.id.as_str(),
            entry.post,
            entry.beskrivelse,
            entry.antall,
            entry.kost_materiell,
            entry.timer,
            entry.enhetspris,
            entry.sum
        );
    }
}

fn print_summary(summary: &Summary) {
    println!();
    println!("Total sum:            {:>12}", summary.total_sum);
    println!("Fortjeneste:          {:>12}", summary.fortjeneste);
    println!("Bidrag:               {:>11}%", summary.bidrag);
    println!("Timer totalt:         {:>12}", summary.timer_totalt);
    println!("Kostpris timer:       {:>12}", summary.total_kostpris_timer);
}
