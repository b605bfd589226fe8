// Price Sync - Import CLI
// Reads the catalog literal out of calc.html and upserts it into the store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use price_sync::import::prepare_records;
use price_sync::{
    persist_records, resolve_project, DocumentStore, FirestoreConfig, FirestoreStore,
    ImportOptions, MemoryStore, SqliteStore, PRICE_COLLECTION, WRITE_BATCH_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// Remote document store (REST API or local emulator)
    Firestore,
    /// Local SQLite file
    Sqlite,
    /// In-memory dry run; nothing is persisted
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "price-import", version)]
#[command(about = "Import the price catalog from calc.html into the document store", long_about = None)]
struct Args {
    /// Target project (falls back to FIREBASE_PROJECT_ID, then GCLOUD_PROJECT)
    #[arg(long)]
    project: Option<String>,

    /// HTML file containing `const catalogData = [...]`
    #[arg(long, default_value = "calc.html")]
    source: PathBuf,

    /// Delete every existing document in the collection before writing
    #[arg(long)]
    clear: bool,

    #[arg(long, value_enum, default_value_t = StoreKind::Firestore)]
    store: StoreKind,

    /// SQLite file used with `--store sqlite`
    #[arg(long, default_value = "prices.db")]
    database: PathBuf,

    #[arg(long, default_value = PRICE_COLLECTION)]
    collection: String,

    /// Writes per commit (1-500)
    #[arg(long, default_value_t = WRITE_BATCH_SIZE)]
    batch_size: usize,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_store(args: &Args) -> Result<Box<dyn DocumentStore>> {
    let store: Box<dyn DocumentStore> = match args.store {
        StoreKind::Firestore => {
            let config = FirestoreConfig::from_env(args.project.clone())
                .context("store configuration")?;
            println!("✓ Project: {}", config.project_id);
            if let Some(host) = &config.emulator_host {
                println!("✓ Using emulator at {}", host);
            }
            Box::new(FirestoreStore::new(&config)?)
        }
        StoreKind::Sqlite => {
            let store = SqliteStore::open(&args.database)
                .with_context(|| format!("opening {}", args.database.display()))?;
            println!("✓ Database opened with WAL mode: {}", args.database.display());
            Box::new(store)
        }
        StoreKind::Memory => {
            if let Some(project) = resolve_project(args.project.clone(), |k| std::env::var(k).ok()) {
                println!("✓ Dry run (project {} is not touched)", project);
            } else {
                println!("✓ Dry run");
            }
            Box::new(MemoryStore::new())
        }
    };
    Ok(store)
}

fn run(args: &Args) -> Result<()> {
    println!("📥 Price Import - {} → {}", args.source.display(), args.collection);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Connect
    println!("\n🔧 Opening store...");
    let mut store = open_store(args)?;

    let mut options = ImportOptions::new(&args.source);
    options.collection = args.collection.clone();
    options.persist.clear = args.clear;
    options.persist.batch_size = args.batch_size;

    // 2. Parse (nothing is written if this fails)
    println!("\n📂 Reading catalog from {}", args.source.display());
    let (records, digest) = prepare_records(&options)?;
    println!("✓ Parsed items: {}", records.len());
    println!("✓ Source digest: {}", &digest[..12]);

    // 3. Persist
    if options.persist.clear {
        println!("\n🧹 Clearing existing {} ...", options.collection);
    }
    println!("\n💾 Writing {} ...", options.collection);
    let report = persist_records(store.as_mut(), &options.collection, &records, &options.persist)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if report.deleted > 0 {
        println!("✓ Deleted: {}", report.deleted);
    }
    println!(
        "✅ Done: wrote {}/{} in {} batches",
        report.written,
        records.len(),
        report.batches
    );

    Ok(())
}

fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("\n❌ [import] FAILED: {:#}", e);
        eprintln!("\nTips:");
        eprintln!("- Set FIRESTORE_ACCESS_TOKEN (e.g. `gcloud auth print-access-token`) or FIRESTORE_EMULATOR_HOST");
        eprintln!("- Ensure Firestore is enabled for the project");
        eprintln!("- Ensure you are importing into the correct project (--project or FIREBASE_PROJECT_ID)");
        eprintln!("- Use --store memory for a dry run that only parses and counts");
        std::process::exit(1);
    }
}
