mod db;
mod dom;
mod error;
mod fetch;
mod markdown;
mod parser;
mod records;
mod text;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "archivio_scraper",
    about = "Structured Pathfinder 2e records from the Archivio dei Cercatori"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one category (or all) into the records table
    Scrape {
        #[arg(value_enum, default_value = "all")]
        category: Category,
    },
    /// Write one JSON array per category
    Export {
        /// Output directory
        #[arg(short, long, default_value = "data/export")]
        out: PathBuf,
    },
    /// Show cache and record counts
    Stats,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Category {
    Conditions,
    Actions,
    Spells,
    Traits,
    All,
}

impl Category {
    fn includes(self, other: Category) -> bool {
        self == Category::All || self == other
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape { category } => scrape(category).await,
        Commands::Export { out } => export(&out),
        Commands::Stats => stats(),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn scrape(category: Category) -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;
    let tables = parser::Tables::default();
    let cache = fetch::PageCache::new(&conn);

    if category.includes(Category::Conditions) {
        let items = records::conditions::generate(&cache, &tables).await?;
        let saved = db::save_records(&conn, "conditions", &rows(&items, |r| &r.id, |r| &r.name)?)?;
        println!("Saved {} conditions.", saved);
    }
    if category.includes(Category::Actions) {
        let items = records::actions::generate(&cache, &tables).await?;
        let saved = db::save_records(&conn, "actions", &rows(&items, |r| r.id(), |r| r.name())?)?;
        println!("Saved {} actions.", saved);
    }
    if category.includes(Category::Spells) {
        let items = records::spells::generate(&cache, &tables).await?;
        let saved = db::save_records(&conn, "spells", &rows(&items, |r| &r.id, |r| &r.name)?)?;
        println!("Saved {} spells.", saved);
    }
    if category.includes(Category::Traits) {
        let items = records::traits::generate(&cache, &tables).await?;
        let saved = db::save_records(&conn, "traits", &rows(&items, |r| &r.id, |r| &r.name)?)?;
        println!("Saved {} traits.", saved);
    }

    Ok(())
}

fn rows<T: serde::Serialize>(
    items: &[T],
    id: impl for<'a> Fn(&'a T) -> &'a str,
    name: impl for<'a> Fn(&'a T) -> &'a str,
) -> anyhow::Result<Vec<db::RecordRow>> {
    items
        .iter()
        .map(|item| {
            Ok(db::RecordRow {
                id: id(item).to_string(),
                name: name(item).to_string(),
                data: serde_json::to_string(item)?,
            })
        })
        .collect()
}

fn export(out: &Path) -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;
    std::fs::create_dir_all(out)?;

    for category in ["conditions", "actions", "spells", "traits"] {
        let stored = db::load_records(&conn, category)?;
        let values: Vec<serde_json::Value> = stored
            .iter()
            .map(|r| serde_json::from_str(&r.data))
            .collect::<Result<_, _>>()?;
        let path = out.join(format!("{}.json", category));
        std::fs::write(&path, serde_json::to_string_pretty(&values)?)?;
        println!("Wrote {} {} to {}", values.len(), category, path.display());
    }

    Ok(())
}

fn stats() -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;
    let s = db::get_stats(&conn)?;

    println!("Cached pages: {}", s.cached_pages);
    if s.per_category.is_empty() {
        println!("No records yet. Run 'scrape' first.");
        return Ok(());
    }
    for (category, count) in &s.per_category {
        println!("{:<12} {}", category, count);
    }

    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
