// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

mod database;
mod import;
mod server;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
struct Args {
    /// Path to the SQLite database; defaults to a file in the user data
    /// directory.
    #[arg(long)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    ImportIngredients {
        path: PathBuf,
    },
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

/// This is where the database and other user-data lives on-disk. On Linux it
/// should be like: `~/.local/share/foodgram/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().expect("failed to get user home directory");
    let path = dirs.data_dir().join("foodgram");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let args = Args::parse();
    let database_path = match args.database {
        Some(path) => path,
        None => data_path()?.join("data.sqlite"),
    };
    let pool = database::establish_pool(database_path)?;

    match args.commands {
        Commands::ImportIngredients { path } => {
            import::import_ingredients(&mut *pool.get()?, path)?
        }
        Commands::Serve { port } => server::serve(pool, port).await?,
    }
    Ok(())
}
