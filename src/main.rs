use chrono::Local;
use clap::Parser;

use mpexpenses::{job, Config, CsvDirSource, LogPoster, MemberCache, NoLookup, SqliteHistory};

/// Surface one notable parliamentary expense claim and post it.
///
/// Everything apart from `--force` is configured through `MPE_*`
/// environment variables; see the Config docs.
#[derive(Parser, Debug)]
#[command(name = "mpexpenses", version, about)]
struct Cli {
    /// Run even outside the daily posting window.
    #[arg(long)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let source = CsvDirSource::new(config.data_dir.clone());
    let mut history = SqliteHistory::open(&config.history_db)?;
    // The members API client plugs in here; without one, claims render
    // with the raw member id.
    let mut members = MemberCache::new(NoLookup);
    let mut rng = rand::thread_rng();

    let outcome = job::run(
        &config,
        &source,
        &mut history,
        &LogPoster,
        &mut members,
        &mut rng,
        cli.force,
        Local::now(),
    )?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
