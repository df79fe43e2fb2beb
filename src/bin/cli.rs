use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use shiva_picks::cappers::Capper;
use shiva_picks::config::AppConfig;
use shiva_picks::data::save_picks_to_csv;
use shiva_picks::factors::FactorRegistry;
use shiva_picks::grading::record_summary;
use shiva_picks::odds_api::OddsApiClient;
use shiva_picks::shiva::Decision;
use shiva_picks::store::{JsonFileStore, PickStore};
use shiva_picks::{
    build_shiva, fetch_slate, grade_stored_picks, load_capper_profiles, BetType, PickStatus,
};

#[derive(Parser)]
#[command(name = "shiva", about = "SHIVA NBA pick engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run cappers over the upcoming slate
    Run {
        /// Only this capper
        #[arg(long)]
        capper: Option<String>,
        #[arg(long, value_enum)]
        bet_type: Option<BetTypeArg>,
        /// Reuse cached odds instead of calling The Odds API
        #[arg(long)]
        use_cache: bool,
        /// Write the new picks to cache/picks.csv
        #[arg(long)]
        save_csv: bool,
    },
    /// List stored picks
    Picks {
        #[arg(long)]
        capper: Option<String>,
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        save_csv: bool,
    },
    /// Grade stored picks against final scores
    Grade {
        /// Game date (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List and validate capper profiles
    Cappers,
}

#[derive(Clone, Copy, ValueEnum)]
enum BetTypeArg {
    Total,
    Spread,
}

impl From<BetTypeArg> for BetType {
    fn from(arg: BetTypeArg) -> Self {
        match arg {
            BetTypeArg::Total => BetType::Total,
            BetTypeArg::Spread => BetType::Spread,
        }
    }
}

fn select_cappers(cappers: Vec<Capper>, id: Option<&str>) -> Result<Vec<Capper>> {
    match id {
        None => Ok(cappers),
        Some(id) => {
            let selected: Vec<Capper> = cappers.into_iter().filter(|c| c.id == id).collect();
            if selected.is_empty() {
                anyhow::bail!("No capper profile with id '{}'", id);
            }
            Ok(selected)
        }
    }
}

async fn run(
    config: &AppConfig,
    capper: Option<String>,
    bet_type: Option<BetType>,
    use_cache: bool,
    save_csv: bool,
) -> Result<()> {
    let shiva = build_shiva(config)?;
    let cappers = select_cappers(
        load_capper_profiles(config, shiva.registry())?,
        capper.as_deref(),
    )?;

    println!("Fetching NBA odds...\n");
    let slate = fetch_slate(config, use_cache).await?;
    if slate.is_empty() {
        println!("No upcoming NBA games with odds.");
        return Ok(());
    }
    println!("{} games on the slate\n", slate.len());

    let mut new_picks = Vec::new();
    for capper in &cappers {
        println!("{} ({})\n", capper.name, capper.id);

        let runs = match bet_type {
            Some(bet_type) => {
                let mut runs = Vec::new();
                for (game, market) in &slate {
                    match shiva.run_game(capper, bet_type, game, market).await {
                        Ok(run) => runs.push(run),
                        Err(e) => eprintln!("Error on {} @ {}: {:#}", game.away_team, game.home_team, e),
                    }
                }
                runs
            }
            None => shiva.run_slate(capper, &slate).await,
        };

        let picks_made = runs.iter().filter(|r| r.decision.is_pick()).count();
        if picks_made == 0 {
            println!("No picks. Passed on {} runs.", runs.len());
        }
        for run in &runs {
            if let Decision::Pass { reason } = &run.decision {
                tracing::debug!("PASS {} {}: {}", run.game_id, run.bet_type, reason);
            }
        }

        let stored = shiva.store().list_picks(Some(capper.id.as_str())).await?;
        let mut i = 0;
        for run in &runs {
            if let Decision::Pick { pick_id, .. } = &run.decision {
                if let Some(pick) = stored.iter().find(|p| p.id == *pick_id) {
                    i += 1;
                    println!("{}. [{}] {}", i, pick.bet_type, pick.format());
                    if let Some(insight) = &pick.insight {
                        println!("   {}", insight.replace('\n', "\n   "));
                    }
                    new_picks.push(pick.clone());
                }
            }
        }
        println!();
    }

    if save_csv && !new_picks.is_empty() {
        let csv_file = config.cache_dir.join("picks.csv");
        save_picks_to_csv(&new_picks, &csv_file)?;
        println!("Saved {} picks to {}", new_picks.len(), csv_file.display());
    }

    // Check API usage
    if !use_cache {
        println!();
        OddsApiClient::new(config.odds_api_key()?.to_string())
            .check_usage()
            .await?;
    }

    Ok(())
}

async fn picks(config: &AppConfig, capper: Option<String>, pending: bool, save_csv: bool) -> Result<()> {
    let store = JsonFileStore::new(&config.store_dir);
    let mut picks = store.list_picks(capper.as_deref()).await?;
    if pending {
        picks.retain(|p| p.status == PickStatus::Pending);
    }

    if picks.is_empty() {
        println!("No picks found.");
        return Ok(());
    }

    for (i, pick) in picks.iter().enumerate() {
        let result = match pick.profit_units {
            Some(profit) => format!("{:?} {:+.2}u", pick.status, profit),
            None => format!("{:?}", pick.status),
        };
        println!(
            "{}. {} [{}] {} | {}",
            i + 1,
            pick.commence_time.format("%Y-%m-%d"),
            pick.capper_id,
            pick.format(),
            result
        );
    }
    println!("\nRecord: {}", record_summary(&picks).format());

    if save_csv {
        let csv_file = config.cache_dir.join("picks.csv");
        save_picks_to_csv(&picks, &csv_file)?;
        println!("Saved picks to {}", csv_file.display());
    }
    Ok(())
}

async fn grade(config: &AppConfig, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive() - Duration::days(1));
    let store = JsonFileStore::new(&config.store_dir);

    println!("Grading picks for {}...\n", date);
    let graded = grade_stored_picks(config, &store, date)
        .await
        .context("Failed to grade picks")?;
    println!("Graded {} picks", graded);

    let picks = store.list_picks(None).await?;
    println!("Record: {}", record_summary(&picks).format());
    Ok(())
}

fn cappers(config: &AppConfig) -> Result<()> {
    let registry = FactorRegistry::with_defaults();
    let cappers = load_capper_profiles(config, &registry)?;

    for capper in &cappers {
        println!("{} ({}) - {}", capper.name, capper.id, capper.sport);
        for bet_type in capper.bet_types() {
            println!("  {}", bet_type);
            for w in capper.weights_for(bet_type)? {
                let name = registry
                    .get(capper.sport, bet_type, &w.key)
                    .map(|f| f.name())
                    .unwrap_or("?");
                println!("    {:<28} {:>5.1}%", name, w.weight);
            }
        }
        println!();
    }
    println!("{} capper profiles valid", cappers.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Command::Run {
            capper,
            bet_type,
            use_cache,
            save_csv,
        } => run(&config, capper, bet_type.map(BetType::from), use_cache, save_csv).await,
        Command::Picks {
            capper,
            pending,
            save_csv,
        } => picks(&config, capper, pending, save_csv).await,
        Command::Grade { date } => grade(&config, date).await,
        Command::Cappers => cappers(&config),
    }
}
