use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use showreel_recommender::engine::Recommender;
use showreel_recommender::models::Query;
use showreel_recommender::ranges::budget_bucket_from_text;
use showreel_recommender::store::{create_store, load_all, load_catalog};
use showreel_recommender::Config;

fn cli() -> Command {
    let command = Command::new("showreel")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Tag-based showreel video recommendations")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to showreel.toml lookup)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("recommend")
                .about("Run one recommendation and print the result as JSON")
                .arg(list_arg("objective", "Declared objective id"))
                .arg(list_arg("audience", "Declared audience id"))
                .arg(
                    Arg::new("budget")
                        .long("budget")
                        .value_name("BUCKET")
                        .help("Budget bucket, e.g. 5000-10000"),
                )
                .arg(
                    Arg::new("budget-text")
                        .long("budget-text")
                        .value_name("TEXT")
                        .conflicts_with("budget")
                        .help("Free-text budget mention, e.g. \"autour de 8 000 €\""),
                )
                .arg(list_arg("duration", "Duration bucket id"))
                .arg(
                    Arg::new("description")
                        .short('d')
                        .long("description")
                        .value_name("TEXT")
                        .help("Project description"),
                )
                .arg(list_arg("exclude", "Video id to exclude"))
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("NUM")
                        .value_parser(clap::value_parser!(i64))
                        .help("Number of results (1-12)"),
                )
                .arg(
                    Arg::new("debug")
                        .long("debug")
                        .help("Include the debug payload")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("stats").about("Print catalog statistics"));

    #[cfg(feature = "api")]
    let command = command.subcommand(
        Command::new("serve").about("Start the HTTP API").arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Listening port"),
        ),
    );

    command
}

fn list_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("ID")
        .help(help)
        .action(ArgAction::Append)
}

fn values(matches: &ArgMatches, name: &str) -> Vec<String> {
    matches
        .get_many::<String>(name)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("showreel_recommender={},showreel={},warn", level, level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    config.validate()?;
    Ok(config)
}

fn build_query(matches: &ArgMatches, config: &Config) -> Result<Query> {
    let budget = match matches.get_one::<String>("budget-text") {
        Some(text) => Some(
            budget_bucket_from_text(text)
                .ok_or_else(|| anyhow!("No amount found in budget text: {}", text))?
                .to_string(),
        ),
        None => matches.get_one::<String>("budget").cloned(),
    };

    let mut query = Query::new()
        .with_objectives(values(matches, "objective"))
        .with_audiences(values(matches, "audience"))
        .with_durations(values(matches, "duration"))
        .excluding(values(matches, "exclude"))
        .with_limit(
            matches
                .get_one::<i64>("limit")
                .copied()
                .unwrap_or(config.recommend.default_limit as i64),
        );

    if let Some(description) = matches.get_one::<String>("description") {
        query = query.with_description(description.clone());
    }
    if let Some(budget) = budget {
        query = query.with_budget(budget);
    }
    Ok(query)
}

async fn run_recommend(matches: &ArgMatches, config: &Config) -> Result<()> {
    let query = build_query(matches, config)?;
    let store = create_store(&config.store)?;
    let (catalog, settings) = load_all(store.as_ref()).await?;

    let recommender = Recommender::from_config(config).await;
    let recommendation = recommender.recommend(&catalog, &query, &settings).await;

    let include_debug = matches.get_flag("debug") || config.server.debug_payload;
    let mut output = serde_json::json!({ "videos": recommendation.videos });
    if include_debug {
        output["debug"] = serde_json::to_value(&recommendation.debug)?;
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_stats(config: &Config) -> Result<()> {
    let store = create_store(&config.store)?;
    let catalog = load_catalog(store.as_ref()).await?;
    let stats = catalog.stats();
    stats.log();
    println!("{}", stats.summary());
    println!("Keyword vocabulary: {} labels", catalog.keyword_vocabulary().len());
    Ok(())
}

#[cfg(feature = "api")]
async fn run_serve(matches: &ArgMatches, mut config: Config) -> Result<()> {
    use showreel_recommender::api::ApiServer;
    use std::sync::Arc;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let store = create_store(&config.store)?;
    let recommender = Recommender::from_config(&config).await;
    ApiServer::new(store, recommender, Arc::new(config)).start().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    init_logging(&config, matches.get_flag("verbose"));

    info!("🚀 Showreel recommender starting...");
    info!("{}", config.summary());
    if config.keywords.enable_extraction && config.llm.api_key.is_none() && config.llm.endpoint.is_none() {
        warn!("No LLM credentials configured, keyword extraction will fall back to substring matching");
    }

    match matches.subcommand() {
        Some(("recommend", sub)) => run_recommend(sub, &config).await,
        Some(("stats", _)) => run_stats(&config).await,
        #[cfg(feature = "api")]
        Some(("serve", sub)) => run_serve(sub, config).await,
        Some((other, _)) => Err(anyhow!("Unknown command: {}", other)),
        None => Err(anyhow!("No command given")),
    }
}
