use clap::{Arg, Command};
use std::process;
use tracing::{error, info};
use truck_etl::utils::logging::{LogConfig, init_tracing};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing(LogConfig::from_env());

    let matches = Command::new("Truck ETL")
        .version("1.0")
        .about("Loads truck transaction files from S3 into the warehouse")
        .subcommand(
            Command::new("run")
                .about("Run the ETL pipeline once")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let config_path = run_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/etl.toml");
            info!(config = config_path, "Starting ETL pipeline");

            match truck_etl::run_etl_pipeline(config_path).await {
                Ok(summary) => info!(
                    eligible = summary.eligible,
                    rows_merged = summary.rows_merged,
                    inserted = summary.load.map(|l| l.inserted).unwrap_or(0),
                    "ETL pipeline completed"
                ),
                Err(e) => {
                    error!(error = %e, "ETL pipeline error");
                    process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("Please specify a valid subcommand");
            process::exit(1);
        }
    }
}
