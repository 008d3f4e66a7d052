use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::error;

use govpulse::analysis::{CampaignReport, CountryResult, FailurePolicy, Recommendation};
use govpulse::countries;
use govpulse::environment::AppConfig;
use govpulse::error::AnalysisError;
use govpulse::logging;
use govpulse::status::{check_status, ServiceState, ServiceStatus, StatusReport};
use govpulse::web::{app_api_loop, AppState};
use govpulse::SentimentPipeline;

#[derive(Parser)]
#[clap(
    name = "govpulse",
    about = "News sentiment toward national governments"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Print JSON instead of a summary
    #[clap(long, global = true)]
    json: bool,

    /// Maximum articles per search (overrides NEWS_MAX)
    #[clap(long, global = true)]
    max: Option<u32>,

    /// Search language (overrides NEWS_LANG)
    #[clap(long, global = true)]
    lang: Option<String>,

    /// Delay between calls in milliseconds (overrides PACE_DELAY_MS)
    #[clap(long, global = true)]
    pace_ms: Option<u64>,

    /// Keep going when a headline cannot be classified
    #[clap(long, global = true)]
    skip_failures: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one country
    Analyze {
        /// Country code, e.g. ID
        #[clap(required = true)]
        country: String,
    },

    /// Analyze several countries in order (defaults to CAMPAIGN_COUNTRIES)
    Campaign {
        /// Country codes
        countries: Vec<String>,
    },

    /// Check connectivity to the news search and classifier services
    Status,

    /// Run the HTTP server
    Serve {
        /// Port to listen on (overrides PORT)
        #[clap(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::configure_logging();

    let args = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(max) = args.max {
        config.max_articles = max;
    }
    if let Some(lang) = args.lang.clone() {
        config.lang = lang;
    }
    if let Some(pace_ms) = args.pace_ms {
        config.pace_delay = Duration::from_millis(pace_ms);
    }
    if args.skip_failures {
        config.failure_policy = FailurePolicy::Skip;
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
        }
        let _ = cancel_tx.send(true);
    });

    match args.command {
        Commands::Analyze { country } => {
            let pipeline = SentimentPipeline::from_config(&config)?;
            let mut cancel = cancel_rx;
            let outcome = tokio::select! {
                biased;
                _ = cancel.wait_for(|&stop| stop) => Err(AnalysisError::Cancelled),
                outcome = pipeline.analyze_country(&country) => outcome,
            };
            match outcome {
                Ok(result) => {
                    if args.json {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else {
                        print_result(&result);
                    }
                }
                Err(err) => {
                    if args.json {
                        println!("{}", serde_json::to_string_pretty(&err.report())?);
                    } else {
                        print_failure(&country, &err);
                    }
                    process::exit(1);
                }
            }
        }
        Commands::Campaign { countries } => {
            let pipeline = SentimentPipeline::from_config(&config)?;
            let codes = if countries.is_empty() {
                config.campaign_countries.clone()
            } else {
                countries
            };
            let report = pipeline.run_campaign(&codes, cancel_rx).await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_campaign(&report);
            }
            if report.results.is_empty() && !codes.is_empty() {
                process::exit(1);
            }
        }
        Commands::Status => {
            let report = check_status(&config).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let pipeline = SentimentPipeline::from_config(&config)?;
            app_api_loop(Arc::new(AppState { pipeline, config })).await?;
        }
    }

    Ok(())
}

fn print_result(result: &CountryResult) {
    println!("\n{}", "═".repeat(80).bright_blue());
    println!(
        "{}  {}",
        countries::display_name(&result.country_code).bright_blue(),
        result.country_code.bright_yellow()
    );
    println!("{}", "═".repeat(80).bright_blue());

    for (i, classified) in result.articles.iter().enumerate() {
        let label = match &classified.sentiment {
            Some(sentiment) => sentiment.to_string(),
            None => "unclassified".to_string(),
        };
        let score = classified
            .confidence
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>2}. {} {}",
            i + 1,
            classified.article.title,
            format!("[{} {}]", label, score).dimmed()
        );
    }

    println!("{}", "─".repeat(80).dimmed());
    println!(
        "{}: {}  {}: {}  {}: {}  {}: {}",
        "Positive".bright_green(),
        result.tally.positive,
        "Neutral".bright_white(),
        result.tally.neutral,
        "Negative".bright_red(),
        result.tally.negative,
        "Unclassified".dimmed(),
        result.unclassified
    );
    println!(
        "{}: {} ({} articles via {})",
        "Recommendation".bright_blue(),
        colored_recommendation(result.recommendation),
        result.total_articles,
        result.strategy
    );
}

fn colored_recommendation(recommendation: Recommendation) -> colored::ColoredString {
    let text = recommendation.to_string();
    match recommendation {
        Recommendation::Positive => text.bright_green(),
        Recommendation::Negative => text.bright_red(),
        Recommendation::Neutral => text.bright_yellow(),
    }
}

fn print_failure(country: &str, err: &AnalysisError) {
    println!(
        "{} {} failed at {}: {}",
        "✗".bright_red(),
        country.bright_yellow(),
        err.step(),
        err
    );
    for cause in err.report().causes {
        println!(
            "    {} {}: {}",
            cause.strategy.bright_magenta(),
            cause.kind.dimmed(),
            cause.message
        );
    }
}

fn print_campaign(report: &CampaignReport) {
    for result in &report.results {
        print_result(result);
    }
    if !report.failures.is_empty() {
        println!("\n{}", "Failed countries".bright_red());
        println!("{}", "─".repeat(80).dimmed());
        for failure in &report.failures {
            print_failure(&failure.country_code, &failure.error);
        }
    }
    println!(
        "\n{}: {} succeeded, {} failed{}",
        "Campaign".bright_blue(),
        report.results.len(),
        report.failures.len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
}

fn print_status(report: &StatusReport) {
    print_service("News search", &report.news);
    print_service("Classifier", &report.classifier);
}

fn print_service(name: &str, status: &ServiceStatus) {
    let state = format!("{:?}", status.status);
    let state = match status.status {
        ServiceState::Connected => state.bright_green(),
        ServiceState::Loading => state.bright_yellow(),
        ServiceState::Error | ServiceState::NoKey => state.bright_red(),
    };
    println!("{}: {} {}", name.bright_blue(), state, status.message);
}
