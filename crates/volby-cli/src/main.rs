use std::fs::File;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use volby::report::{build_report, write_csv};
use volby::{INDEX_URL_PREFIX, WebScraper};

#[derive(Parser)]
#[command(name = "volby")]
#[command(about = "Scrapes 2017 parliamentary election results from volby.cz into CSV", long_about = None)]
struct Cli {
    #[arg(
        value_parser = parse_index_url,
        help = "URL of a territorial-unit results page (ps32...)"
    )]
    url: String,

    #[arg(
        value_parser = parse_output_path,
        help = "Output CSV file path"
    )]
    output: PathBuf,

    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn parse_index_url(s: &str) -> Result<String, String> {
    if s.starts_with(INDEX_URL_PREFIX) {
        Ok(s.to_string())
    } else {
        Err(format!(
            "must be a territorial-unit results page starting with {INDEX_URL_PREFIX}"
        ))
    }
}

fn parse_output_path(s: &str) -> Result<PathBuf, String> {
    if s.ends_with(".csv") {
        Ok(PathBuf::from(s))
    } else {
        Err("output file must have a .csv extension".to_string())
    }
}

#[tokio::main]
async fn main() {
    // Argument errors must exit with status 1; clap's default is 2.
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            let _ = e.print();
            process::exit(1);
        }
        // --help and --version
        e.exit();
    });

    env_logger::Builder::new()
        .filter_level(cli.log_level.into())
        .init();

    let scraper = WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    log::info!("Fetching municipality list from {}...", cli.url);
    let municipalities = scraper.fetch_index(&cli.url).await.unwrap_or_else(|e| {
        log::error!("Error fetching municipality list: {}", e);
        process::exit(1);
    });
    println!("Found {} municipalities", municipalities.len());

    let report = build_report(&scraper, &municipalities).await;

    let file = File::create(&cli.output).unwrap_or_else(|e| {
        log::error!("Error creating {}: {}", cli.output.display(), e);
        process::exit(1);
    });
    write_csv(&report, file).unwrap_or_else(|e| {
        log::error!("Error writing {}: {}", cli.output.display(), e);
        process::exit(1);
    });

    println!("Done. Results saved to: {}", cli.output.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_ps32_index_urls() {
        assert!(parse_index_url("https://www.volby.cz/pls/ps2017nss/ps32?xjazyk=CZ").is_ok());
        assert!(parse_index_url("https://example.com/ps32").is_err());
        assert!(parse_index_url("https://www.volby.cz/pls/ps2017nss/ps311?xobec=1").is_err());
    }

    #[test]
    fn requires_a_csv_output_path() {
        assert!(parse_output_path("results.csv").is_ok());
        assert!(parse_output_path("results.txt").is_err());
        assert!(parse_output_path("results").is_err());
    }
}
