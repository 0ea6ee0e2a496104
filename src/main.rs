mod cli;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use ftpdu::{Connection, FtpConfig, FtpConnection, Report};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when it is set and parses, `ftpdu=info` otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("ftpdu=info"))
}

fn main() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = FtpConfig {
        port:    cli.port,
        timeout: (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout)),
    };

    let mut ftp = FtpConnection::connect(&cli.host, &config)
        .with_context(|| format!("connect {}:{}", cli.host, cli.port))?;
    ftp.login(&cli.user, &cli.password)
        .with_context(|| format!("log in as {}", cli.user))?;
    println!("{}", ftp.welcome());

    let outcome = run(&cli, &mut ftp);

    if let Err(e) = ftp.close() {
        tracing::warn!("QUIT failed: {}", e);
    }

    let report = outcome?;
    print_report(&report, cli.human);
    Ok(())
}

fn run(cli: &Cli, ftp: &mut FtpConnection) -> Result<Report> {
    ftp.change_directory(&cli.path)
        .with_context(|| format!("change directory to {}", cli.path))?;
    let parent = ftp.current_path().context("read working directory")?;
    println!("\n{parent}");

    let builder = ftpdu::estimate()
        .max_depth(cli.max_depth)
        .unexplored_estimate(cli.unexplored_estimate)
        .skipping(cli.skip.iter().cloned())
        .directory_sentinel(cli.dir_sentinel.clone());

    let report = match &cli.listing {
        Some(file) => {
            let names = read_listing(file)?;
            tracing::info!("estimating {} listed names in {}", names.len(), parent);
            builder.listing(ftp, &names, &parent)?
        }
        None => builder.subtree(ftp, "", &parent)?,
    };

    Ok(report)
}

/// One name per line; blank lines and repeats are dropped.
fn read_listing(file: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("read listing {}", file.display()))?;

    let mut seen = HashSet::new();
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect())
}

fn print_report(report: &Report, human: bool) {
    let total = if human {
        format_size(report.total_bytes)
    } else {
        format!("{} Bytes", report.total_bytes)
    };

    if report.is_approximate() {
        println!("~{total} (approximate)");
    } else {
        println!("{total}");
    }

    if report.stats.cutoffs > 0 {
        println!(
            "  {} director{} past the depth limit estimated",
            report.stats.cutoffs,
            if report.stats.cutoffs == 1 { "y" } else { "ies" }
        );
    }

    if !report.problems.is_empty() {
        println!("  Skipped ({}):", report.problems.len());
        for problem in &report.problems {
            match problem.path() {
                Some(path) => println!("    {path}"),
                None => println!("    {problem}"),
            }
        }
    }

    tracing::debug!(
        "{} files, {} dirs in {:.2}s",
        report.stats.files,
        report.stats.dirs,
        report.stats.duration.as_secs_f64()
    );
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins_over_the_default_level() {
        let filter = log_filter(Some("ftpdu=debug")).to_string().to_lowercase();
        assert!(filter.contains("ftpdu=debug"), "{filter}");
        assert!(!filter.contains("ftpdu=info"), "{filter}");

        let quiet = log_filter(Some("ftpdu=warn")).to_string().to_lowercase();
        assert!(!quiet.contains("info"), "{quiet}");
    }

    #[test]
    fn default_level_without_rust_log() {
        for unset in [None, Some(""), Some("  ")] {
            let filter = log_filter(unset).to_string().to_lowercase();
            assert!(filter.contains("ftpdu=info"), "{filter}");
        }
    }

    #[test]
    fn format_size_picks_a_unit() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
