use std::io::{self, Write};

use chrono::{Duration, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mention_scanner::config::Config;
use mention_scanner::error::{AppError, Result};
use mention_scanner::types::{AddressReport, ImpactSummary};
use mention_scanner::{impact, market, mentions, timeline};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    match run(cfg).await {
        Ok(()) => {}
        Err(AppError::Auth(msg)) => {
            eprintln!("Authentication failure: {msg}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cfg: Config) -> Result<()> {
    let username = prompt_line("Enter the username (without @): ")?;
    let hours = prompt_hours()?;

    let client = timeline::build_client()?;
    let start_time = Utc::now() - Duration::hours(hours);

    let user_id = match timeline::resolve_user(&client, &cfg, &username).await {
        Ok(id) => id,
        Err(AppError::UserNotFound(name)) => {
            println!("User @{name} not found.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("Fetching posts for @{username} within the last {hours} hours...");
    let (posts, _stats) =
        timeline::fetch_recent_posts(&client, &cfg, &username, &user_id, start_time).await;

    if posts.is_empty() {
        println!("No posts found for @{username} in the last {hours} hours (or API access is limited).");
        return Ok(());
    }

    println!("Found {} posts. Scanning for Solana addresses...", posts.len());
    let records = mentions::build_mention_index(&posts);

    if records.is_empty() {
        println!("No Solana contract addresses found in posts by @{username} in the last {hours} hours.");
        return Ok(());
    }

    println!(
        "\nFound {} unique Solana contract addresses in posts by @{username}:",
        records.len()
    );
    println!("{}", "-".repeat(100));
    println!("{:<25} {:<45} Post Text Preview", "Timestamp", "Contract Address");
    println!("{}", "-".repeat(100));
    for record in &records {
        println!(
            "{:<25} {:<45} {}",
            record.earliest_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.address,
            truncate(&record.source_text.replace('\n', " "), 50),
        );
    }

    if !prompt_yes_no("\nDo you want to query swap data for these addresses? (y/n): ")? {
        return Ok(());
    }

    let analytics_client = market::build_client()?;
    let reports = market::collect_reports(&analytics_client, &cfg, &records).await?;
    info!("Market phase complete: {} addresses queried", reports.len());

    for report in &reports {
        print_report(report);
    }

    Ok(())
}

fn print_report(report: &AddressReport) {
    println!("\n{}", "=".repeat(65));
    println!("Address: {}", report.address);
    println!(
        "First mentioned: {}",
        report.mentioned_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if report.rows.is_empty() {
        println!("No swap data found in the queried window.");
        return;
    }

    println!("\n{:<22} {:<10} {:<16} Swaps", "Hour", "Symbol", "Price (USD)");
    println!("{}", "-".repeat(65));
    for row in &report.rows {
        println!(
            "{:<22} {:<10} ${:<15.6} {}",
            row.hour.format("%Y-%m-%d %H:%M"),
            row.token_symbol.as_deref().unwrap_or("Unknown"),
            row.avg_price_usd,
            row.swap_count,
        );
    }

    match impact::analyze(report) {
        Some(summary) => print_impact(&summary),
        None => println!("\nNo pre-mention price data — impact not computed."),
    }
}

fn print_impact(summary: &ImpactSummary) {
    println!("\nImpact around the first mention:");
    println!("  price before:        ${:.6}", summary.price_before);
    println!(
        "  first hour after:    {}",
        format_price(summary.price_at_first_post_after)
    );
    println!(
        "  latest in window:    {}",
        format_price(summary.price_latest_in_window)
    );
    println!("  short-term change:   {}", format_pct(summary.pct_change_short));
    println!("  window change:       {}", format_pct(summary.pct_change_long));
}

fn format_price(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |p| format!("${p:.6}"))
}

fn format_pct(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |p| format!("{p:+.2}%"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Timeframe in hours, 1–24 inclusive, re-prompting on invalid input.
fn prompt_hours() -> Result<i64> {
    loop {
        let line = prompt_line("Enter the timeframe in hours (1-24): ")?;
        match line.parse::<i64>() {
            Ok(h) if (1..=24).contains(&h) => return Ok(h),
            Ok(_) => println!("Invalid timeframe. Please enter a number between 1 and 24."),
            Err(_) => println!("Please enter a valid number."),
        }
    }
}

fn prompt_yes_no(prompt: &str) -> Result<bool> {
    let answer = prompt_line(prompt)?;
    Ok(answer.eq_ignore_ascii_case("y"))
}
