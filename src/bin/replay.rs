use anyhow::{Context, Result, bail};
use clap::Parser;
use fvgchart::application::market_data::candle_aggregator::CandleAggregator;
use fvgchart::application::market_data::continuity::ContinuityChecker;
use fvgchart::application::playback::{ChannelSink, PlaybackDriver};
use fvgchart::config::ReplayConfig;
use fvgchart::domain::market::candle::{Candle, ChartBar, UpdateKind};
use fvgchart::domain::market::fvg::FvgDetector;
use fvgchart::domain::market::timeframe::Timeframe;
use fvgchart::infrastructure::csv_data::CsvCandleSource;
use fvgchart::infrastructure::synthetic::SyntheticFeed;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replay an M1 candle history through the multi-timeframe aggregator.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file with M1 candles (Date,Time,Open,High,Low,Close,Volume)
    #[arg(long, conflicts_with = "synthetic")]
    file: Option<PathBuf>,

    /// Generate this many synthetic M1 bars instead of reading a file
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for the synthetic feed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Timeframe for --json and --fvg output (M1, M5, M15, H1, H4, D1)
    #[arg(long, default_value = "M15")]
    timeframe: String,

    /// Emit chart updates for the chosen timeframe as NDJSON on stdout
    #[arg(long)]
    json: bool,

    /// Detect fair value gaps on the chosen timeframe after playback
    #[arg(long)]
    fvg: bool,

    /// Run a continuity check on the M1 input before playback
    #[arg(long)]
    check: bool,

    /// Milliseconds between bars (overrides FVG_PLAYBACK_INTERVAL_MS)
    #[arg(long)]
    interval_ms: Option<u64>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = ReplayConfig::from_env()?;
    let timeframe = Timeframe::from_str(&cli.timeframe)?;

    let candles = load_feed(&cli)?;
    let first = candles.first().expect("load_feed never returns empty");

    // Derive the session calendar from the first bar's date, the way the
    // backend stamps each session's timezone descriptor.
    let session_date = chrono::DateTime::from_timestamp(first.time, 0)
        .context("first candle timestamp out of range")?
        .date_naive();
    let calendar = config.calendar_for(session_date);
    info!(
        bars = candles.len(),
        ny_offset = calendar.offset_hours(),
        "session loaded"
    );

    if cli.check {
        let report = ContinuityChecker::new(calendar).check(&candles, Timeframe::M1);
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.is_continuous() {
            info!(
                missing = report.missing_total(),
                gaps = report.data_gaps.len(),
                "input has data gaps"
            );
        }
    }

    let mut aggregator = CandleAggregator::new(calendar);
    aggregator.set_fill_intraday_gaps(config.gap_fill);
    let mut driver = PlaybackDriver::new(aggregator, candles);

    let interval = cli.interval_ms.unwrap_or(config.playback_interval_ms);
    if interval > 0 {
        driver = driver.with_pacing(Duration::from_millis(interval));
    }

    let json_rx = cli.json.then(|| {
        let (tx, rx) = crossbeam_channel::unbounded();
        driver.add_sink(Arc::new(ChannelSink::new(tx)));
        rx
    });

    driver.run_to_end();

    if let Some(rx) = json_rx {
        for (tf, update) in rx.try_iter() {
            if tf != timeframe {
                continue;
            }
            let kind = match update.kind {
                UpdateKind::New => "new",
                UpdateKind::Update => "update",
            };
            let line = serde_json::json!({
                "timeframe": tf.label(),
                "kind": kind,
                "candle": ChartBar::from(&update.candle),
            });
            println!("{line}");
        }
    }

    for tf in Timeframe::all() {
        let agg = driver.aggregator();
        info!(
            timeframe = %tf,
            completed = agg.completed_candles(tf).len(),
            open = agg.open_candle(tf).is_some(),
            "series summary"
        );
    }

    if cli.fvg {
        let series = driver.aggregator().get_all_candles(timeframe);
        let gaps = FvgDetector::new(config.clearing_window).detect(&series, timeframe);
        let cleared = gaps.iter().filter(|g| g.is_cleared()).count();
        info!(
            timeframe = %timeframe,
            detected = gaps.len(),
            cleared,
            valid = gaps.len() - cleared,
            "fair value gaps"
        );
        for gap in &gaps {
            println!("{}", serde_json::to_string(gap)?);
        }
    }

    Ok(())
}

fn load_feed(cli: &Cli) -> Result<Vec<Candle>> {
    if let Some(path) = &cli.file {
        let candles = CsvCandleSource::new(path)
            .load()
            .with_context(|| format!("loading {}", path.display()))?;
        return Ok(candles);
    }
    if let Some(bars) = cli.synthetic {
        if bars == 0 {
            bail!("--synthetic needs at least 1 bar");
        }
        // Synthetic sessions start on a fixed mid-week anchor so runs with the
        // same seed are reproducible.
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 3)
            .expect("valid anchor date")
            .and_hms_opt(8, 0, 0)
            .expect("valid anchor time")
            .and_utc()
            .timestamp();
        return Ok(SyntheticFeed::new(start, 1.1000).with_seed(cli.seed).generate(bars));
    }
    bail!("either --file or --synthetic is required");
}
