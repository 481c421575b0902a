// src/bin/cli.rs
//
//! CLI for exercising windowed histograms and top trackers.
//!
//! Examples:
//! ```bash
//! hdrwin-cli stress --threads 8 --duration 30s --interval 2s --policy periodic --period 10s
//! hdrwin-cli stress --cache-ttl 500ms --top 3 --highest 5000000 --overflow reduce-to-highest-trackable -v
//! hdrwin-cli footprint --digits 3 --highest 60000000000
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rand::Rng;
use std::io::{self, ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use hdrwin::api::{
    HdrBuilder, HistogramConfig, OverflowResolver, ResetPolicy, SnapshotSource, TopBuilder, TopConfig, WindowCounter,
};

/// Print to stdout, exiting quietly when the pipe is closed (e.g. `| head`)
macro_rules! safe_println {
    ($($arg:tt)*) => {
        match writeln!(io::stdout(), $($arg)*) {
            Ok(_) => {},
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                std::process::exit(0);
            }
            Err(e) => return Err(e.into())
        }
    };
}

/// Reset policy as chosen on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    OnSnapshot,
    Periodic,
    Never,
}

impl PolicyKind {
    fn into_policy(self, period: Duration) -> ResetPolicy {
        match self {
            PolicyKind::OnSnapshot => ResetPolicy::OnSnapshot,
            PolicyKind::Periodic => ResetPolicy::Periodically(period),
            PolicyKind::Never => ResetPolicy::Never,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record random latencies from many threads and poll windowed snapshots.
    Stress {
        /// Writer threads (defaults to the number of CPUs)
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// How long to run
        #[arg(short = 'd', long, value_parser = humantime::parse_duration, default_value = "10s")]
        duration: Duration,

        /// Delay between snapshots
        #[arg(short = 'i', long, value_parser = humantime::parse_duration, default_value = "1s")]
        interval: Duration,

        /// When histograms, counters and top trackers are cleared
        #[arg(long, value_enum, default_value_t = PolicyKind::OnSnapshot)]
        policy: PolicyKind,

        /// Window length for --policy periodic
        #[arg(short = 'p', long, value_parser = humantime::parse_duration, default_value = "5s")]
        period: Duration,

        /// Memoize snapshots for this long
        #[arg(long, value_parser = humantime::parse_duration)]
        cache_ttl: Option<Duration>,

        /// Slowest operations to keep
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Upper bound of the generated latencies, in microseconds
        #[arg(long, default_value_t = 10_000)]
        max_latency_us: u64,

        /// Highest trackable latency, in nanoseconds
        #[arg(long)]
        highest: Option<u64>,

        /// What to do with latencies above --highest
        #[arg(long, value_enum, default_value_t = OverflowResolver::Skip)]
        overflow: OverflowResolver,
    },

    /// Print the estimated memory footprint of one reservoir.
    Footprint {
        /// Significant value digits
        #[arg(long, default_value_t = 2)]
        digits: u8,

        /// Lowest discernible value
        #[arg(long)]
        lowest: Option<u64>,

        /// Highest trackable value
        #[arg(long)]
        highest: Option<u64>,

        /// What to do with values above --highest
        #[arg(long, value_enum, default_value_t = OverflowResolver::Skip)]
        overflow: OverflowResolver,
    },
}

fn main() -> Result<()> {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",  // no -v: WARN level
        1 => "info",  // -v: INFO level
        _ => "debug", // -vv or more: DEBUG level
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match cli.cmd {
        Command::Stress {
            threads,
            duration,
            interval,
            policy,
            period,
            cache_ttl,
            top,
            max_latency_us,
            highest,
            overflow,
        } => {
            let threads = threads.unwrap_or_else(num_cpus::get).max(1);
            stress_cmd(StressOptions {
                threads,
                duration,
                interval,
                policy: policy.into_policy(period),
                cache_ttl,
                top,
                max_latency_us: max_latency_us.max(1),
                highest: highest.map(|highest| (highest, overflow)),
            })?;
        }

        Command::Footprint {
            digits,
            lowest,
            highest,
            overflow,
        } => {
            footprint_cmd(digits, lowest, highest, overflow)?;
        }
    }

    Ok(())
}

struct StressOptions {
    threads: usize,
    duration: Duration,
    interval: Duration,
    policy: ResetPolicy,
    cache_ttl: Option<Duration>,
    top: usize,
    max_latency_us: u64,
    highest: Option<(u64, OverflowResolver)>,
}

fn stress_cmd(opts: StressOptions) -> Result<()> {
    let mut histograms = HdrBuilder::from_config(HistogramConfig {
        reset_policy: opts.policy,
        ..Default::default()
    });
    let tops = TopBuilder::from_config(TopConfig {
        size: opts.top,
        reset_policy: opts.policy,
        ..Default::default()
    });
    if let Some(ttl) = opts.cache_ttl {
        histograms = histograms.with_snapshot_cache_ttl(ttl);
    }
    if let Some((highest, resolver)) = opts.highest {
        histograms = histograms.with_highest_trackable_value(highest, resolver);
    }

    let counter = WindowCounter::new(opts.policy, hdrwin::clock::system_clock()).context("invalid counter settings")?;
    let timer = Arc::new(histograms.build_timer().context("invalid histogram settings")?);
    let slowest = Arc::new(tops.build_windowed().context("invalid top settings")?);
    let counter = Arc::new(counter);
    let stop = Arc::new(AtomicBool::new(false));

    info!(
        "Starting {} writer threads for {:?} (policy: {:?})",
        opts.threads, opts.duration, opts.policy
    );

    let writers: Vec<_> = (0..opts.threads)
        .map(|id| {
            let timer = Arc::clone(&timer);
            let slowest = Arc::clone(&slowest);
            let counter = Arc::clone(&counter);
            let stop = Arc::clone(&stop);
            let max_latency_us = opts.max_latency_us;
            thread::spawn(move || {
                let mut rng = rand::rng();
                let mut seq: u64 = 0;
                while !stop.load(Ordering::Relaxed) {
                    let latency = Duration::from_micros(rng.random_range(1..=max_latency_us));
                    timer.update(latency);
                    slowest.update_duration(latency, || format!("writer-{} op-{}", id, seq));
                    counter.add(1);
                    seq += 1;
                }
                debug!("writer {} finished after {} operations", id, seq);
            })
        })
        .collect();

    let started = Instant::now();
    while started.elapsed() < opts.duration {
        thread::sleep(opts.interval);
        let snapshot = timer.snapshot();
        let ops = counter.snapshot();
        safe_println!(
            "[{:>6.1}s] ops={} count={} min={:?} mean={:?} p99={:?} max={:?}",
            started.elapsed().as_secs_f64(),
            ops,
            snapshot.count(),
            Duration::from_nanos(snapshot.min()),
            Duration::from_nanos(snapshot.mean() as u64),
            Duration::from_nanos(snapshot.p99()),
            Duration::from_nanos(snapshot.max()),
        );
        for (rank, position) in slowest.snapshot().iter().enumerate() {
            safe_println!("    #{} {}", rank + 1, position);
        }
    }

    stop.store(true, Ordering::Relaxed);
    for writer in writers {
        writer.join().map_err(|_| anyhow!("writer thread panicked"))?;
    }

    let skipped = timer.reservoir().skipped_values();
    if skipped > 0 {
        safe_println!("skipped {} latencies above the highest trackable value", skipped);
    }
    if let Some(stats) = timer.reservoir().cache_stats() {
        safe_println!(
            "snapshot cache: hits={} misses={} hit rate={:.1}%",
            stats.hits,
            stats.misses,
            stats.hit_rate() * 100.0
        );
    }
    safe_println!("total operations: {}", timer.count());
    Ok(())
}

fn footprint_cmd(digits: u8, lowest: Option<u64>, highest: Option<u64>, overflow: OverflowResolver) -> Result<()> {
    let mut builder = HdrBuilder::new().with_significant_digits(digits);
    if let Some(highest) = highest {
        builder = builder.with_highest_trackable_value(highest, overflow);
    }
    if let Some(lowest) = lowest {
        builder = builder.with_lowest_discernible_value(lowest);
    }

    let bytes = builder
        .estimated_footprint_in_bytes()
        .context("cannot estimate footprint")?;
    safe_println!("{:?}", builder.config());
    safe_println!("estimated footprint: {} bytes", bytes);
    Ok(())
}
