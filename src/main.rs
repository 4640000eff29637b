use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use chordguard::{SimConfig, Swarm, DEFAULT_ASSUMED_ATTACKER_FRACTION, DEFAULT_ATTACKER_FRACTION, DEFAULT_PEER_COUNT};

#[derive(Parser, Debug)]
#[command(name = "chordguard")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Population size, honest and adversarial peers together.
    #[arg(short = 'n', long, default_value_t = DEFAULT_PEER_COUNT)]
    peers: usize,

    /// Fraction of the population that colludes.
    #[arg(short = 'f', long, default_value_t = DEFAULT_ATTACKER_FRACTION)]
    attacker_fraction: f64,

    #[arg(short, long, default_value = "300")]
    rounds: u64,

    /// Admit every disclosed finger table without checks.
    #[arg(long)]
    no_verify: bool,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Attacker fraction assumed by the density tolerance.
    #[arg(long, default_value_t = DEFAULT_ASSUMED_ATTACKER_FRACTION)]
    tolerance_fraction: f64,

    /// Log a telemetry snapshot every this many rounds (0 disables).
    #[arg(long, default_value = "50")]
    report_every: u64,

    /// Print the final telemetry as JSON instead of the bare metric.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = SimConfig::new(args.peers, args.attacker_fraction, !args.no_verify)
        .with_assumed_attacker_fraction(args.tolerance_fraction);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let mut swarm = Swarm::new(config).context("failed to bootstrap swarm")?;

    for _ in 0..args.rounds {
        swarm.step();
        if args.report_every > 0 && swarm.round() % args.report_every == 0 {
            let snapshot = swarm.telemetry();
            info!(
                round = snapshot.round,
                metric = format!("{:.3}", snapshot.metric),
                contributing = snapshot.contributing_peers,
                mean_guards = format!("{:.1}", snapshot.mean_guard_size),
                admitted = snapshot.verification.admitted(),
                rejected = snapshot.verification.rejected(),
                "telemetry snapshot"
            );
        }
    }

    if args.json {
        let report = serde_json::to_string_pretty(&swarm.telemetry())
            .context("failed to encode telemetry")?;
        println!("{}", report);
    } else {
        println!("{}", (swarm.metric() * 100.0) as i64);
    }

    Ok(())
}
