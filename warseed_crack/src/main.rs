// CLI entry point for the warseed state cracker.
//
// Usage:
//   warseed simulate --seed <N> [--widths <K,K,...>]
//   warseed crack --first <BITS:VALUE> --second <BITS:VALUE> --steps <N>
//                 [--extra <STEP:BITS:VALUE>]... [SCAN OPTIONS]
//   warseed demo [--seed <N>] [SCAN OPTIONS]
//
// Scan options:
//   --attempts <N|full>   Candidates to test (default: 1000000)
//   --workers <N>         Worker threads, 0 for one per core (default: 1)
//   --config <FILE>       Load a CrackConfig JSON file first
//   --json                Print the result as JSON instead of text
//
// Diagnostics go to stderr through `tracing` (filter with RUST_LOG);
// results go to stdout.

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;
use warseed_crack::cracker::refine;
use warseed_crack::placement::{MatchLayout, simulate, simulate_match};
use warseed_crack::{
    CrackConfig, CrackError, CrackRequest, Cracker, LaterObservation, Observation,
};

const DEFAULT_SEED: i64 = 123_456_789;
const DEFAULT_WIDTHS: [u32; 4] = [1, 16, 0, 16];

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("simulate") => run_simulate(&args[1..]),
        Some("crack") => run_crack(&args[1..]),
        Some("demo") => run_demo(&args[1..]),
        Some("--help" | "-h") => {
            print_usage();
            return;
        }
        Some(other) => usage_error(&format!("Unknown command: {other}")),
        None => usage_error("Missing command"),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_simulate(args: &[String]) -> Result<(), CrackError> {
    let mut seed = DEFAULT_SEED;
    let mut widths = DEFAULT_WIDTHS.to_vec();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                seed = parse_value(args.get(i), "--seed requires an integer");
            }
            "--widths" => {
                i += 1;
                widths = args
                    .get(i)
                    .and_then(|s| s.split(',').map(|w| w.trim().parse().ok()).collect())
                    .unwrap_or_else(|| usage_error("--widths requires a comma-separated list"));
            }
            other => usage_error(&format!("Unknown argument: {other}")),
        }
        i += 1;
    }

    let values = simulate(seed, &widths)?;
    for (k, value) in widths.iter().zip(&values) {
        println!("{k:>2}-bit draw: {value}");
    }
    Ok(())
}

fn run_crack(args: &[String]) -> Result<(), CrackError> {
    let mut first = None;
    let mut second = None;
    let mut steps = None;
    let mut extra = Vec::new();
    let mut scan = ScanOptions::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--first" => {
                i += 1;
                first = Some(parse_observation(args.get(i), "--first")?);
            }
            "--second" => {
                i += 1;
                second = Some(parse_observation(args.get(i), "--second")?);
            }
            "--steps" => {
                i += 1;
                steps = Some(parse_value::<i64>(args.get(i), "--steps requires an integer"));
            }
            "--extra" => {
                i += 1;
                extra.push(parse_later(args.get(i))?);
            }
            _ => i = scan.parse(args, i),
        }
        i += 1;
    }
    let (Some(first), Some(second), Some(steps)) = (first, second, steps) else {
        usage_error("crack requires --first, --second and --steps");
    };

    let request = CrackRequest::new(first, second, steps)?;
    let cracker = Cracker::new(scan.config()?)?;
    let report = cracker.scan(&request)?;
    if scan.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    if !extra.is_empty() {
        let refined = refine(&report.candidates, &extra);
        println!(
            "{} of {} recorded candidate(s) agree with the extra draws",
            refined.len(),
            report.candidates.len()
        );
        for c in &refined {
            println!("  {}", c.state);
        }
    }
    Ok(())
}

fn run_demo(args: &[String]) -> Result<(), CrackError> {
    let mut seed = DEFAULT_SEED;
    let mut scan = ScanOptions::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                seed = parse_value(args.get(i), "--seed requires an integer");
            }
            _ => i = scan.parse(args, i),
        }
        i += 1;
    }

    let layout = MatchLayout::default();
    let placement = simulate_match(seed, layout)?;
    info!(seed, positions = ?placement.positions, "simulated match placement");
    let sequence = placement.observations()?;
    let indices = layout.position_indices();
    let cracker = Cracker::new(scan.config()?)?;
    let crack = cracker.crack_sequence(&sequence, indices[0], indices[1])?;

    if scan.json {
        println!("{}", serde_json::to_string_pretty(&crack)?);
        return Ok(());
    }
    println!("Cracking for observations: {:?}", placement.positions);
    println!("{}", crack.report);
    let seeds = crack.seeds();
    if seeds.contains(&((seed as u64) & warseed_lcg::STATE_MASK)) {
        println!("True seed is among the {} recovered seed(s)", seeds.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Options shared by every command that runs a scan.
#[derive(Default)]
struct ScanOptions {
    config_path: Option<String>,
    attempts: Option<Option<u64>>,
    workers: Option<usize>,
    json: bool,
}

impl ScanOptions {
    /// Consume the option at `args[i]`, returning the index of its last
    /// token. Unknown arguments are a usage error.
    fn parse(&mut self, args: &[String], mut i: usize) -> usize {
        match args[i].as_str() {
            "--attempts" => {
                i += 1;
                self.attempts = Some(match args.get(i).map(String::as_str) {
                    Some("full") => None,
                    value => Some(parse_value(
                        value.map(str::to_owned).as_ref(),
                        "--attempts requires a number or 'full'",
                    )),
                });
            }
            "--workers" => {
                i += 1;
                self.workers = Some(parse_value(args.get(i), "--workers requires a number"));
            }
            "--config" => {
                i += 1;
                self.config_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| usage_error("--config requires a path")),
                );
            }
            "--json" => self.json = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => usage_error(&format!("Unknown argument: {other}")),
        }
        i
    }

    /// The config file (or defaults) with command-line overrides applied.
    fn config(&self) -> Result<CrackConfig, CrackError> {
        let mut config = match &self.config_path {
            Some(path) => CrackConfig::load(Path::new(path))?,
            None => CrackConfig::default(),
        };
        if let Some(attempts) = self.attempts {
            config.attempts = attempts;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(arg: Option<&String>, message: &str) -> T {
    arg.and_then(|s| s.parse().ok())
        .unwrap_or_else(|| usage_error(message))
}

/// `BITS:VALUE`, e.g. `16:50024`.
fn parse_observation(arg: Option<&String>, flag: &str) -> Result<Observation, CrackError> {
    let parts = split_numbers(arg, 2)
        .unwrap_or_else(|| usage_error(&format!("{flag} requires BITS:VALUE")));
    Observation::new(parts[0] as u32, parts[1] as u32)
}

/// `STEP:BITS:VALUE`, with STEP counted from the first observed draw.
fn parse_later(arg: Option<&String>) -> Result<LaterObservation, CrackError> {
    let parts =
        split_numbers(arg, 3).unwrap_or_else(|| usage_error("--extra requires STEP:BITS:VALUE"));
    Ok(LaterObservation {
        steps: parts[0],
        observation: Observation::new(parts[1] as u32, parts[2] as u32)?,
    })
}

/// Split `a:b:c` into exactly `count` numbers. Bit widths and values must
/// fit in `u32`; steps may use the full `u64` range.
fn split_numbers(arg: Option<&String>, count: usize) -> Option<Vec<u64>> {
    let parts: Vec<u64> = arg?
        .split(':')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    let tail_fits = parts.iter().skip(count.saturating_sub(2)).all(|&p| p <= u64::from(u32::MAX));
    (parts.len() == count && tail_fits).then_some(parts)
}

fn usage_error(message: &str) -> ! {
    eprintln!("{message}");
    print_usage();
    std::process::exit(1);
}

fn print_usage() {
    println!("Usage: warseed <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  simulate --seed <N> [--widths <K,K,...>]");
    println!("      Replay a seed through power-of-two draws (default widths 1,16,0,16)");
    println!("  crack --first <BITS:VALUE> --second <BITS:VALUE> --steps <N>");
    println!("        [--extra <STEP:BITS:VALUE>]...");
    println!("      Search for generator states consistent with two observed draws");
    println!("  demo [--seed <N>]");
    println!("      Simulate a two-warrior match placement and crack it");
    println!();
    println!("Scan options:");
    println!("  --attempts <N|full>     Candidates to test (default: 1000000)");
    println!("  --workers <N>           Worker threads, 0 for one per core (default: 1)");
    println!("  --config <FILE>         Load a CrackConfig JSON file first");
    println!("  --json                  Print results as JSON");
    println!("  --help, -h              Show this help");
}
