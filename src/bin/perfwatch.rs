//! perfwatch - real-time performance counter monitor.
//!
//! Looks up a virtual machine, offers the counters of one group for selection
//! and prints the selected counter's real-time samples until interrupted.

use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use perfwatch::collector::fetcher::DEFAULT_MAX_CONTINUATIONS;
use perfwatch::collector::{SamplerExit, Session};
use perfwatch::collector::mock::MockService;
use perfwatch::config::{
    DEFAULT_GROUP, DEFAULT_MAX_SAMPLES, MAX_SAMPLES_LIMIT, MonitorConfig, REALTIME_INTERVAL_ID,
    RetryPolicy,
};
use perfwatch::console::InvalidInput;
use perfwatch::monitor::{Monitor, RunOutcome};
use perfwatch::util::Shutdown;

/// Exit status after an interrupt outside the polling loop (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Real-time performance counter monitor.
#[derive(Parser)]
#[command(
    name = "perfwatch",
    about = "Real-time performance counter monitor",
    version
)]
struct Args {
    /// Name of the virtual machine to monitor.
    #[arg(long, env = "PERFWATCH_VM_NAME", required_unless_present = "list_groups")]
    vm_name: Option<String>,

    /// Recorded backend scenario (JSON). Defaults to the built-in demo host.
    #[arg(long, value_name = "PATH", env = "PERFWATCH_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Counter group offered for selection.
    #[arg(short, long, default_value = DEFAULT_GROUP, env = "PERFWATCH_GROUP")]
    group: String,

    /// Ask again on non-numeric input instead of exiting.
    #[arg(long)]
    reprompt_on_invalid: bool,

    /// Performance interval id (20 is real-time).
    #[arg(long, default_value_t = REALTIME_INTERVAL_ID)]
    interval_id: i32,

    /// Samples requested per query.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_SAMPLES,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_SAMPLES_LIMIT))
    )]
    max_samples: u32,

    /// Pause between queries (e.g., "10", "10s", "2m").
    #[arg(short, long, default_value = "10s", value_parser = parse_period)]
    period: Duration,

    /// Stop after this many polling iterations.
    #[arg(short, long)]
    count: Option<u64>,

    /// Page size hint for property retrieval.
    #[arg(long)]
    page_size: Option<u32>,

    /// Maximum continuation calls while paging through properties.
    #[arg(long, default_value_t = DEFAULT_MAX_CONTINUATIONS)]
    max_continuations: usize,

    /// Retries of a failed sample query before giving up.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Print the available counter groups and exit.
    #[arg(long)]
    list_groups: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> MonitorConfig {
        let invalid_input = if self.reprompt_on_invalid {
            InvalidInput::Reprompt
        } else {
            InvalidInput::Fail
        };
        MonitorConfig::new(self.vm_name.clone().unwrap_or_default())
            .with_group(self.group.clone())
            .with_interval_id(self.interval_id)
            .with_max_samples(self.max_samples)
            .with_period(self.period)
            .with_iterations(self.count)
            .with_page_size(self.page_size)
            .with_max_continuations(self.max_continuations)
            .with_retry(RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            })
            .with_invalid_input(invalid_input)
    }
}

/// Parses a period string (e.g., "10", "10s", "2m", "1h") into a duration.
fn parse_period(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty period string".to_string());
    }

    let (num_str, multiplier) = if let Some(num) = s.strip_suffix('h') {
        (num, 3600)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1)
    } else {
        (s, 1)
    };

    num_str
        .trim()
        .parse::<u64>()
        .map(|n| Duration::from_secs(n.saturating_mul(multiplier)))
        .map_err(|e| format!("invalid period '{}': {}", s, e))
}

/// Initializes the tracing subscriber on stderr.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("perfwatch={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_service(args: &Args) -> MockService {
    match &args.scenario {
        Some(path) => match MockService::from_json_file(path) {
            Ok(service) => {
                info!(path = %path.display(), "loaded backend scenario");
                service
            }
            Err(e) => {
                eprintln!("Error: {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => {
            info!("using built-in demo host");
            MockService::typical_host()
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = args.config();
    let mut session = Session::with_defaults(load_service(&args));

    let shutdown = Shutdown::new();
    let s = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        // Nothing polls the token while the prompt blocks, and a second
        // interrupt means the graceful stop is not wanted.
        if !s.is_graceful() || s.is_requested() {
            process::exit(INTERRUPTED_EXIT_CODE);
        }
        info!("Received shutdown signal");
        s.request();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let monitor = Monitor::new(config, shutdown);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.list_groups {
        if let Err(e) = monitor.list_groups(&mut session, &mut out) {
            error!(error = %e, "failed to list counter groups");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    match monitor.run(&mut session, &mut input, &mut out) {
        Ok(RunOutcome::Finished(SamplerExit::Cancelled { iterations })) => {
            info!(iterations, "sampling stopped");
        }
        Ok(RunOutcome::Finished(SamplerExit::Completed(iterations))) => {
            info!(iterations, "sampling completed");
        }
        Ok(outcome) => {
            info!(outcome = ?outcome, "monitor finished");
        }
        Err(e) => {
            error!(error = %e, "monitor failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_units() {
        assert_eq!(parse_period("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_period("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_period("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_period(" 1h ").unwrap(), Duration::from_secs(3600));
        assert!(parse_period("").is_err());
        assert!(parse_period("ten").is_err());
    }

    #[test]
    fn args_map_onto_config() {
        let args = Args::parse_from([
            "perfwatch",
            "--vm-name",
            "db-01",
            "--group",
            "mem",
            "--period",
            "5s",
            "--count",
            "2",
            "--max-retries",
            "1",
            "--reprompt-on-invalid",
        ]);
        let config = args.config();

        assert_eq!(config.vm_name, "db-01");
        assert_eq!(config.group, "mem");
        assert_eq!(config.period, Duration::from_secs(5));
        assert_eq!(config.iterations, Some(2));
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.invalid_input, InvalidInput::Reprompt);
    }

    #[test]
    fn max_samples_is_bounded() {
        let parse = |n: &str| {
            Args::try_parse_from(["perfwatch", "--vm-name", "a", "--max-samples", n])
        };
        assert_eq!(parse("180").unwrap().max_samples, 180);
        assert!(parse("0").is_err());
        assert!(parse("4000000000").is_err());
    }

    #[test]
    fn list_groups_needs_no_vm_name() {
        let args = Args::try_parse_from(["perfwatch", "--list-groups"]).unwrap();
        assert!(args.list_groups);
    }
}
