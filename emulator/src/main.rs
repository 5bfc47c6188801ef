mod session;
mod sim;
mod transcript;

use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use flight_core::config::{AcquisitionLimit, BuildVariant, FlightConfig};

use session::{Outcome, Session};
use sim::{ImageStorage, SimModem};
use transcript::TranscriptLogger;

const USAGE: &str = "Usage: flight-emulator [--variant <flight|ground>] [--cycles <n>] \
[--modem-latency <polls>] [--no-signal] [--unreachable] [--max-attempts <n>] \
[--acquire-timeout <secs>] [--storage <path>] [--transcript <path>] [--max-ticks <n>]";

const DEFAULT_CYCLES: u32 = 3;
const DEFAULT_MODEM_LATENCY: u32 = 3;
const DEFAULT_MAX_TICKS: u64 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Options {
    variant: BuildVariant,
    cycles: u32,
    /// Polls per wake before the modem acquires; `None` never acquires.
    modem_latency: Option<u32>,
    reachable: bool,
    acquisition_limit: AcquisitionLimit,
    storage: Option<PathBuf>,
    transcript: Option<PathBuf>,
    max_ticks: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            variant: BuildVariant::Ground,
            cycles: DEFAULT_CYCLES,
            modem_latency: Some(DEFAULT_MODEM_LATENCY),
            reachable: true,
            acquisition_limit: AcquisitionLimit::Unbounded,
            storage: None,
            transcript: None,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let config = FlightConfig::for_variant(options.variant)
        .with_acquisition_limit(options.acquisition_limit);
    if let Err(err) = config.validate() {
        eprintln!("{err}");
        process::exit(2);
    }

    let storage = match options.storage.clone() {
        Some(path) => ImageStorage::open(path)?,
        None => ImageStorage::in_memory(),
    };
    let modem = SimModem::new(options.reachable, options.modem_latency);
    let transcript = TranscriptLogger::new(io::stdout().lock(), options.transcript.as_deref())?;

    let mut session = Session::boot(config, storage, modem, transcript)?;
    match session.run(options.cycles, options.max_ticks)? {
        Outcome::Completed { .. } => Ok(()),
        Outcome::TickBudgetExhausted { .. } => process::exit(1),
    }
}

fn parse_options<I>(args: I) -> Result<Options, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--variant" => {
                let tag = value()?;
                options.variant = BuildVariant::from_tag(&tag)
                    .map_err(|_| format!("Unknown variant `{tag}`"))?;
            }
            "--cycles" => options.cycles = parse_number(&flag, &value()?)?,
            "--modem-latency" => options.modem_latency = Some(parse_number(&flag, &value()?)?),
            "--no-signal" => options.modem_latency = None,
            "--unreachable" => options.reachable = false,
            "--max-attempts" => {
                options.acquisition_limit = AcquisitionLimit::Attempts(parse_number(&flag, &value()?)?);
            }
            "--acquire-timeout" => {
                let secs: u64 = parse_number(&flag, &value()?)?;
                options.acquisition_limit = AcquisitionLimit::Timeout(Duration::from_secs(secs));
            }
            "--storage" => options.storage = Some(PathBuf::from(value()?)),
            "--transcript" => options.transcript = Some(PathBuf::from(value()?)),
            "--max-ticks" => options.max_ticks = parse_number(&flag, &value()?)?,
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(options)
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid number `{value}` for {flag}"))
}
