mod decode;
mod encode;

use std::io::{stderr, stdout, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use clap::{Parser, Subcommand};
use irig::{Timestamp, Variant, TTL_AMPLITUDE};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode timestamps as IRIG frames or signals.
    ///
    /// Consecutive frames are produced starting at --time. Signal output starts with the
    /// single bootstrap marker sent before the first frame.
    Encode {
        /// IRIG variant, e.g., B or IRIG-H.
        #[arg(short, long, default_value = "B", value_parser = parse_variant)]
        variant: Variant,

        /// Time of the first frame; RFC3339, YYYY-MM-DDTHH:MM:SS or YYYY-DDD HH:MM:SS.
        ///
        /// Defaults to the current UTC time.
        #[arg(short, long, value_parser = parse_time, value_name = "timestamp")]
        time: Option<Timestamp>,

        /// Number of frames to encode.
        #[arg(short = 'n', long, default_value_t = 1)]
        frames: usize,

        /// What to output: frame bit strings, TTL volts per tick, or analog samples.
        #[arg(short, long, default_value = "bits")]
        output: encode::Output,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,
    },
    /// Decode a frame bit string, e.g., _00010001_0001...
    Decode {
        #[arg(short, long, default_value = "B", value_parser = parse_variant)]
        variant: Variant,

        /// Frame of `_`, `0` and `1` characters. Whitespace is ignored.
        bits: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,
    },
    /// Demodulate a file of whitespace separated signal samples, one per tick.
    ///
    /// By default the signal is searched for frame boundaries and every complete frame is
    /// decoded. With --aligned the samples must start at the reference marker of a frame
    /// and only that frame is decoded.
    Demod {
        /// Input sample file
        input: PathBuf,

        /// IRIG variant. With --aligned, every frame layout is tried if not provided and only
        /// the detected frame width is reported.
        #[arg(short, long, value_parser = parse_variant)]
        variant: Option<Variant>,

        /// Samples taken per encoder tick.
        #[arg(short, long, default_value_t = 1)]
        samples_per_tick: u32,

        /// Samples above this value are high.
        #[arg(short = 'T', long, default_value_t = TTL_AMPLITUDE / 2.0)]
        threshold: f64,

        /// Samples start at the reference marker of a frame.
        #[arg(long, action)]
        aligned: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,
    },
    /// Show the supported IRIG variants.
    Variants {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: Format,
    },
}

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

fn parse_variant(s: &str) -> Result<Variant, String> {
    Variant::lookup(s).map_err(|err| err.to_string())
}

fn parse_time(s: &str) -> Result<Timestamp, String> {
    let dt = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%j %H:%M:%S"))
        .map_err(|_| {
            "Could not parse into an RFC3339, YYYY-MM-DDTHH:MM:SS or YYYY-DDD HH:MM:SS timestamp"
                .to_string()
        })?;
    let ts = Timestamp::from_datetime(&dt).map_err(|err| err.to_string())?;
    ts.validate().map_err(|err| err.to_string())?;
    Ok(ts)
}

fn variants(format: &Format) -> Result<()> {
    let mut out = stdout().lock();
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, &Variant::ALL)?;
            writeln!(out)?;
        }
        Format::Text => {
            writeln!(out, "variant  width  tick rate (Hz)  bit rate (bps)  frame (s)")?;
            for v in Variant::ALL {
                writeln!(
                    out,
                    "{:<7}  {:>5}  {:>14}  {:>14}  {:>9}",
                    v.to_string(),
                    v.frame_width,
                    format!("{:.4}", v.tick_rate_hz),
                    format!("{:.4}", v.bit_rate_hz()),
                    format!("{:.2}", v.frame_seconds()),
                )?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("IRIG_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Encode {
            variant,
            time,
            frames,
            output,
            format,
        } => {
            let start = match time {
                Some(ts) => *ts,
                None => Timestamp::now().context("reading the system clock")?,
            };
            debug!(variant = %variant, start = %start, frames, "encoding");
            encode::encode(variant, start, *frames, output, format)
        }
        Commands::Decode {
            variant,
            bits,
            format,
        } => decode::decode(variant, bits, format),
        Commands::Demod {
            input,
            variant,
            samples_per_tick,
            threshold,
            aligned,
            format,
        } => {
            let opts = decode::DemodOpts {
                variant: *variant,
                samples_per_tick: *samples_per_tick,
                threshold: *threshold,
                aligned: *aligned,
            };
            decode::demod(input, &opts, format)
        }
        Commands::Variants { format } => variants(format),
    }
}
