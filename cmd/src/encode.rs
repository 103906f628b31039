use std::io::{stdout, BufWriter, Write};

use anyhow::{bail, Context, Result};
use irig::{drive, AnalogConfig, FrameSource, Timestamp, TimestampSource, Variant};
use serde::Serialize;

use crate::Format;

#[derive(Debug, Clone)]
pub enum Output {
    Bits,
    Ttl,
    Analog,
}

impl clap::ValueEnum for Output {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Bits, Self::Ttl, Self::Analog]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Bits => Some(clap::builder::PossibleValue::new("bits")),
            Self::Ttl => Some(clap::builder::PossibleValue::new("ttl")),
            Self::Analog => Some(clap::builder::PossibleValue::new("analog")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Encoded {
    variant: char,
    timestamp: Timestamp,
    frame: String,
}

pub fn encode(
    variant: &Variant,
    start: Timestamp,
    frames: usize,
    output: &Output,
    format: &Format,
) -> Result<()> {
    start
        .validate()
        .with_context(|| format!("cannot encode {start}"))?;

    let mut out = BufWriter::new(stdout().lock());
    match output {
        Output::Bits => write_frames(&mut out, variant, start, frames, format)?,
        Output::Ttl => {
            let volts = drive(variant, TimestampSource::new(start, variant))
                .take(signal_ticks(variant, frames))
                .map(|sample| sample.volts());
            write_samples(&mut out, volts, format)?;
        }
        Output::Analog => {
            let levels = drive(variant, TimestampSource::new(start, variant))
                .take(signal_ticks(variant, frames))
                .map(|sample| sample.level);
            write_samples(&mut out, AnalogConfig::default().modulate(levels), format)?;
        }
    }
    out.flush().context("flushing output")
}

/// Bootstrap marker plus `frames` full frames.
fn signal_ticks(variant: &Variant, frames: usize) -> usize {
    variant.pulse_length_ticks as usize + frames * variant.frame_ticks()
}

fn write_frames<W: Write>(
    out: &mut W,
    variant: &Variant,
    start: Timestamp,
    frames: usize,
    format: &Format,
) -> Result<()> {
    let mut source = TimestampSource::new(start, variant);
    for _ in 0..frames {
        let timestamp = source.peek();
        let Some(frame) = source.next_frame() else {
            bail!("cannot encode {timestamp} with {variant}");
        };
        match format {
            Format::Text => writeln!(out, "{frame}")?,
            Format::Json => {
                let encoded = Encoded {
                    variant: variant.name,
                    timestamp,
                    frame: frame.to_string(),
                };
                serde_json::to_writer(&mut *out, &encoded)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

fn write_samples<W, I>(out: &mut W, samples: I, format: &Format) -> Result<()>
where
    W: Write,
    I: Iterator<Item = f64>,
{
    match format {
        Format::Text => {
            for x in samples {
                writeln!(out, "{x:.6}")?;
            }
        }
        Format::Json => {
            let samples: Vec<f64> = samples.collect();
            serde_json::to_writer(&mut *out, &samples)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
