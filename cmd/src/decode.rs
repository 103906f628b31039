use std::io::{stdout, Write};
use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use irig::{demodulate, demodulate_any, DemodConfig, Frame, StreamDemodulator, Timestamp, Variant};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::Format;

#[derive(Debug, Clone, Serialize)]
struct Decoded {
    /// Unknown when the frame layout was detected, since variants sharing a width also share
    /// a layout.
    variant: Option<char>,
    frame_width: usize,
    timestamp: Timestamp,
    /// Calendar time, if the timestamp is a real date.
    datetime: Option<NaiveDateTime>,
}

impl Decoded {
    fn new(variant: &Variant, timestamp: Timestamp) -> Self {
        Decoded {
            variant: Some(variant.name),
            ..Decoded::detected(variant.frame_width, timestamp)
        }
    }

    fn detected(frame_width: usize, timestamp: Timestamp) -> Self {
        Decoded {
            variant: None,
            frame_width,
            timestamp,
            datetime: timestamp.to_naive().ok(),
        }
    }

    fn write<W: Write>(&self, out: &mut W, format: &Format) -> Result<()> {
        match format {
            Format::Text => {
                if self.variant.is_none() {
                    write!(out, "{}-wide frame: ", self.frame_width)?;
                }
                match self.datetime {
                    Some(dt) => writeln!(out, "{} ({dt})", self.timestamp)?,
                    None => writeln!(out, "{}", self.timestamp)?,
                }
            }
            Format::Json => {
                serde_json::to_writer(&mut *out, self)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

pub fn decode(variant: &Variant, bits: &str, format: &Format) -> Result<()> {
    let frame: Frame = bits.parse().context("parsing frame")?;
    let timestamp = irig::decode(&frame, variant).context("decoding frame")?;
    Decoded::new(variant, timestamp).write(&mut stdout().lock(), format)
}

pub struct DemodOpts {
    pub variant: Option<Variant>,
    pub samples_per_tick: u32,
    pub threshold: f64,
    pub aligned: bool,
}

fn parse_levels(text: &str, threshold: f64) -> Result<Vec<bool>> {
    text.split_whitespace()
        .enumerate()
        .map(|(idx, tok)| {
            tok.parse::<f64>()
                .map(|x| x > threshold)
                .with_context(|| format!("invalid sample {tok:?} at index {idx}"))
        })
        .collect()
}

pub fn demod(input: &Path, opts: &DemodOpts, format: &Format) -> Result<()> {
    if opts.samples_per_tick == 0 {
        bail!("samples per tick must be at least 1");
    }
    let text = fs::read_to_string(input).with_context(|| format!("reading {input:?}"))?;
    let levels = parse_levels(&text, opts.threshold)?;
    debug!(samples = levels.len(), "read samples");

    let mut out = stdout().lock();
    if opts.aligned {
        let decoded = match &opts.variant {
            Some(variant) => {
                let ts = demodulate(levels, variant, opts.samples_per_tick)
                    .context("demodulating frame")?;
                Decoded::new(variant, ts)
            }
            None => {
                let (variant, ts) =
                    demodulate_any(levels, opts.samples_per_tick).context("demodulating frame")?;
                Decoded::detected(variant.frame_width, ts)
            }
        };
        return decoded.write(&mut out, format);
    }

    let config = DemodConfig::builder()
        .variant(opts.variant.unwrap_or(Variant::B))
        .samples_per_tick(opts.samples_per_tick)
        .build();
    let mut decoded = 0;
    let mut failed = 0;
    for zult in StreamDemodulator::new(&config).timestamps(levels) {
        match zult {
            Ok(timestamp) => {
                Decoded::new(&config.variant, timestamp).write(&mut out, format)?;
                decoded += 1;
            }
            Err(err) => {
                warn!("frame failed to decode: {err}");
                failed += 1;
            }
        }
    }
    info!(decoded, failed, "demodulated {input:?}");
    Ok(())
}
