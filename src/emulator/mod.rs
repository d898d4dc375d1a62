//! Synthetic word-stream generator
//!
//! Produces V1190 and FADC250 raw streams with random content, together with
//! the values a correct decoder must recover. Used by the `emulate`
//! subcommand and by the integration tests.
//!
//! Streams are reproducible: the same seed always yields the same words.

use std::collections::BTreeMap;
use std::ops::Range;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, NormalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::decoder::common::RawWord;

/// Highest value a 12-bit FADC sample can take without overflow
const SAMPLE_MAX: f64 = 4095.0;

/// FADC250 readout flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FadcReadout {
    /// Raw sample windows (mode 1)
    #[default]
    Window,
    /// Integral, time and pedestal words (mode 8)
    Pulse,
}

/// Emulator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Slot written into headers and trailers
    pub slot: u32,
    /// TDC channels that produce hits
    pub tdc_channels: u32,
    /// Upper bound of hits per TDC channel and event
    pub tdc_max_hits: u32,
    /// FADC channels read out per event
    pub fadc_channels: u32,
    /// Samples per raw window
    pub window_width: u32,
    /// Events per FADC block
    pub events_per_block: u32,
    /// FADC readout flavour
    pub readout: FadcReadout,
    /// FADC baseline in ADC counts
    pub baseline: f64,
    /// Mean pulse amplitude in ADC counts
    pub amplitude_mean: f64,
    /// Pulse amplitude spread
    pub amplitude_sigma: f64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            slot: 3,
            tdc_channels: 128,
            tdc_max_hits: 3,
            fadc_channels: 16,
            window_width: 50,
            events_per_block: 4,
            readout: FadcReadout::Window,
            baseline: 200.0,
            amplitude_mean: 1500.0,
            amplitude_sigma: 300.0,
        }
    }
}

/// Hits one TDC event must decode to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TdcEvent {
    pub event_number: u32,
    /// Word range of the event (global header to global trailer)
    pub range: Range<usize>,
    /// Channel -> hit values in stream order
    pub hits: BTreeMap<u32, Vec<u32>>,
}

/// Pulse parameters written for one FADC channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FadcPulse {
    pub integral: u32,
    pub coarse_time: u32,
    pub fine_time: u32,
    pub pedestal: u32,
    pub peak: u32,
}

/// Values one FADC event must decode to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FadcEvent {
    pub event_number: u32,
    pub trigger_time: u64,
    /// Channel -> raw window samples (window readout)
    pub samples: BTreeMap<u32, Vec<u32>>,
    /// Channel -> pulse parameters (pulse readout)
    pub pulses: BTreeMap<u32, FadcPulse>,
}

/// One FADC block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FadcBlock {
    pub block_number: u32,
    /// Word range of the block (block header to block trailer)
    pub range: Range<usize>,
    pub events: Vec<FadcEvent>,
}

/// Generated V1190 stream
#[derive(Debug, Clone, Default)]
pub struct TdcStream {
    pub words: Vec<RawWord>,
    pub events: Vec<TdcEvent>,
}

/// Generated FADC250 stream
#[derive(Debug, Clone, Default)]
pub struct FadcStream {
    pub words: Vec<RawWord>,
    pub blocks: Vec<FadcBlock>,
}

// ---------------------------------------------------------------------------
// Word encoders
// ---------------------------------------------------------------------------

mod tdc_words {
    pub const CHIPS: u32 = 4;
    pub const CHANNELS_PER_CHIP: u32 = 32;

    pub fn global_header(event: u32, slot: u32) -> u32 {
        0x4000_0000 | ((event & 0x3F_FFFF) << 5) | (slot & 0x1F)
    }

    pub fn chip_header(chip: u32, event: u32) -> u32 {
        0x0800_0000 | ((chip & 0x3) << 24) | ((event & 0xFFF) << 12)
    }

    pub fn measurement(channel: u32, value: u32) -> u32 {
        ((channel & 0x7F) << 19) | (value & 0x7_FFFF)
    }

    pub fn chip_trailer(chip: u32, event: u32, words: u32) -> u32 {
        0x1800_0000 | ((chip & 0x3) << 24) | ((event & 0xFFF) << 12) | (words & 0xFFF)
    }

    pub fn global_trailer(words: u32, slot: u32) -> u32 {
        0x8000_0000 | ((words & 0xFFFF) << 5) | (slot & 0x1F)
    }
}

mod fadc_words {
    fn defining(data_type: u32) -> u32 {
        0x8000_0000 | (data_type << 27)
    }

    pub fn block_header(slot: u32, module_id: u32, block: u32, events: u32) -> u32 {
        defining(0) | (slot << 22) | (module_id << 18) | ((block & 0x3FF) << 8) | (events & 0xFF)
    }

    pub fn block_header_params(pl: u32, nsb: u32, nsa: u32) -> u32 {
        ((pl & 0x7FF) << 18) | ((nsb & 0x1FF) << 9) | (nsa & 0x1FF)
    }

    pub fn block_trailer(slot: u32, words: u32) -> u32 {
        defining(1) | (slot << 22) | (words & 0x3F_FFFF)
    }

    pub fn event_header(slot: u32, event: u32) -> u32 {
        defining(2) | (slot << 22) | (event & 0x3F_FFFF)
    }

    pub fn trigger_time(time: u64) -> [u32; 2] {
        [
            defining(3) | (time & 0xFF_FFFF) as u32,
            ((time >> 24) & 0xFF_FFFF) as u32,
        ]
    }

    pub fn window_header(channel: u32, width: u32) -> u32 {
        defining(4) | (channel << 23) | (width & 0xFFF)
    }

    /// Sample pairs; an odd trailing sample is padded with a not-valid half
    pub fn sample_words(samples: &[u32]) -> impl Iterator<Item = u32> + '_ {
        samples.chunks(2).map(|pair| {
            let first = pair[0] & 0x1FFF;
            let second = pair.get(1).map_or(0x2000, |s| s & 0x1FFF);
            (first << 16) | second
        })
    }

    pub fn pulse_integral(channel: u32, integral: u32) -> u32 {
        defining(7) | (channel << 23) | (integral & 0x7_FFFF)
    }

    pub fn pulse_time(channel: u32, coarse: u32, fine: u32) -> u32 {
        defining(8) | (channel << 23) | ((coarse & 0x3FF) << 6) | (fine & 0x3F)
    }

    pub fn pulse_pedestal(channel: u32, pedestal: u32, peak: u32) -> u32 {
        defining(10) | (channel << 23) | ((pedestal & 0x1FF) << 12) | (peak & 0xFFF)
    }
}

// ---------------------------------------------------------------------------
// Emulator
// ---------------------------------------------------------------------------

/// Emulator errors
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Invalid amplitude distribution: {0}")]
    Distribution(#[from] NormalError),
}

/// Seeded generator of raw module streams
pub struct WordStreamEmulator {
    config: EmulatorConfig,
    rng: StdRng,
    amplitude: Normal<f64>,
    noise: Normal<f64>,
    event_number: u32,
    block_number: u32,
    trigger_time: u64,
}

impl WordStreamEmulator {
    /// Create an emulator; fails when the amplitude spread is negative or NaN
    pub fn new(config: EmulatorConfig, seed: u64) -> Result<Self, EmulatorError> {
        let amplitude = Normal::new(config.amplitude_mean, config.amplitude_sigma)?;
        let noise = Normal::new(0.0, 2.0)?;

        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            amplitude,
            noise,
            event_number: 0,
            block_number: 0,
            trigger_time: 0,
        })
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Generate `events` consecutive V1190 events
    pub fn tdc_stream(&mut self, events: u32) -> TdcStream {
        let mut stream = TdcStream::default();
        for _ in 0..events {
            let event = self.tdc_event(&mut stream.words);
            stream.events.push(event);
        }
        debug!(
            events,
            words = stream.words.len(),
            "Generated V1190 stream"
        );
        stream
    }

    /// Generate `events` FADC250 events grouped into blocks
    pub fn fadc_stream(&mut self, events: u32) -> FadcStream {
        let mut stream = FadcStream::default();
        let per_block = self.config.events_per_block.max(1);
        let mut remaining = events;
        while remaining > 0 {
            let n = remaining.min(per_block);
            let block = self.fadc_block(n, &mut stream.words);
            stream.blocks.push(block);
            remaining -= n;
        }
        debug!(
            events,
            blocks = stream.blocks.len(),
            words = stream.words.len(),
            "Generated FADC250 stream"
        );
        stream
    }

    fn tdc_event(&mut self, words: &mut Vec<RawWord>) -> TdcEvent {
        let slot = self.config.slot;
        let event_number = self.next_event_number();
        let start = words.len();
        let mut hits: BTreeMap<u32, Vec<u32>> = BTreeMap::new();

        words.push(tdc_words::global_header(event_number, slot));
        for chip in 0..tdc_words::CHIPS {
            let chip_start = words.len();
            words.push(tdc_words::chip_header(chip, event_number));

            let first = chip * tdc_words::CHANNELS_PER_CHIP;
            let last = (first + tdc_words::CHANNELS_PER_CHIP).min(self.config.tdc_channels);
            for channel in first..last {
                let n_hits = self.rng.gen_range(0..=self.config.tdc_max_hits);
                if n_hits == 0 {
                    continue;
                }
                let mut values: Vec<u32> =
                    (0..n_hits).map(|_| self.rng.gen_range(0..0x8_0000)).collect();
                values.sort_unstable();
                for &v in &values {
                    words.push(tdc_words::measurement(channel, v));
                }
                hits.insert(channel, values);
            }

            let chip_words = (words.len() - chip_start + 1) as u32;
            words.push(tdc_words::chip_trailer(chip, event_number, chip_words));
        }
        let event_words = (words.len() - start + 1) as u32;
        words.push(tdc_words::global_trailer(event_words, slot));

        TdcEvent {
            event_number,
            range: start..words.len(),
            hits,
        }
    }

    fn fadc_block(&mut self, events: u32, words: &mut Vec<RawWord>) -> FadcBlock {
        let slot = self.config.slot;
        let block_number = self.block_number;
        self.block_number = (self.block_number + 1) & 0x3FF;
        let start = words.len();

        words.push(fadc_words::block_header(slot, 1, block_number, events));
        words.push(fadc_words::block_header_params(
            100,
            3,
            self.config.window_width.saturating_sub(3),
        ));

        let mut block_events = Vec::with_capacity(events as usize);
        for _ in 0..events {
            let event = self.fadc_event(words);
            block_events.push(event);
        }

        let block_words = (words.len() - start + 1) as u32;
        words.push(fadc_words::block_trailer(slot, block_words));

        FadcBlock {
            block_number,
            range: start..words.len(),
            events: block_events,
        }
    }

    fn fadc_event(&mut self, words: &mut Vec<RawWord>) -> FadcEvent {
        let slot = self.config.slot;
        let event_number = self.next_event_number();
        self.trigger_time += self.rng.gen_range(1_000..100_000);
        self.trigger_time &= 0xFFFF_FFFF_FFFF;

        words.push(fadc_words::event_header(slot, event_number));
        words.extend(fadc_words::trigger_time(self.trigger_time));

        let mut event = FadcEvent {
            event_number,
            trigger_time: self.trigger_time,
            ..Default::default()
        };

        for channel in 0..self.config.fadc_channels.min(16) {
            match self.config.readout {
                FadcReadout::Window => {
                    let samples = self.window_samples();
                    words.push(fadc_words::window_header(channel, samples.len() as u32));
                    words.extend(fadc_words::sample_words(&samples));
                    event.samples.insert(channel, samples);
                }
                FadcReadout::Pulse => {
                    if !self.rng.gen_bool(0.7) {
                        continue;
                    }
                    let pulse = self.pulse_parameters();
                    words.push(fadc_words::pulse_integral(channel, pulse.integral));
                    words.push(fadc_words::pulse_time(
                        channel,
                        pulse.coarse_time,
                        pulse.fine_time,
                    ));
                    words.push(fadc_words::pulse_pedestal(channel, pulse.pedestal, pulse.peak));
                    event.pulses.insert(channel, pulse);
                }
            }
        }

        event
    }

    /// Baseline with a Gaussian-shaped pulse on top
    fn window_samples(&mut self) -> Vec<u32> {
        let width = self.config.window_width.min(0xFFF);
        let amplitude = self.amplitude.sample(&mut self.rng).max(0.0);
        let peak_at = f64::from(width) / 3.0;
        let spread = 2.5;

        (0..width)
            .map(|i| {
                let x = (f64::from(i) - peak_at) / spread;
                let value = self.config.baseline
                    + amplitude * (-0.5 * x * x).exp()
                    + self.noise.sample(&mut self.rng);
                value.round().clamp(0.0, SAMPLE_MAX) as u32
            })
            .collect()
    }

    fn pulse_parameters(&mut self) -> FadcPulse {
        let amplitude = self.amplitude.sample(&mut self.rng).max(0.0);
        let pedestal = (self.config.baseline + self.noise.sample(&mut self.rng))
            .round()
            .clamp(0.0, 511.0) as u32;
        let peak = (f64::from(pedestal) + amplitude).round().clamp(0.0, SAMPLE_MAX) as u32;
        let integral = (amplitude * 8.0).round().clamp(0.0, f64::from(0x7_FFFF)) as u32;

        FadcPulse {
            integral,
            coarse_time: self.rng.gen_range(0..0x400),
            fine_time: self.rng.gen_range(0..0x40),
            pedestal,
            peak,
        }
    }

    fn next_event_number(&mut self) -> u32 {
        self.event_number = (self.event_number + 1) & 0x3F_FFFF;
        self.event_number
    }
}
