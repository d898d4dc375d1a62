//! Per-channel pulse records and raw samples for flash ADCs

use serde::Serialize;

/// One reconstructed pulse
///
/// Fields stay `None` until the corresponding hardware word arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PulseRecord {
    /// Pulse number within the event as reported by the hardware (0-3)
    pub pulse_number: u32,
    /// Sample number of the threshold crossing (pulse raw data mode)
    pub threshold_sample: Option<u32>,
    pub quality_factor: Option<u32>,
    pub integral: Option<u32>,
    pub coarse_time: Option<u32>,
    pub fine_time: Option<u32>,
    /// Combined time, `coarse << 6 | fine`, in units of 62.5 ps
    pub time: Option<u32>,
    pub peak: Option<u32>,
    pub pedestal: Option<u32>,
    /// Raw samples belonging to this pulse (pulse raw data mode)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<u32>,
}

impl PulseRecord {
    pub fn new(pulse_number: u32) -> Self {
        Self {
            pulse_number,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ChannelPulses {
    pulses: Vec<PulseRecord>,
    /// Index of the first record belonging to the open event
    open_from: usize,
    samples: Vec<u32>,
}

/// Pulse records and raw samples for every channel of a module
#[derive(Debug, Clone)]
pub struct PulseBuffer {
    channels: Vec<ChannelPulses>,
}

impl PulseBuffer {
    pub fn new(n_channels: usize) -> Self {
        Self {
            channels: vec![ChannelPulses::default(); n_channels],
        }
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Open a new record for a channel; `None` if the channel is out of range
    pub fn open(&mut self, channel: usize, pulse_number: u32) -> Option<&mut PulseRecord> {
        let ch = self.channels.get_mut(channel)?;
        ch.pulses.push(PulseRecord::new(pulse_number));
        ch.pulses.last_mut()
    }

    /// Open record of the current event with this pulse number whose field is
    /// still empty, or a fresh record when there is none
    pub fn attach(
        &mut self,
        channel: usize,
        pulse_number: u32,
        is_filled: impl Fn(&PulseRecord) -> bool,
    ) -> Option<&mut PulseRecord> {
        let ch = self.channels.get_mut(channel)?;
        let found = ch.pulses[ch.open_from..]
            .iter()
            .rposition(|p| p.pulse_number == pulse_number && !is_filled(p));
        match found {
            Some(offset) => ch.pulses.get_mut(ch.open_from + offset),
            None => {
                ch.pulses.push(PulseRecord::new(pulse_number));
                ch.pulses.last_mut()
            }
        }
    }

    /// Most recently opened record of a channel
    pub fn latest_mut(&mut self, channel: usize) -> Option<&mut PulseRecord> {
        let ch = self.channels.get_mut(channel)?;
        ch.pulses[ch.open_from..].last_mut()
    }

    /// Append a raw sample to a channel's sample sequence
    pub fn push_sample(&mut self, channel: usize, sample: u32) -> bool {
        match self.channels.get_mut(channel) {
            Some(ch) => {
                ch.samples.push(sample);
                true
            }
            None => false,
        }
    }

    /// Close every open record; later field words start new records
    pub fn commit(&mut self) {
        for ch in &mut self.channels {
            ch.open_from = ch.pulses.len();
        }
    }

    pub fn pulse(&self, channel: usize, index: usize) -> Option<&PulseRecord> {
        self.channels.get(channel)?.pulses.get(index)
    }

    pub fn pulses(&self, channel: usize) -> &[PulseRecord] {
        self.channels.get(channel).map_or(&[], |ch| ch.pulses.as_slice())
    }

    pub fn num_pulses(&self, channel: usize) -> usize {
        self.channels.get(channel).map_or(0, |ch| ch.pulses.len())
    }

    pub fn samples(&self, channel: usize) -> &[u32] {
        self.channels.get(channel).map_or(&[], |ch| ch.samples.as_slice())
    }

    /// One raw sample, or 0 when it does not exist
    pub fn sample(&self, channel: usize, index: usize) -> u32 {
        self.samples(channel).get(index).copied().unwrap_or(0)
    }

    pub fn num_samples(&self, channel: usize) -> usize {
        self.samples(channel).len()
    }

    /// Integral computed from the channel's raw samples
    ///
    /// Always recomputed from the stored samples.
    pub fn emulated_integral(&self, channel: usize) -> u64 {
        self.samples(channel).iter().map(|&s| u64::from(s)).sum()
    }

    pub fn total_pulses(&self) -> usize {
        self.channels.iter().map(|ch| ch.pulses.len()).sum()
    }

    pub fn total_samples(&self) -> usize {
        self.channels.iter().map(|ch| ch.samples.len()).sum()
    }

    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.pulses.clear();
            ch.samples.clear();
            ch.open_from = 0;
        }
    }
}
