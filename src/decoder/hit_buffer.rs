//! Fixed-capacity per-channel hit storage for multi-hit TDCs

/// What happened to a value offered to a [`ChannelHitBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Stored,
    /// Channel already holds `max_hits` values
    Dropped,
    /// Channel index outside the buffer
    OutOfRange,
}

/// Per-channel ordered hit values with a fixed capacity per channel
///
/// Storage is allocated once at construction. Values beyond the capacity are
/// dropped, and the hit count only reflects stored values.
#[derive(Debug, Clone)]
pub struct ChannelHitBuffer {
    max_hits: usize,
    hits: Vec<Vec<u32>>,
}

impl ChannelHitBuffer {
    pub fn new(n_channels: usize, max_hits: usize) -> Self {
        Self {
            max_hits,
            hits: (0..n_channels)
                .map(|_| Vec::with_capacity(max_hits))
                .collect(),
        }
    }

    pub fn n_channels(&self) -> usize {
        self.hits.len()
    }

    pub fn max_hits(&self) -> usize {
        self.max_hits
    }

    /// Append a value to a channel
    pub fn push(&mut self, channel: usize, value: u32) -> PushOutcome {
        let max_hits = self.max_hits;
        match self.hits.get_mut(channel) {
            None => PushOutcome::OutOfRange,
            Some(hits) if hits.len() >= max_hits => PushOutcome::Dropped,
            Some(hits) => {
                hits.push(value);
                PushOutcome::Stored
            }
        }
    }

    /// Stored value, or 0 when the channel or hit does not exist
    pub fn get(&self, channel: usize, hit: usize) -> u32 {
        self.hits
            .get(channel)
            .and_then(|hits| hits.get(hit))
            .copied()
            .unwrap_or(0)
    }

    pub fn num_hits(&self, channel: usize) -> usize {
        self.hits.get(channel).map_or(0, Vec::len)
    }

    /// All stored values of a channel in arrival order
    pub fn hits(&self, channel: usize) -> &[u32] {
        self.hits.get(channel).map_or(&[], Vec::as_slice)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.iter().map(Vec::len).sum()
    }

    /// Iterate over channels that hold at least one value
    pub fn channels_with_hits(&self) -> impl Iterator<Item = (usize, &[u32])> {
        self.hits
            .iter()
            .enumerate()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(ch, hits)| (ch, hits.as_slice()))
    }

    /// Reset every channel to zero hits, keeping the allocation
    pub fn clear(&mut self) {
        for hits in &mut self.hits {
            hits.clear();
        }
    }
}
