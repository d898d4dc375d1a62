//! Slot data sink receiving decoded values
//!
//! Decoders forward every decoded value to a [`SlotSink`]. A rejection by the
//! sink aborts the running decode call.

use crate::common::SinkError;
use serde::Serialize;

/// Receiver of decoded `(kind, channel, value1, value2)` observations
pub trait SlotSink {
    fn submit(&mut self, kind: &str, channel: u32, value1: u32, value2: u32)
        -> Result<(), SinkError>;
}

/// Sink that accepts and discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SlotSink for NullSink {
    fn submit(&mut self, _: &str, _: u32, _: u32, _: u32) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One value stored by [`SlotData`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotValue {
    pub kind: String,
    pub channel: u32,
    pub value1: u32,
    pub value2: u32,
}

/// Bounded store of submitted values for one slot
///
/// Once `max_values` values are stored, every further submission is rejected
/// with [`SinkError::Full`].
#[derive(Debug, Clone)]
pub struct SlotData {
    max_values: usize,
    values: Vec<SlotValue>,
}

impl SlotData {
    pub fn new(max_values: usize) -> Self {
        Self {
            max_values,
            values: Vec::new(),
        }
    }

    pub fn max_values(&self) -> usize {
        self.max_values
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[SlotValue] {
        &self.values
    }

    /// Values submitted for one channel, in submission order
    pub fn channel_values(&self, channel: u32) -> impl Iterator<Item = &SlotValue> {
        self.values.iter().filter(move |v| v.channel == channel)
    }

    /// Number of distinct channels with at least one value
    pub fn num_channels_hit(&self) -> usize {
        let mut channels: Vec<u32> = self.values.iter().map(|v| v.channel).collect();
        channels.sort_unstable();
        channels.dedup();
        channels.len()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl SlotSink for SlotData {
    fn submit(
        &mut self,
        kind: &str,
        channel: u32,
        value1: u32,
        value2: u32,
    ) -> Result<(), SinkError> {
        if self.values.len() >= self.max_values {
            return Err(SinkError::Full {
                max: self.max_values,
            });
        }
        self.values.push(SlotValue {
            kind: kind.to_string(),
            channel,
            value1,
            value2,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_accepts() {
        let mut sink = NullSink;
        assert!(sink.submit("tdc", 1, 2, 2).is_ok());
    }

    #[test]
    fn test_slot_data_stores_in_order() {
        let mut sd = SlotData::new(10);
        sd.submit("tdc", 3, 100, 100).unwrap();
        sd.submit("tdc", 1, 200, 200).unwrap();
        sd.submit("tdc", 3, 300, 300).unwrap();

        assert_eq!(sd.num_values(), 3);
        assert_eq!(sd.num_channels_hit(), 2);
        let ch3: Vec<u32> = sd.channel_values(3).map(|v| v.value1).collect();
        assert_eq!(ch3, vec![100, 300]);
        assert_eq!(sd.values()[1].kind, "tdc");
    }

    #[test]
    fn test_slot_data_rejects_when_full() {
        let mut sd = SlotData::new(2);
        sd.submit("adc", 0, 1, 1).unwrap();
        sd.submit("adc", 0, 2, 2).unwrap();
        let err = sd.submit("adc", 0, 3, 3).unwrap_err();
        assert_eq!(err, SinkError::Full { max: 2 });
        assert_eq!(sd.num_values(), 2);
    }

    #[test]
    fn test_slot_data_clear() {
        let mut sd = SlotData::new(1);
        sd.submit("adc", 0, 1, 1).unwrap();
        sd.clear();
        assert_eq!(sd.num_values(), 0);
        assert!(sd.submit("adc", 0, 1, 1).is_ok());
        assert_eq!(sd.max_values(), 1);
    }
}
