//! Repeated decoding of a multi-event word stream
//!
//! A module decodes one event (TDC) or one block (FADC) per `load_slot`
//! call. [`decode_stream`] walks a whole stream call by call, clearing module
//! and sink in between and feeding the shared counters.

use serde::Serialize;
use tracing::{debug, warn};

use super::common::RawWord;
use super::module::{Module, ModuleDecoder, ModuleSnapshot};
use crate::common::{DecodeCounters, DecodeResult};
use crate::slot_data::SlotData;

/// Result of decoding a whole stream with one module
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamSummary {
    /// `load_slot` calls made
    pub calls: usize,
    /// Words consumed
    pub words: usize,
    /// Values stored in module buffers over all calls
    pub stored: usize,
    /// Values dropped over all calls
    pub dropped: usize,
    /// Diagnostics over all calls
    pub diagnostics: usize,
    /// Values accepted by the sink over all calls
    pub sink_values: usize,
    /// One snapshot per call, when requested
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<ModuleSnapshot>,
}

/// Decode `words` to the end, one event or block per call
///
/// A sink rejection stops the stream and is returned; counters up to that
/// point are kept.
pub fn decode_stream(
    module: &mut Module,
    sink: &mut SlotData,
    words: &[RawWord],
    counters: &DecodeCounters,
    keep_snapshots: bool,
) -> DecodeResult<StreamSummary> {
    let mut summary = StreamSummary::default();
    let mut pos = 0;

    while pos < words.len() {
        module.clear();
        sink.clear();

        let consumed = match module.load_slot(sink, &words[pos..]) {
            Ok(n) => n,
            Err(e) => {
                counters.inc_sink_rejections();
                counters.add_words(e.words_seen() as u64);
                warn!(
                    address = %module.address(),
                    position = pos,
                    error = %e,
                    "Decode aborted by slot data"
                );
                return Err(e);
            }
        };
        pos += consumed.max(1);

        let (stored, dropped) = stored_and_dropped(module);
        let diagnostics = module.diagnostics().len();
        if let Module::Fadc250(fadc) = module {
            fadc.check_decoder_status();
        }

        summary.calls += 1;
        summary.words += consumed;
        summary.stored += stored;
        summary.dropped += dropped;
        summary.diagnostics += diagnostics;
        summary.sink_values += sink.num_values();
        if keep_snapshots {
            summary.snapshots.push(module.snapshot());
        }

        counters.inc_calls();
        counters.add_words(consumed as u64);
        counters.add_stored(stored as u64);
        counters.add_dropped(dropped as u64);
        counters.add_diagnostics(diagnostics as u64);
    }

    debug!(
        address = %module.address(),
        calls = summary.calls,
        words = summary.words,
        "Stream decoded"
    );
    Ok(summary)
}

fn stored_and_dropped(module: &Module) -> (usize, usize) {
    match module {
        Module::Tdc1190(m) => (
            m.hits().total_hits(),
            m.dropped_hits() + m.out_of_range_hits(),
        ),
        Module::Fadc250(m) => (m.pulses().total_pulses() + m.pulses().total_samples(), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SinkError;
    use crate::config::DecoderSettings;
    use crate::decoder::common::ModuleAddress;
    use crate::decoder::registry::ModuleRegistry;

    fn tdc_module() -> Module {
        let settings = DecoderSettings {
            tdc_max_hits: 2,
            log_diagnostics: false,
            ..Default::default()
        };
        ModuleRegistry::with_builtin()
            .create(1190, ModuleAddress::new(0, 3), &settings)
            .unwrap()
    }

    fn tdc_event(event: u32, hits: &[(u32, u32)]) -> Vec<u32> {
        let mut words = vec![0x4000_0000 | (event << 5) | 3];
        words.extend(hits.iter().map(|&(ch, v)| (ch << 19) | v));
        words.push(0x8000_0003);
        words
    }

    #[test]
    fn test_decode_two_events() {
        let mut words = tdc_event(1, &[(0, 10), (0, 20), (0, 30)]);
        words.extend(tdc_event(2, &[(5, 99)]));
        let counters = DecodeCounters::new();
        let mut module = tdc_module();
        let mut sink = SlotData::new(100);

        let summary = decode_stream(&mut module, &mut sink, &words, &counters, true).unwrap();
        assert_eq!(summary.calls, 2);
        assert_eq!(summary.words, words.len());
        assert_eq!(summary.stored, 3);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.sink_values, 4);
        assert_eq!(summary.snapshots.len(), 2);

        // Module holds the last event only
        let tdc = module.as_tdc1190().unwrap();
        assert_eq!(tdc.event_number(), 2);
        assert_eq!(tdc.num_hits(0), 0);
        assert_eq!(tdc.data(5, 0), 99);

        let snap = counters.snapshot();
        assert_eq!(snap.calls, 2);
        assert_eq!(snap.words, words.len() as u64);
        assert_eq!(snap.dropped, 1);
    }

    #[test]
    fn test_sink_rejection_stops_stream() {
        let words = tdc_event(1, &[(0, 1), (1, 2), (2, 3)]);
        let counters = DecodeCounters::new();
        let mut module = tdc_module();
        let mut sink = SlotData::new(2);

        let err = decode_stream(&mut module, &mut sink, &words, &counters, false).unwrap_err();
        assert_eq!(err.words_seen(), 4);
        assert!(matches!(
            err,
            crate::common::DecodeError::SinkRejected {
                source: SinkError::Full { max: 2 },
                ..
            }
        ));
        assert_eq!(counters.snapshot().sink_rejections, 1);
        assert_eq!(counters.snapshot().calls, 0);
    }

    #[test]
    fn test_empty_stream() {
        let counters = DecodeCounters::new();
        let mut module = tdc_module();
        let mut sink = SlotData::new(1);
        let summary = decode_stream(&mut module, &mut sink, &[], &counters, false).unwrap();
        assert_eq!(summary.calls, 0);
        assert!(summary.snapshots.is_empty());
    }
}
