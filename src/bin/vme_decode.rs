//! vme-decode - decode raw VME module data files
//!
//! Usage:
//!   vme-decode decode -f config.toml [--json]
//!   vme-decode inspect <file> --type-id 1190 [--limit 40]
//!   vme-decode emulate --type-id 250 --events 100 --seed 7 -o fadc.bin
//!   vme-decode types

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vme_decode::common::cli::{Cli, Commands, DecodeArgs, EmulateArgs, InspectArgs};
use vme_decode::common::DecodeCounters;
use vme_decode::config::{Config, DecoderSettings, ModuleConfig};
use vme_decode::decoder::common::{words_from_le_bytes, words_to_le_bytes, ModuleAddress};
use vme_decode::decoder::{
    decode_stream, fadc250, tdc1190, Fadc250Config, Fadc250Module, ModuleDecoder, ModuleRegistry,
    StreamSummary,
};
use vme_decode::emulator::{EmulatorConfig, WordStreamEmulator};
use vme_decode::slot_data::SlotData;

fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging); stdout is kept for results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vme_decode=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = ModuleRegistry::with_builtin();

    match cli.command {
        Commands::Decode(args) => run_decode(&registry, &args),
        Commands::Inspect(args) => run_inspect(&registry, &args),
        Commands::Emulate(args) => run_emulate(&args),
        Commands::Types => {
            for t in registry.types() {
                println!("{:>6}  {}", t.type_id, t.name);
            }
            Ok(())
        }
    }
}

// =============================================================================
// decode
// =============================================================================

#[derive(Debug, Serialize)]
struct ModuleReport {
    name: String,
    module: &'static str,
    type_id: u32,
    address: ModuleAddress,
    #[serde(flatten)]
    summary: StreamSummary,
}

fn run_decode(registry: &ModuleRegistry, args: &DecodeArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.common.config_file)
        .with_context(|| format!("Failed to load config {}", args.common.config_file))?;
    let counters = Arc::new(DecodeCounters::new());
    let start = Instant::now();

    info!(
        config = %args.common.config_file,
        modules = config.modules.len(),
        "Decoding configured modules"
    );

    // Module instances share nothing, so each one gets its own thread
    let results: Vec<(String, anyhow::Result<Option<ModuleReport>>)> = std::thread::scope(|s| {
        let handles: Vec<_> = config
            .modules
            .iter()
            .map(|module| {
                let counters = Arc::clone(&counters);
                let settings = &config.decoder;
                let handle = s.spawn(move || {
                    decode_module(registry, settings, module, &counters, args.json)
                });
                (module.name.clone(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("decoder thread panicked")));
                (name, result)
            })
            .collect()
    });

    let mut reports = Vec::new();
    let mut failures = 0;
    for (name, result) in results {
        match result {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(e) => {
                error!(module = %name, "Decode failed: {:#}", e);
                failures += 1;
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for r in &reports {
            println!(
                "{:<16} {:<22} {}: {} calls, {} words, {} stored, {} dropped, {} diagnostics",
                r.name,
                r.module,
                r.address,
                r.summary.calls,
                r.summary.words,
                r.summary.stored,
                r.summary.dropped,
                r.summary.diagnostics
            );
        }
    }

    let snap = counters.snapshot();
    let elapsed = start.elapsed().as_secs_f64();
    info!(
        calls = snap.calls,
        words = snap.words,
        stored = snap.stored,
        dropped = snap.dropped,
        diagnostics = snap.diagnostics,
        rate = %snap.format_word_rate(elapsed),
        "Decoding finished"
    );

    if failures > 0 {
        bail!("{} module(s) failed to decode", failures);
    }
    Ok(())
}

fn decode_module(
    registry: &ModuleRegistry,
    settings: &DecoderSettings,
    module_config: &ModuleConfig,
    counters: &DecodeCounters,
    keep_snapshots: bool,
) -> anyhow::Result<Option<ModuleReport>> {
    let Some(input) = module_config.input.as_deref() else {
        warn!(module = %module_config.name, "No input file configured, skipping");
        return Ok(None);
    };

    let words = read_words(input)?;
    let mut module = registry.create(
        module_config.type_id,
        module_config.address(),
        settings,
    )?;
    let mut sink = SlotData::new(settings.sink_max_values);

    let summary = decode_stream(&mut module, &mut sink, &words, counters, keep_snapshots)
        .with_context(|| format!("Module {} ({})", module_config.name, input.display()))?;

    Ok(Some(ModuleReport {
        name: module_config.name.clone(),
        module: module.name(),
        type_id: module.type_id(),
        address: module.address(),
        summary,
    }))
}

// =============================================================================
// inspect
// =============================================================================

fn run_inspect(registry: &ModuleRegistry, args: &InspectArgs) -> anyhow::Result<()> {
    if !registry.contains(args.type_id) {
        bail!("No module registered for type id {}", args.type_id);
    }

    let words = read_words(&args.file)?;
    let limit = args.limit.unwrap_or(words.len());

    match args.type_id {
        tdc1190::TYPE_ID => {
            for (i, &word) in words.iter().take(limit).enumerate() {
                println!("{:>8}  0x{:08x}  {:?}", i, word, tdc1190::classify_word(word));
            }
        }
        fadc250::TYPE_ID => {
            // Continuation words need decode context
            let mut module = Fadc250Module::new(
                ModuleAddress::default(),
                Fadc250Config {
                    log_diagnostics: false,
                    ..Default::default()
                },
            );
            for (i, &word) in words.iter().take(limit).enumerate() {
                println!("{:>8}  0x{:08x}  {:?}", i, word, module.decode_word(word));
            }
        }
        other => bail!("Inspect not supported for type id {}", other),
    }
    Ok(())
}

// =============================================================================
// emulate
// =============================================================================

fn run_emulate(args: &EmulateArgs) -> anyhow::Result<()> {
    let config = EmulatorConfig {
        slot: args.slot,
        readout: args.fadc,
        ..Default::default()
    };
    let mut emulator = WordStreamEmulator::new(config, args.seed)?;

    let words = match args.type_id {
        tdc1190::TYPE_ID => emulator.tdc_stream(args.events).words,
        fadc250::TYPE_ID => emulator.fadc_stream(args.events).words,
        other => bail!("Emulation not supported for type id {}", other),
    };

    std::fs::write(&args.output, words_to_le_bytes(&words))
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        type_id = args.type_id,
        events = args.events,
        words = words.len(),
        output = %args.output.display(),
        "Stream written"
    );
    Ok(())
}

fn read_words(path: &Path) -> anyhow::Result<Vec<u32>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if bytes.len() % 4 != 0 {
        warn!(
            file = %path.display(),
            trailing = bytes.len() % 4,
            "File size is not a multiple of 4, ignoring trailing bytes"
        );
    }
    Ok(words_from_le_bytes(&bytes))
}
