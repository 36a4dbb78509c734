//! VFFR session entrypoint: parse flags, open the hardware, run one session.
//!
//! The session itself lives in the library; this binary only wires the real
//! clock, microphone, speakers, terminal and annotation scripts into it.

mod cli_utils;

use anyhow::{Context, Result};
use std::process::ExitCode;
use vffr::annotation::ShellPipeline;
use vffr::audio::{Microphone, SpeakerPlayback};
use vffr::clock::SystemClock;
use vffr::config::AppConfig;
use vffr::presentation::{Key, Operator, Terminal};
use vffr::session::{SessionDevices, SessionOrchestrator};
use vffr::storage::DataLayout;
use vffr::timeline::{random_seed, Timeline};
use vffr::wordpool::{NumberingIndex, WordList};
use vffr::{init_logging, init_tracing, log_debug, log_file_path};

use crate::cli_utils::{format_report, list_input_devices};

/// Exit status when the operator cancels during the microphone check.
const EXIT_ABORTED: u8 = 2;

fn main() -> Result<ExitCode> {
    let config = AppConfig::parse_args()?;
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(&config);
    init_tracing(&config);
    log_debug("=== VFFR Session Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let words = WordList::load(&config.word_pool)
        .with_context(|| format!("loading word pool {}", config.word_pool.display()))?;
    let numbering = NumberingIndex::load(&config.numbering_pool).with_context(|| {
        format!("loading numbering pool {}", config.numbering_pool.display())
    })?;
    let seed = config.seed.unwrap_or_else(random_seed);
    log_debug(&format!("session seed: {seed}"));

    let mut pipeline = ShellPipeline::from_config(&config)?;
    if pipeline.is_disabled() {
        log_debug("annotation scripts not configured; recognition disabled");
    }
    let mut microphone =
        Microphone::open(config.input_device.as_deref(), &config.voice_pipeline_config())?;
    log_debug(&format!("input device: {}", microphone.device_name()));
    let voice = microphone.voice();
    let mut playback = SpeakerPlayback::open()?;

    let mut orchestrator = SessionOrchestrator::new(
        config.protocol(),
        DataLayout::new(&config.data_root, &config.experiment),
        Timeline::new(SystemClock::new(), seed),
        words,
        numbering,
    )
    .with_subject(config.subject.clone());

    let mut terminal = Terminal::open()?;
    let outcome = {
        let mut devices = SessionDevices::new(
            &mut terminal,
            &mut microphone,
            &mut playback,
            &voice,
            &mut pipeline,
        );
        orchestrator.run(&mut devices)
    };
    if outcome.is_ok() {
        terminal.wait_for_keys(&[Key::Return])?;
    }
    drop(terminal);

    if microphone.dropped_frames() > 0 {
        log_debug(&format!(
            "voice monitor dropped {} frames",
            microphone.dropped_frames()
        ));
    }

    match outcome {
        Ok(report) => {
            let summary = format_report(&report);
            log_debug(&summary);
            println!("{summary}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_abort() => {
            log_debug(&format!("session aborted: {err}"));
            eprintln!("{err}");
            Ok(ExitCode::from(EXIT_ABORTED))
        }
        Err(err) => {
            log_debug(&format!("session failed: {err}"));
            Err(err.into())
        }
    }
}
