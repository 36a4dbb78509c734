use super::context::SessionContext;
use super::devices::SessionDevices;
use super::error::{AdapterResultExt, SessionError, SessionResult};
use super::messages::{
    press_keys, MICROPHONE_TEST_BANNER, MICROPHONE_TEST_CONFIRMATION, MICROPHONE_TEST_PLAYING,
    MICROPHONE_TEST_PROMPT, MICROPHONE_TEST_RECORDING, MISSING_RECORDING_WARNING,
};
use super::phase::SessionPhase;
use crate::audio::Clip;
use crate::clock::Clock;
use crate::config::ProtocolConfig;
use crate::events::SessionEvent;
use crate::log_debug;
use crate::presentation::{Highlight, Key, MicCheckChoice};
use crate::timeline::{Timeline, Wait};
use std::path::PathBuf;
use std::time::Duration;

const PHASE: SessionPhase = SessionPhase::MicrophoneCheck;
const PAUSE_BEFORE_PLAYBACK: Duration = Duration::from_secs(1);

/// Record, play back and confirm until the operator continues or aborts.
/// Returns the last test recording.
pub(crate) fn run_microphone_check<C: Clock>(
    timeline: &mut Timeline<C>,
    ctx: &mut SessionContext,
    devices: &mut SessionDevices<'_>,
    protocol: &ProtocolConfig,
    beep: &Clip,
) -> SessionResult<PathBuf> {
    devices
        .ui
        .set_banner(Some(MICROPHONE_TEST_BANNER))
        .interface(PHASE)?;

    let mut attempt = 0;
    let recording = loop {
        attempt += 1;
        press_keys(devices.ui, PHASE, MICROPHONE_TEST_PROMPT, &[Key::Space])?;

        devices.playback.play(beep).resource(PHASE, None)?;
        devices
            .ui
            .display("microphone test recording", MICROPHONE_TEST_RECORDING)
            .interface(PHASE)?;
        devices.ui.set_highlight(Highlight::Red).interface(PHASE)?;
        timeline.wait(Wait::Fixed(beep.length()));

        let path = ctx.paths().microphone_test_wav(timeline.wall_ms());
        devices.recorder.start(PHASE, None)?;
        let started = ctx.emit(
            timeline.wall_ms(),
            SessionEvent::MicrophoneTestStart { attempt },
        );
        devices.recorder.close_on_error(started, &path, PHASE, None)?;
        timeline.wait(Wait::Fixed(protocol.mic_test_length));
        devices.recorder.stop(&path, PHASE, None)?;
        ctx.emit(
            timeline.wall_ms(),
            SessionEvent::MicrophoneTestStop {
                attempt,
                path: path.display().to_string(),
            },
        )?;
        devices.ui.clear().interface(PHASE)?;
        timeline.wait(Wait::Fixed(PAUSE_BEFORE_PLAYBACK));

        devices
            .ui
            .display("microphone test playing", MICROPHONE_TEST_PLAYING)
            .interface(PHASE)?;
        devices.ui.set_highlight(Highlight::Green).interface(PHASE)?;
        let clip = devices.playback.load_clip(&path).resource(PHASE, None)?;
        devices.playback.play(&clip).resource(PHASE, None)?;
        timeline.wait(Wait::Fixed(protocol.mic_test_length));
        devices.ui.clear().interface(PHASE)?;
        devices
            .ui
            .set_highlight(Highlight::Original)
            .interface(PHASE)?;

        devices
            .ui
            .display("microphone test confirmation", MICROPHONE_TEST_CONFIRMATION)
            .interface(PHASE)?;
        let choice = devices.ui.mic_check_choice().interface(PHASE)?;
        devices.ui.clear().interface(PHASE)?;
        ctx.emit(
            timeline.wall_ms(),
            SessionEvent::MicrophoneTestResponse {
                attempt,
                response: choice.label().to_string(),
            },
        )?;
        log_debug(&format!(
            "microphone test attempt {attempt}: {}",
            choice.label()
        ));

        match choice {
            MicCheckChoice::Continue => break path,
            MicCheckChoice::Retry => continue,
            MicCheckChoice::Abort => {
                devices.ui.set_banner(None).interface(PHASE)?;
                return Err(SessionError::Aborted { phase: PHASE });
            }
        }
    };

    if !recording.exists() {
        tracing::warn!(path = %recording.display(), "microphone test recording missing");
        press_keys(devices.ui, PHASE, MISSING_RECORDING_WARNING, &[Key::Return])?;
    }
    devices.ui.set_banner(None).interface(PHASE)?;
    Ok(recording)
}
