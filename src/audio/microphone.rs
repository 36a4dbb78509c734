//! Live microphone via CPAL.
//!
//! One input stream stays open for the whole session. The callback re-chunks
//! audio into VAD frames; the monitor thread classifies them and fills the
//! capture buffer while a recording is open, so voice activity keeps flowing
//! whether or not a response is being saved.

use super::dispatch::FrameDispatcher;
use super::monitor::{CaptureBuffer, VoiceMonitor};
use super::wav::write_wav;
use super::{AudioRecorder, TARGET_RATE};
use crate::config::VoicePipelineConfig;
use crate::voice::SpeechFlag;
use crate::{lock_or_recover, log_debug};
use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::bounded;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub struct Microphone {
    device_name: String,
    stream: Option<cpal::Stream>,
    capture: Arc<Mutex<CaptureBuffer>>,
    flag: SpeechFlag,
    dropped: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
}

impl Microphone {
    /// Names of every input device the default host exposes.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        Ok(devices.filter_map(|device| device.name().ok()).collect())
    }

    /// Open `preferred` (or the default input) and start monitoring voice activity.
    pub fn open(preferred: Option<&str>, cfg: &VoicePipelineConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred {
            Some(name) => host
                .input_devices()
                .context("no input devices available")?
                .find(|device| device.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("input device '{name}' not found"))?,
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());

        let default_config = device.default_input_config()?;
        let format = default_config.sample_format();
        let stream_config: StreamConfig = default_config.into();
        let device_rate = stream_config.sample_rate.0;
        let channels = usize::from(stream_config.channels.max(1));
        let frame_ms = cfg.vad_frame_ms.clamp(5, 120);
        let device_frame_samples = ((device_rate as u64 * frame_ms) / 1000).max(1) as usize;
        log_debug(&format!(
            "microphone '{device_name}': format={format:?} rate={device_rate}Hz channels={channels}"
        ));

        let (sender, receiver) = bounded::<Vec<f32>>(cfg.channel_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(Mutex::new(FrameDispatcher::new(
            device_frame_samples,
            sender,
            dropped.clone(),
        )));

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(
                &device,
                &stream_config,
                &dispatcher,
                &dropped,
                channels,
                |sample| sample,
            )?,
            SampleFormat::I16 => build_stream::<i16>(
                &device,
                &stream_config,
                &dispatcher,
                &dropped,
                channels,
                |sample| sample as f32 / 32_768.0,
            )?,
            SampleFormat::U16 => build_stream::<u16>(
                &device,
                &stream_config,
                &dispatcher,
                &dropped,
                channels,
                |sample| (sample as f32 - 32_768.0) / 32_768.0,
            )?,
            other => bail!("unsupported sample format: {other:?}"),
        };

        let capture = Arc::new(Mutex::new(CaptureBuffer::default()));
        let flag = SpeechFlag::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let monitor = VoiceMonitor::new(cfg, device_rate, flag.clone(), capture.clone());
        log_debug(&format!("microphone monitor using {}", monitor.vad_name()));
        let monitor_shutdown = shutdown.clone();
        let handle = thread::Builder::new()
            .name("vffr-voice-monitor".to_string())
            .spawn(move || monitor.run(receiver, monitor_shutdown))
            .context("failed to spawn voice monitor thread")?;

        stream.play().context("failed to start input stream")?;

        Ok(Self {
            device_name,
            stream: Some(stream),
            capture,
            flag,
            dropped,
            shutdown,
            monitor: Some(handle),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Voice activity handle for the recall windows.
    pub fn voice(&self) -> SpeechFlag {
        self.flag.clone()
    }

    pub fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    dispatcher: &Arc<Mutex<FrameDispatcher>>,
    dropped: &Arc<AtomicUsize>,
    channels: usize,
    convert: fn(T) -> f32,
) -> Result<cpal::Stream>
where
    T: SizedSample + Copy + 'static,
{
    let dispatcher = dispatcher.clone();
    let dropped = dropped.clone();
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // Never block the audio callback; a contended frame is counted as dropped.
            if let Ok(mut pump) = dispatcher.try_lock() {
                pump.push(data, channels, convert);
            } else {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        },
        |err| log_debug(&format!("audio_stream_error: {err}")),
        None,
    )?;
    Ok(stream)
}

impl AudioRecorder for Microphone {
    fn start_recording(&mut self) -> Result<()> {
        let mut capture = lock_or_recover(&self.capture, "microphone_capture");
        if capture.is_recording() {
            bail!("recording already in progress on '{}'", self.device_name);
        }
        capture.start();
        Ok(())
    }

    fn stop_recording(&mut self, path: &Path) -> Result<()> {
        let samples = {
            let mut capture = lock_or_recover(&self.capture, "microphone_capture");
            if !capture.is_recording() {
                bail!("no recording in progress on '{}'", self.device_name);
            }
            capture.finish()
        };
        if samples.is_empty() {
            log_debug(&format!(
                "microphone '{}' captured no samples for {}",
                self.device_name,
                path.display()
            ));
        }
        write_wav(path, &samples, TARGET_RATE)
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                log_debug(&format!("failed to pause input stream: {err}"));
            }
        }
        if let Some(handle) = self.monitor.take() {
            let _ = handle.join();
        }
        let dropped = self.dropped_frames();
        if dropped > 0 {
            log_debug(&format!("microphone dropped {dropped} frames"));
        }
    }
}
