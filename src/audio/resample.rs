//! Sample-rate conversion from the device rate to 16 kHz.
//!
//! With `high-quality-audio` a rubato sinc resampler is tried first; any
//! failure falls back to an FIR low-pass plus linear interpolation, logged once.

use super::TARGET_RATE;
use crate::log_debug;
#[cfg(feature = "high-quality-audio")]
use anyhow::{anyhow, Result};
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};

pub(super) const MIN_DEVICE_RATE: u32 = 2_000;
pub(super) const MAX_DEVICE_RATE: u32 = 1_600_000;
const MAX_FIR_TAPS: usize = 129;

static FALLBACK_LOGGED: AtomicBool = AtomicBool::new(false);

pub(super) fn resample_to_target_rate(input: &[f32], device_rate: u32) -> Vec<f32> {
    if input.is_empty() || device_rate == 0 || device_rate == TARGET_RATE {
        return input.to_vec();
    }

    #[cfg(feature = "high-quality-audio")]
    match resample_with_rubato(input, device_rate) {
        Ok(output) => return output,
        Err(err) => {
            if !FALLBACK_LOGGED.swap(true, Ordering::AcqRel) {
                log_debug(&format!("rubato resampler failed ({err}); using FIR fallback"));
            }
        }
    }
    #[cfg(not(feature = "high-quality-audio"))]
    if !FALLBACK_LOGGED.swap(true, Ordering::AcqRel) {
        log_debug("resampling with FIR fallback (high-quality-audio disabled)");
    }

    basic_resample(input, device_rate)
}

#[cfg(feature = "high-quality-audio")]
fn resample_with_rubato(input: &[f32], device_rate: u32) -> Result<Vec<f32>> {
    if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) {
        return Err(anyhow!("unsupported device sample rate {device_rate}Hz"));
    }
    let ratio = TARGET_RATE as f64 / device_rate as f64;
    let chunk = 256usize;
    let params = InterpolationParameters {
        sinc_len: 64,
        f_cutoff: 0.90,
        interpolation: InterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk, 1)
        .map_err(|err| anyhow!("failed to construct sinc resampler: {err:?}"))?;

    let expected = ((input.len() as f64) * ratio).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(expected + chunk);
    let mut segment = vec![0.0f32; chunk];
    for block in input.chunks(chunk) {
        // Pad the final short block with its last sample.
        segment.fill(block.last().copied().unwrap_or(0.0));
        segment[..block.len()].copy_from_slice(block);
        let produced = resampler
            .process(std::slice::from_ref(&segment), None)
            .map_err(|err| anyhow!("resampler process failed: {err:?}"))?;
        out.extend_from_slice(&produced[0]);
    }
    Ok(adjust_frame_length(out, expected))
}

pub(super) fn basic_resample(input: &[f32], device_rate: u32) -> Vec<f32> {
    if input.is_empty() || !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) {
        return input.to_vec();
    }
    let ratio = TARGET_RATE as f32 / device_rate as f32;
    if device_rate > TARGET_RATE {
        let filtered = low_pass_fir(input, device_rate, fir_taps(device_rate));
        resample_linear(&filtered, ratio)
    } else {
        resample_linear(input, ratio)
    }
}

pub(super) fn resample_linear(input: &[f32], ratio: f32) -> Vec<f32> {
    let output_len = (input.len() as f32 * ratio).round() as usize;
    let last = input.last().copied().unwrap_or(0.0);
    (0..output_len)
        .map(|i| {
            let position = i as f32 / ratio;
            let idx = position.floor() as usize;
            let frac = position - idx as f32;
            match (input.get(idx), input.get(idx + 1)) {
                (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                _ => last,
            }
        })
        .collect()
}

/// Odd tap count that grows with the decimation ratio.
pub(super) fn fir_taps(device_rate: u32) -> usize {
    let decimation = device_rate as f32 / TARGET_RATE as f32;
    let taps = ((decimation * 4.0).ceil() as usize).max(11) | 1;
    taps.min(MAX_FIR_TAPS)
}

/// Hamming-windowed sinc low-pass at the target Nyquist, normalized to unit gain.
pub(super) fn low_pass_fir(input: &[f32], device_rate: u32, taps: usize) -> Vec<f32> {
    if taps <= 1 {
        return input.to_vec();
    }
    let cutoff = (TARGET_RATE as f32 * 0.5 / device_rate as f32).min(0.499);
    let m = (taps - 1) as f32;
    let mut coeffs: Vec<f32> = (0..taps)
        .map(|n| {
            let centered = n as f32 - m / 2.0;
            let sinc = if centered == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * centered).sin() / (PI * centered)
            };
            sinc * (0.54 - 0.46 * (2.0 * PI * n as f32 / m).cos())
        })
        .collect();
    let sum: f32 = coeffs.iter().sum();
    if sum != 0.0 {
        coeffs.iter_mut().for_each(|c| *c /= sum);
    }

    let half = taps / 2;
    (0..input.len())
        .map(|n| {
            coeffs
                .iter()
                .enumerate()
                .filter_map(|(k, coeff)| {
                    (n + k)
                        .checked_sub(half)
                        .and_then(|idx| input.get(idx))
                        .map(|sample| sample * coeff)
                })
                .sum()
        })
        .collect()
}

/// Resample one device frame and force it to exactly `desired_len` samples.
pub(super) fn convert_frame_to_target(frame: Vec<f32>, device_rate: u32, desired_len: usize) -> Vec<f32> {
    if device_rate == TARGET_RATE {
        return adjust_frame_length(frame, desired_len);
    }
    adjust_frame_length(resample_to_target_rate(&frame, device_rate), desired_len)
}

/// Truncate, or pad with the last sample.
pub(super) fn adjust_frame_length(mut data: Vec<f32>, desired: usize) -> Vec<f32> {
    let pad = data.last().copied().unwrap_or(0.0);
    data.resize(desired, pad);
    data
}
