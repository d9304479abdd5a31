use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::features::Waveform;
use crate::error::DeriveError;

/// Resample a mono waveform to `target_rate` using rubato. Waveforms already
/// at the target rate are returned as-is.
pub fn resample(wave: &Waveform, target_rate: u32) -> Result<Waveform, DeriveError> {
    if wave.sample_rate == target_rate || wave.is_empty() {
        return Ok(Waveform::new(wave.samples.clone(), target_rate));
    }

    let fail = |reason: String| DeriveError::Resample {
        target: target_rate,
        reason,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / wave.sample_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0, // max relative ratio
        params,
        wave.len(),
        1, // mono
    )
    .map_err(|e| fail(e.to_string()))?;

    let input = vec![wave.samples.clone()];
    let output = resampler
        .process(&input, None)
        .map_err(|e| fail(e.to_string()))?;

    let samples = output.into_iter().next().unwrap_or_default();
    log::debug!(
        "Resampled {} samples @ {}Hz -> {} samples @ {}Hz",
        wave.len(),
        wave.sample_rate,
        samples.len(),
        target_rate
    );

    Ok(Waveform::new(samples, target_rate))
}
