use std::sync::Arc;

use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::features::{FeatureMatrix, Waveform};
use super::resample::resample;
use crate::config::AnalysisConfig;
use crate::error::DeriveError;

/// Mel-band feature extraction at a fixed analysis rate.
///
/// The waveform is brought to `sample_rate` first so that the same content
/// recorded at different rates lands on the same feature scale. Frames are
/// `n_fft` samples long with a hop of `hop` samples and no edge padding; a
/// waveform shorter than one window yields an empty matrix.
pub struct MelExtractor {
    config: AnalysisConfig,
    filterbank: Vec<Vec<f32>>,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl MelExtractor {
    pub fn new(config: AnalysisConfig) -> Self {
        let nyquist = config.sample_rate as f32 / 2.0;
        let fmax = config.fmax.min(nyquist);
        let filterbank = mel_filterbank(config.sample_rate, config.n_fft, config.mel_bands, 0.0, fmax);
        let window = hann_window(config.n_fft);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(config.n_fft);
        Self {
            config,
            filterbank,
            window,
            fft,
        }
    }

    pub fn extract(&self, wave: &Waveform) -> Result<FeatureMatrix, DeriveError> {
        let expected = wave.len() as u64 * u64::from(self.config.sample_rate)
            / u64::from(wave.sample_rate.max(1));
        if (expected as usize) < self.config.n_fft {
            // Too short for one window at the analysis rate; skip resampling.
            return Ok(self.extract_resampled(&[]));
        }
        let wave = resample(wave, self.config.sample_rate)?;
        Ok(self.extract_resampled(&wave.samples))
    }

    /// Extract from samples already at the analysis rate.
    pub fn extract_resampled(&self, samples: &[f32]) -> FeatureMatrix {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop.max(1);

        if n_fft < 2 || samples.len() < n_fft {
            log::warn!(
                "Waveform has {} samples, shorter than one {}-sample window; no feature frames",
                samples.len(),
                n_fft
            );
            return FeatureMatrix::empty(self.config.mel_bands);
        }

        let num_frames = 1 + (samples.len() - n_fft) / hop;

        let frames: Vec<Vec<f32>> = (0..num_frames)
            .into_par_iter()
            .map(|frame_idx| {
                let start = frame_idx * hop;
                let mut buffer: Vec<Complex<f32>> = samples[start..start + n_fft]
                    .iter()
                    .zip(self.window.iter())
                    .map(|(&s, &w)| Complex::new(s * w, 0.0))
                    .collect();
                self.fft.process(&mut buffer);

                let power: Vec<f32> = buffer[..=n_fft / 2].iter().map(|c| c.norm_sqr()).collect();

                self.filterbank
                    .iter()
                    .map(|weights| weights.iter().zip(power.iter()).map(|(w, p)| w * p).sum())
                    .collect()
            })
            .collect();

        log::info!(
            "Extracted {} feature frames x {} mel bands @ {}Hz",
            frames.len(),
            self.config.mel_bands,
            self.config.sample_rate
        );

        FeatureMatrix::from_frames(frames)
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    // Slaney scale: linear below 1 kHz, logarithmic above.
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        mel * F_SP
    }
}

/// Triangular, area-normalised mel filters over `n_fft / 2 + 1` bins.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Vec<Vec<f32>> {
    let num_bins = n_fft / 2 + 1;
    let bin_hz: Vec<f32> = (0..num_bins)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|band| {
            let (lo, center, hi) = (edges[band], edges[band + 1], edges[band + 2]);
            let norm = 2.0 / (hi - lo);
            bin_hz
                .iter()
                .map(|&f| {
                    let rising = (f - lo) / (center - lo);
                    let falling = (hi - f) / (hi - center);
                    rising.min(falling).max(0.0) * norm
                })
                .collect()
        })
        .collect()
}

/// Periodic Hann window, as used for STFT analysis.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}
