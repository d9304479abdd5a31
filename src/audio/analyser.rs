//! Live spectrum analyser producing one `EnergyFrame` per animation tick.
//!
//! Behaves like a browser `AnalyserNode`: Blackman-windowed FFT over the most
//! recent `fft_size` samples, exponential smoothing of magnitudes across calls,
//! then a decibel range mapped onto bytes.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::features::EnergyFrame;
use crate::config::VisualConfig;

pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    pub fn new(fft_size: usize, smoothing: f32, min_db: f32, max_db: f32) -> Self {
        let fft_size = fft_size.max(2);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        Self {
            fft,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            smoothing: smoothing.clamp(0.0, 1.0),
            min_db,
            max_db,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn from_config(config: &VisualConfig) -> Self {
        Self::new(
            config.analyser_fft_size,
            config.analyser_smoothing,
            config.min_decibels,
            config.max_decibels,
        )
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Number of bins (`M`) in every frame this analyser returns.
    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Analyse the most recent samples. Shorter input is zero-padded at the
    /// front, longer input uses only its tail.
    pub fn frame(&mut self, recent: &[f32]) -> EnergyFrame {
        let n = self.fft_size();
        let tail = &recent[recent.len().saturating_sub(n)..];
        let pad = n - tail.len();

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.smoothing;
        let range = self.max_db - self.min_db;
        self.smoothed
            .iter_mut()
            .zip(self.scratch.iter())
            .map(|(s, c)| {
                let magnitude = c.norm() / n as f32;
                *s = tau * *s + (1.0 - tau) * magnitude;
                let db = if *s > 0.0 { 20.0 * s.log10() } else { f32::NEG_INFINITY };
                let scaled = 255.0 / range * (db - self.min_db);
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42, 0.5, 0.08);
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sine;

    fn analyser() -> SpectrumAnalyser {
        SpectrumAnalyser::from_config(&VisualConfig::default())
    }

    #[test]
    fn default_analyser_has_128_bins() {
        let mut a = analyser();
        assert_eq!(a.bin_count(), 128);
        assert_eq!(a.frame(&[]).len(), 128);
    }

    #[test]
    fn silence_maps_to_zero() {
        let mut a = analyser();
        let frame = a.frame(&vec![0.0; 512]);
        assert!(frame.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_near_its_bin() {
        let mut a = SpectrumAnalyser::new(256, 0.0, -100.0, -30.0);
        // 2 kHz at 16 kHz with 256-point FFT sits on bin 32
        let frame = a.frame(&sine(2000.0, 16000, 256));
        let peak = frame
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert!((31..=33).contains(&peak), "peak = {}", peak);
        assert!(frame[peak] > frame[100]);
    }

    #[test]
    fn smoothing_lags_behind_a_sudden_onset() {
        let tone = sine(1000.0, 16000, 256);
        let mut smooth = SpectrumAnalyser::new(256, 0.8, -100.0, -30.0);
        let mut raw = SpectrumAnalyser::new(256, 0.0, -100.0, -30.0);
        let s = smooth.frame(&tone);
        let r = raw.frame(&tone);
        assert!(s[16] < r[16]);
        // converges after repeated frames
        let mut last = s;
        for _ in 0..60 {
            last = smooth.frame(&tone);
        }
        assert!((last[16] as i32 - r[16] as i32).abs() <= 1);
    }
}
