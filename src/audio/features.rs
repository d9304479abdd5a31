/// Decoded mono audio at its native sample rate.
#[derive(Clone, Debug)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Mel-band energies for one analysis window.
pub type FeatureFrame = Vec<f32>;

/// Time-ordered feature frames that all share one dimensionality.
#[derive(Clone, Debug, Default)]
pub struct FeatureMatrix {
    frames: Vec<FeatureFrame>,
    dims: usize,
}

impl FeatureMatrix {
    /// Builds a matrix from frames. Panics if the frames disagree on length,
    /// which would be a bug in the extractor rather than a property of the
    /// audio.
    pub fn from_frames(frames: Vec<FeatureFrame>) -> Self {
        let dims = frames.first().map_or(0, |f| f.len());
        assert!(
            frames.iter().all(|f| f.len() == dims),
            "feature frames must share one dimensionality"
        );
        Self { frames, dims }
    }

    pub fn empty(dims: usize) -> Self {
        Self {
            frames: Vec::new(),
            dims,
        }
    }

    pub fn frames(&self) -> &[FeatureFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

/// Per-bin energies (0-255) from the live analyser for one animation tick.
pub type EnergyFrame = Vec<u8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matrix_keeps_requested_dims() {
        let m = FeatureMatrix::empty(3);
        assert!(m.is_empty());
        assert_eq!(m.dims(), 3);
    }

    #[test]
    #[should_panic(expected = "one dimensionality")]
    fn ragged_frames_are_rejected() {
        FeatureMatrix::from_frames(vec![vec![1.0, 2.0], vec![1.0]]);
    }

    #[test]
    fn waveform_duration() {
        let w = Waveform::new(vec![0.0; 8000], 16000);
        assert!((w.duration_secs() - 0.5).abs() < 1e-6);
    }
}
