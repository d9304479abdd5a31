use super::features::Waveform;

/// Headless transport over a decoded waveform. Time only moves while
/// playing, and only when the caller advances it.
pub struct Playback {
    wave: Waveform,
    position: usize,
    playing: bool,
}

impl Playback {
    pub fn new(wave: Waveform) -> Self {
        Self {
            wave,
            position: 0,
            playing: false,
        }
    }

    pub fn play(&mut self) {
        if !self.ended() {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn ended(&self) -> bool {
        self.position >= self.wave.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.wave.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.wave.duration_secs()
    }

    pub fn position_secs(&self) -> f32 {
        self.position as f32 / self.wave.sample_rate as f32
    }

    /// Jump to `seconds`, clamped to the stream.
    pub fn seek(&mut self, seconds: f32) {
        let target = (seconds.max(0.0) * self.wave.sample_rate as f32).round() as usize;
        self.position = target.min(self.wave.len());
        if self.ended() {
            self.playing = false;
        }
    }

    /// Move the playhead forward by `seconds` if playing. Returns `true` when
    /// this call reached the end of the stream.
    pub fn advance(&mut self, seconds: f32) -> bool {
        if !self.playing {
            return false;
        }
        let step = (seconds.max(0.0) * self.wave.sample_rate as f32).round() as usize;
        self.position = (self.position + step).min(self.wave.len());
        if self.ended() {
            self.playing = false;
            return true;
        }
        false
    }

    /// The most recent `len` samples ending at the playhead.
    pub fn window(&self, len: usize) -> &[f32] {
        let end = self.position.min(self.wave.len());
        &self.wave.samples[end.saturating_sub(len)..end]
    }
}
