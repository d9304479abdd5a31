use std::f32::consts::TAU;
use std::sync::Arc;

use serde::Serialize;

use super::state::{SceneLayout, VisualState};
use crate::config::VisualConfig;
use crate::palette::color::Palette;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// No palette or no live source: geometry holds still.
    Idle,
    /// Palette present and the source is producing frames.
    Reactive,
}

/// Mean bin energy on the 0-255 scale.
pub fn average_energy(frame: &[u8]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().map(|&b| b as u32).sum::<u32>() as f32 / frame.len() as f32
}

/// `floor(average / (256 / k))`, clamped to `[0, k-1]`.
pub fn color_index(average: f32, k: usize) -> usize {
    if k == 0 {
        return 0;
    }
    // average * k / 256 avoids the rounding error of dividing by 256 / k.
    let idx = (average.max(0.0) * k as f32 / 256.0).floor() as usize;
    idx.min(k - 1)
}

/// Palette slot for sub-object `object`: neighbours show adjacent hues.
pub fn object_color_slot(color_index: usize, object: usize, k: usize) -> usize {
    (color_index + object) % k
}

/// Spacing between the energy bins sampled for consecutive objects, shrunk
/// so that every object maps to a bin inside the frame.
pub fn effective_stride(configured: usize, bins: usize, objects: usize) -> usize {
    let configured = configured.max(1);
    if objects <= 1 || bins == 0 {
        return configured;
    }
    configured.min((bins - 1) / (objects - 1)).max(1)
}

/// One animation step. An absent or empty frame leaves the state untouched.
pub fn advance(
    prev: &VisualState,
    frame: Option<&[u8]>,
    palette: Option<&Palette>,
    config: &VisualConfig,
) -> VisualState {
    let frame = match frame {
        Some(f) if !f.is_empty() => f,
        _ => return prev.clone(),
    };

    let mut next = prev.clone();
    let average = average_energy(frame);
    next.scale = 1.0 + average / 128.0;
    next.rotation_x = (prev.rotation_x + config.rotation_step).rem_euclid(TAU);
    next.rotation_y = (prev.rotation_y + config.rotation_step).rem_euclid(TAU);

    if let Some(palette) = palette.filter(|p| !p.is_empty()) {
        let k = palette.len();
        next.color_index = color_index(average, k);
        for (i, obj) in next.objects.iter_mut().enumerate() {
            obj.color = palette.get(object_color_slot(next.color_index, i, k));
        }
    }

    let stride = effective_stride(config.offset_stride, frame.len(), next.objects.len());
    for (i, obj) in next.objects.iter_mut().enumerate() {
        let bin = (i * stride).min(frame.len() - 1);
        obj.y = (frame[bin] as f32 / 256.0 - 0.5) * config.offset_amplitude;
    }

    next
}

/// Drives `VisualState` from live energy frames once a palette and a source
/// are both available.
pub struct ReactiveMapper {
    config: VisualConfig,
    layout: SceneLayout,
    palette: Option<Arc<Palette>>,
    source_live: bool,
    state: VisualState,
}

impl ReactiveMapper {
    pub fn new(config: VisualConfig) -> Self {
        let layout = SceneLayout::scatter(config.objects, config.layout_extent, config.layout_seed);
        let state = VisualState::at_rest(&layout);
        Self {
            config,
            layout,
            palette: None,
            source_live: false,
            state,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.palette.is_some() && self.source_live {
            Mode::Reactive
        } else {
            Mode::Idle
        }
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    pub fn state(&self) -> &VisualState {
        &self.state
    }

    pub fn palette(&self) -> Option<&Arc<Palette>> {
        self.palette.as_ref()
    }

    pub fn attach_palette(&mut self, palette: Arc<Palette>) {
        log::debug!("Palette attached ({} colors)", palette.len());
        self.palette = Some(palette);
    }

    pub fn detach_palette(&mut self) {
        self.palette = None;
    }

    /// The energy source went live (playback started).
    pub fn start(&mut self) {
        self.source_live = true;
    }

    /// Playback paused, ended or the source was torn down. The last state is
    /// kept on screen.
    pub fn stop(&mut self) {
        self.source_live = false;
    }

    /// Back to static geometry, e.g. when a new file is loaded.
    pub fn reset(&mut self) {
        self.state = VisualState::at_rest(&self.layout);
    }

    /// Called once per animation frame. Never blocks.
    pub fn tick(&mut self, frame: Option<&[u8]>) -> &VisualState {
        if self.mode() == Mode::Reactive {
            self.state = advance(&self.state, frame, self.palette.as_deref(), &self.config);
        }
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::color::Rgb;

    fn palette(k: usize) -> Palette {
        Palette::new((0..k).map(|i| Rgb::new(i as u8, 0, 0)).collect())
    }

    fn reactive(k: usize) -> ReactiveMapper {
        let mut m = ReactiveMapper::new(VisualConfig::default());
        m.attach_palette(Arc::new(palette(k)));
        m.start();
        m
    }

    #[test]
    fn half_energy_doubles_scale_and_picks_slot_three() {
        let mut m = reactive(6);
        let frame = vec![128u8; 32];
        let state = m.tick(Some(frame.as_slice())).clone();
        assert_eq!(state.scale, 2.0);
        assert_eq!(state.color_index, 3);
        assert_eq!(state.objects[0].color, Some(Rgb::new(3, 0, 0)));
        assert_eq!(state.objects[3].color, Some(Rgb::new(0, 0, 0)));
        assert!(state.objects.iter().all(|o| o.y == 0.0));
    }

    #[test]
    fn silence_keeps_unit_scale_but_still_spins() {
        let mut m = reactive(6);
        let silent = vec![0u8; 128];
        let state = m.tick(Some(silent.as_slice())).clone();
        assert_eq!(state.scale, 1.0);
        assert_eq!(state.color_index, 0);
        assert!(state.rotation_x > 0.0);
        assert_eq!(state.rotation_x, state.rotation_y);
        assert!(state.objects.iter().all(|o| o.y == -1.0));
    }

    #[test]
    fn missing_frame_freezes_state() {
        let mut m = reactive(6);
        let before = m.tick(Some(&[200u8; 128][..])).clone();
        assert_eq!(m.tick(None), &before);
        assert_eq!(m.tick(Some(&[0u8; 0][..])), &before);
    }

    #[test]
    fn idle_until_palette_and_source() {
        let mut m = ReactiveMapper::new(VisualConfig::default());
        let rest = m.state().clone();
        m.start();
        assert_eq!(m.mode(), Mode::Idle);
        assert_eq!(m.tick(Some(&[255u8; 128][..])), &rest);

        m.attach_palette(Arc::new(palette(6)));
        assert_eq!(m.mode(), Mode::Reactive);
        assert_ne!(m.tick(Some(&[255u8; 128][..])), &rest);

        m.stop();
        assert_eq!(m.mode(), Mode::Idle);
        let frozen = m.state().clone();
        assert_eq!(m.tick(Some(&[0u8; 128][..])), &frozen);

        m.reset();
        assert_eq!(m.state(), &rest);
    }

    #[test]
    fn color_assignment_is_a_pure_function() {
        for k in 1..=8 {
            for ci in 0..k {
                for obj in 0..10 {
                    assert_eq!(object_color_slot(ci, obj, k), (ci + obj) % k);
                }
            }
        }
        let config = VisualConfig::default();
        let p = palette(6);
        let rest = VisualState::at_rest(&SceneLayout::scatter(10, 2.0, 0));
        let frame = vec![90u8; 128];
        let a = advance(&rest, Some(frame.as_slice()), Some(&p), &config);
        let b = advance(&a, Some(frame.as_slice()), Some(&p), &config);
        let colors = |s: &VisualState| s.objects.iter().map(|o| o.color).collect::<Vec<_>>();
        assert_eq!(colors(&a), colors(&b));
    }

    #[test]
    fn color_index_is_clamped() {
        assert_eq!(color_index(255.0, 6), 5);
        assert_eq!(color_index(300.0, 6), 5);
        assert_eq!(color_index(0.0, 6), 0);
        assert_eq!(color_index(42.0, 6), 0);
        assert_eq!(color_index(43.0, 6), 1);
        assert_eq!(color_index(10.0, 0), 0);
    }

    #[test]
    fn rotation_wraps_within_a_turn() {
        let mut config = VisualConfig::default();
        config.rotation_step = 1.0;
        let mut state = VisualState::at_rest(&SceneLayout::scatter(0, 2.0, 0));
        for _ in 0..20 {
            state = advance(&state, Some(&[10u8][..]), None, &config);
            assert!((0.0..TAU).contains(&state.rotation_x));
        }
        assert!((state.rotation_x - 20.0f32.rem_euclid(TAU)).abs() < 1e-4);
    }

    #[test]
    fn offsets_sample_distinct_bins() {
        let config = VisualConfig::default();
        let frame: Vec<u8> = (0..128).map(|i| (i * 2) as u8).collect();
        let rest = VisualState::at_rest(&SceneLayout::scatter(10, 2.0, 0));
        let next = advance(&rest, Some(frame.as_slice()), None, &config);
        for (i, obj) in next.objects.iter().enumerate() {
            let expected = (frame[i * 4] as f32 / 256.0 - 0.5) * 2.0;
            assert_eq!(obj.y, expected);
            assert!(obj.color.is_none());
        }
    }

    #[test]
    fn stride_shrinks_for_short_frames() {
        assert_eq!(effective_stride(4, 128, 10), 4);
        assert_eq!(effective_stride(4, 32, 10), 3);
        assert_eq!(effective_stride(4, 5, 10), 1);
        assert_eq!(effective_stride(0, 128, 10), 1);
        assert_eq!(effective_stride(4, 128, 1), 4);
        // stride 1 over 3 bins: objects 0..=2 read bins 0..=2, the rest read the last bin
        let config = VisualConfig::default();
        let rest = VisualState::at_rest(&SceneLayout::scatter(10, 2.0, 0));
        let next = advance(&rest, Some(&[255u8, 0, 128][..]), None, &config);
        let ys: Vec<f32> = next.objects.iter().map(|o| o.y).collect();
        let loud = (255.0 / 256.0 - 0.5) * 2.0;
        assert_eq!(ys[0], loud);
        assert_eq!(ys[1], -1.0);
        assert!(ys[2..].iter().all(|&y| y == 0.0), "{:?}", ys);
    }
}
