use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::palette::color::Rgb;

/// Per sub-object visual state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectState {
    /// `None` until a palette color has been applied.
    pub color: Option<Rgb>,
    /// Vertical offset in scene units.
    pub y: f32,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisualState {
    pub scale: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub color_index: usize,
    pub objects: Vec<ObjectState>,
}

impl VisualState {
    /// Static geometry: unit scale, no rotation, objects at their layout height.
    pub fn at_rest(layout: &SceneLayout) -> Self {
        Self {
            scale: 1.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            color_index: 0,
            objects: layout
                .positions
                .iter()
                .map(|p| ObjectState { color: None, y: p[1] })
                .collect(),
        }
    }
}

/// Base positions of the sub-objects inside the rotating group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneLayout {
    pub positions: Vec<[f32; 3]>,
}

impl SceneLayout {
    /// Scatter `count` objects uniformly in `[-extent, extent]^3`.
    pub fn scatter(count: usize, extent: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut coord = || (rng.random::<f32>() * 2.0 - 1.0) * extent;
        let positions = (0..count).map(|_| [coord(), coord(), coord()]).collect();
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
