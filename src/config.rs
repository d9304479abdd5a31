use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default)]
    pub visual: VisualConfig,
}

/// Feature extraction parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Canonical analysis rate; audio is resampled to this before framing.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_mel_bands")]
    pub mel_bands: usize,
    #[serde(default = "default_fmax")]
    pub fmax: f32,
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,
    #[serde(default = "default_hop")]
    pub hop: usize,
}

/// Clustering and palette parameters. The palette always has `clusters` colors.
#[derive(Clone, Debug, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_clusters")]
    pub clusters: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    #[serde(default)]
    pub cluster_seed: u64,
}

/// Real-time analyser and visual mapping parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct VisualConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_objects")]
    pub objects: usize,
    #[serde(default = "default_rotation_step")]
    pub rotation_step: f32,
    #[serde(default = "default_offset_amplitude")]
    pub offset_amplitude: f32,
    #[serde(default = "default_offset_stride")]
    pub offset_stride: usize,
    #[serde(default = "default_analyser_fft_size")]
    pub analyser_fft_size: usize,
    #[serde(default = "default_analyser_smoothing")]
    pub analyser_smoothing: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
    #[serde(default)]
    pub layout_seed: u64,
    #[serde(default = "default_layout_extent")]
    pub layout_extent: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            mel_bands: default_mel_bands(),
            fmax: default_fmax(),
            n_fft: default_n_fft(),
            hop: default_hop(),
        }
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            clusters: default_clusters(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            cluster_seed: 0,
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            objects: default_objects(),
            rotation_step: default_rotation_step(),
            offset_amplitude: default_offset_amplitude(),
            offset_stride: default_offset_stride(),
            analyser_fft_size: default_analyser_fft_size(),
            analyser_smoothing: default_analyser_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
            layout_seed: 0,
            layout_extent: default_layout_extent(),
        }
    }
}

fn require(ok: bool, field: &'static str, requirement: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError { field, requirement })
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;
        self.palette.validate()?;
        self.visual.validate()
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(self.sample_rate > 0, "analysis.sample_rate", "must be positive")?;
        require(self.mel_bands > 0, "analysis.mel_bands", "must be positive")?;
        require(self.fmax > 0.0, "analysis.fmax", "must be positive")?;
        require(self.n_fft >= 2, "analysis.n_fft", "must be at least 2")?;
        require(self.hop > 0, "analysis.hop", "must be positive")
    }
}

impl PaletteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(self.clusters > 0, "palette.clusters", "must be positive")
    }
}

impl VisualConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(self.fps > 0, "visual.fps", "must be positive")?;
        require(self.analyser_fft_size >= 2, "visual.analyser_fft_size", "must be at least 2")?;
        require(
            self.max_decibels > self.min_decibels,
            "visual.max_decibels",
            "must exceed visual.min_decibels",
        )
    }
}

fn default_sample_rate() -> u32 { 16000 }
fn default_mel_bands() -> usize { 3 }
fn default_fmax() -> f32 { 8000.0 }
fn default_n_fft() -> usize { 2048 }
fn default_hop() -> usize { 512 }
fn default_clusters() -> usize { 6 }
fn default_max_iterations() -> usize { 300 }
fn default_tolerance() -> f32 { 1e-4 }
fn default_fps() -> u32 { 60 }
fn default_objects() -> usize { 10 }
fn default_rotation_step() -> f32 { 0.01 }
fn default_offset_amplitude() -> f32 { 2.0 }
fn default_offset_stride() -> usize { 4 }
fn default_analyser_fft_size() -> usize { 256 }
fn default_analyser_smoothing() -> f32 { 0.8 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }
fn default_layout_extent() -> f32 { 2.0 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, then `./sonahue.toml`, then the per-user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("sonahue.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("sonahue").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("sonahue").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[palette]\nclusters = 4\n\n[visual]\nobjects = 12").unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.palette.clusters, 4);
        assert_eq!(cfg.palette.max_iterations, 300);
        assert_eq!(cfg.visual.objects, 12);
        assert_eq!(cfg.visual.fps, 60);
        assert_eq!(cfg.analysis.sample_rate, 16000);
        assert_eq!(cfg.analysis.mel_bands, 3);
    }

    #[test]
    fn malformed_file_is_none() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[palette\nclusters = ").unwrap();
        assert!(load_config(file.path()).is_none());
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_config(Path::new("/nonexistent/sonahue.toml")).is_none());
    }

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn degenerate_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\nn_fft = 0").unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.validate().unwrap_err().field, "analysis.n_fft");

        let mut cfg = Config::default();
        cfg.analysis.sample_rate = 0;
        assert_eq!(cfg.validate().unwrap_err().field, "analysis.sample_rate");

        let mut cfg = Config::default();
        cfg.analysis.mel_bands = 0;
        assert_eq!(cfg.validate().unwrap_err().field, "analysis.mel_bands");

        let mut cfg = Config::default();
        cfg.visual.analyser_fft_size = 1;
        assert_eq!(cfg.validate().unwrap_err().field, "visual.analyser_fft_size");

        let mut cfg = Config::default();
        cfg.visual.fps = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("visual.fps"));
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/custom.toml");
        assert_eq!(find_config(Some(p)), Some(p.to_path_buf()));
    }
}
