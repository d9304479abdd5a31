use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sonahue", about = "Audio-derived palettes driving a reactive 3D scene")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,

    /// Config file (defaults to ./sonahue.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write tick records (JSON Lines) here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Animation ticks per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Cluster count; also the palette size
    #[arg(long, default_value_t = 6)]
    pub clusters: usize,

    /// Mel bands per feature frame
    #[arg(long, default_value_t = 3)]
    pub mel_bands: usize,

    /// Number of visual sub-objects
    #[arg(long, default_value_t = 10)]
    pub objects: usize,

    /// Start playback at this position (seconds)
    #[arg(long, default_value_t = 0.0)]
    pub start: f32,

    /// Stop after this much playback (seconds)
    #[arg(long)]
    pub duration: Option<f32>,

    /// Print the palette as JSON and exit
    #[arg(long)]
    pub palette_only: bool,

    /// Pace ticks at wall-clock speed
    #[arg(long)]
    pub realtime: bool,
}
