mod cli;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use cli::Cli;
use sonahue::audio::analyser::SpectrumAnalyser;
use sonahue::audio::decode::decode_bytes;
use sonahue::audio::features::Waveform;
use sonahue::audio::playback::Playback;
use sonahue::config::{self, Config};
use sonahue::palette::color::Palette;
use sonahue::palette::derive::{derive_palette, spawn_derivation, DerivationStatus, PaletteHandle};
use sonahue::reactive::mapper::{Mode, ReactiveMapper};
use sonahue::reactive::state::{SceneLayout, VisualState};

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record<'a> {
    Session {
        fps: u32,
        duration: f32,
        bins: usize,
        layout: &'a SceneLayout,
    },
    Palette {
        digest: String,
        colors: &'a Palette,
    },
    PaletteFailed {
        reason: String,
    },
    Tick {
        tick: u64,
        time: f32,
        mode: Mode,
        state: &'a VisualState,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };
    // Flags left at their defaults do not override the config file
    if cli.fps != 60 { config.visual.fps = cli.fps; }
    if cli.clusters != 6 { config.palette.clusters = cli.clusters; }
    if cli.mel_bands != 3 { config.analysis.mel_bands = cli.mel_bands; }
    if cli.objects != 10 { config.visual.objects = cli.objects; }

    config.validate()?;

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_owned);

    log::info!("sonahue - audio palette visualizer");
    log::info!("Input: {} ({} bytes)", input.display(), bytes.len());

    if cli.palette_only {
        let derivation = derive_palette(&bytes, ext.as_deref(), &config)
            .with_context(|| format!("Palette derivation failed for {}", input.display()))?;
        println!("{}", derivation.palette.to_json());
        return Ok(());
    }

    let handle = spawn_derivation(bytes.clone(), ext.clone(), config.clone());
    let wave = decode_bytes(&bytes, ext.as_deref()).context("Failed to decode audio for playback")?;
    drop(bytes);

    run_session(wave, handle, &config, &cli)
}

fn run_session(wave: Waveform, handle: PaletteHandle, config: &Config, cli: &Cli) -> Result<()> {
    let mut sink: Box<dyn Write> = match cli.output {
        Some(ref path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let fps = config.visual.fps;
    let dt = 1.0 / fps as f32;

    let mut playback = Playback::new(wave);
    playback.seek(cli.start);
    let start = playback.position_secs();
    let end = cli
        .duration
        .map_or(playback.duration_secs(), |d| (start + d.max(0.0)).min(playback.duration_secs()));

    let mut analyser = SpectrumAnalyser::from_config(&config.visual);
    let mut mapper = ReactiveMapper::new(config.visual.clone());

    emit(
        &mut sink,
        &Record::Session {
            fps,
            duration: playback.duration_secs(),
            bins: analyser.bin_count(),
            layout: mapper.layout(),
        },
    )?;

    if !cli.realtime {
        // Offline rendering: colors from the first tick.
        while matches!(handle.status(), DerivationStatus::Pending) {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    let total_ticks = ((end - start) / dt).ceil().max(0.0) as u64;
    let pb = if cli.output.is_some() {
        let pb = ProgressBar::new(total_ticks);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    log::info!(
        "Playing {:.1}s-{:.1}s at {} ticks/s ({} analyser bins)",
        start,
        end,
        fps,
        analyser.bin_count()
    );

    playback.play();
    mapper.start();

    let mut palette_settled = false;
    let mut tick: u64 = 0;
    let clock = Instant::now();

    loop {
        if !palette_settled {
            match handle.status() {
                DerivationStatus::Ready(palette) => {
                    let digest = handle.derivation().map(|d| d.digest.hex()).unwrap_or_default();
                    emit(&mut sink, &Record::Palette { digest, colors: palette.as_ref() })?;
                    log::info!("Palette ready at tick {}: {}", tick, palette.to_json());
                    mapper.attach_palette(palette);
                    palette_settled = true;
                }
                DerivationStatus::Failed(reason) => {
                    log::warn!("No palette for this file; visuals stay idle");
                    emit(&mut sink, &Record::PaletteFailed { reason })?;
                    palette_settled = true;
                }
                DerivationStatus::Cancelled => palette_settled = true,
                DerivationStatus::Pending => {}
            }
        }

        let ended = playback.advance(dt);
        let frame = if playback.is_playing() || ended {
            Some(analyser.frame(playback.window(analyser.fft_size())))
        } else {
            None
        };
        mapper.tick(frame.as_deref());

        emit(
            &mut sink,
            &Record::Tick {
                tick,
                time: playback.position_secs(),
                mode: mapper.mode(),
                state: mapper.state(),
            },
        )?;
        tick += 1;
        pb.set_position(tick.min(total_ticks));

        if ended || playback.position_secs() >= end {
            playback.pause();
            mapper.stop();
            break;
        }

        if cli.realtime {
            let due = clock + Duration::from_secs_f32(tick as f32 * dt);
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }
    }

    if !palette_settled {
        // Playback finished first; whatever the worker publishes is ignored.
        handle.cancel();
    }

    pb.finish_with_message("Playback complete");
    sink.flush()?;
    log::info!("Done: {} ticks", tick);
    Ok(())
}

fn emit(sink: &mut dyn Write, record: &Record<'_>) -> Result<()> {
    serde_json::to_writer(&mut *sink, record)?;
    sink.write_all(b"\n")?;
    Ok(())
}
