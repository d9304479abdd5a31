use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use super::cluster::{Clustering, FrameClusterer};
use super::color::Palette;
use super::generate::{generate_palette, ContentDigest};
use crate::audio::decode::decode_bytes;
use crate::audio::mel::MelExtractor;
use crate::config::Config;
use crate::error::DeriveError;

/// Everything the offline pass produces for one file.
#[derive(Clone, Debug)]
pub struct Derivation {
    pub digest: ContentDigest,
    pub palette: Arc<Palette>,
    pub feature_frames: usize,
    /// Characterises the audio only; the palette never reads it.
    pub clustering: Clustering,
}

/// Decode, extract, cluster, then generate colors from the raw bytes.
pub fn derive_palette(
    bytes: &[u8],
    extension: Option<&str>,
    config: &Config,
) -> Result<Derivation, DeriveError> {
    derive_cancellable(bytes, extension, config, &AtomicBool::new(false))
}

fn derive_cancellable(
    bytes: &[u8],
    extension: Option<&str>,
    config: &Config,
    cancel: &AtomicBool,
) -> Result<Derivation, DeriveError> {
    let check = || {
        if cancel.load(Ordering::Acquire) {
            Err(DeriveError::Cancelled)
        } else {
            Ok(())
        }
    };

    config.analysis.validate()?;
    config.palette.validate()?;

    let wave = decode_bytes(bytes, extension)?;
    check()?;

    let features = MelExtractor::new(config.analysis.clone()).extract(&wave)?;
    drop(wave);
    check()?;

    let clustering = FrameClusterer::from_config(&config.palette).fit(&features);
    log::info!(
        "Clustered {} frames into {} groups (sizes {:?}, {} iterations, converged: {})",
        features.len(),
        clustering.effective_k(),
        clustering.cluster_sizes(),
        clustering.iterations,
        clustering.converged
    );
    check()?;

    let (digest, palette) = generate_palette(bytes, config.palette.clusters);
    log::info!("Palette (digest {}): {}", &digest.hex()[..8], palette.to_json());

    Ok(Derivation {
        digest,
        palette: Arc::new(palette),
        feature_frames: features.len(),
        clustering,
    })
}

/// Observable state of a background derivation.
#[derive(Clone, Debug)]
pub enum DerivationStatus {
    Pending,
    Ready(Arc<Palette>),
    Failed(String),
    Cancelled,
}

type Slot = OnceLock<Result<Arc<Derivation>, String>>;

/// Publish-once handle to a derivation running off the render thread.
pub struct PaletteHandle {
    slot: Arc<Slot>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Start deriving on a background thread.
pub fn spawn_derivation(bytes: Vec<u8>, extension: Option<String>, config: Config) -> PaletteHandle {
    let slot: Arc<Slot> = Arc::new(OnceLock::new());
    let cancel = Arc::new(AtomicBool::new(false));

    let worker = {
        let slot = Arc::clone(&slot);
        let cancel = Arc::clone(&cancel);
        std::thread::spawn(move || {
            let outcome = derive_cancellable(&bytes, extension.as_deref(), &config, &cancel)
                .map(Arc::new)
                .map_err(|e| e.to_string());
            if let Err(ref msg) = outcome {
                log::error!("Palette derivation failed: {}", msg);
            }
            let _ = slot.set(outcome);
        })
    };

    PaletteHandle {
        slot,
        cancel,
        worker,
    }
}

impl PaletteHandle {
    pub fn status(&self) -> DerivationStatus {
        if self.cancel.load(Ordering::Acquire) {
            return DerivationStatus::Cancelled;
        }
        match self.slot.get() {
            Some(Ok(d)) => DerivationStatus::Ready(Arc::clone(&d.palette)),
            Some(Err(msg)) => DerivationStatus::Failed(msg.clone()),
            None if self.worker.is_finished() => {
                DerivationStatus::Failed("derivation worker exited without a result".into())
            }
            None => DerivationStatus::Pending,
        }
    }

    /// The full derivation once it has been published.
    pub fn derivation(&self) -> Option<Arc<Derivation>> {
        if self.cancel.load(Ordering::Acquire) {
            return None;
        }
        self.slot.get().and_then(|r| r.as_ref().ok().cloned())
    }

    /// Ask the worker to stop at its next stage boundary. Whatever it
    /// publishes afterwards is ignored.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Block until the worker has finished.
    pub fn wait(self) -> Result<Arc<Derivation>, String> {
        if self.worker.join().is_err() {
            return Err("derivation worker panicked".into());
        }
        if self.cancel.load(Ordering::Acquire) {
            return Err(DeriveError::Cancelled.to_string());
        }
        match self.slot.get() {
            Some(result) => result.clone(),
            None => Err("derivation worker exited without a result".into()),
        }
    }
}
