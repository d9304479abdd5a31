pub mod analyser;
pub mod decode;
pub mod features;
pub mod mel;
pub mod playback;
pub mod resample;
