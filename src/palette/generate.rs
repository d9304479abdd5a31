use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::color::{Palette, Rgb};

/// BLAKE3 fingerprint of a file's raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDigest(blake3::Hash);

impl ContentDigest {
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    /// 64 lowercase hex characters.
    pub fn hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// The first 8 hex characters read as a 32-bit integer.
    pub fn seed(&self) -> u32 {
        let b = self.0.as_bytes();
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }
}

/// Derive `size` colors from file content alone.
pub fn generate_palette(bytes: &[u8], size: usize) -> (ContentDigest, Palette) {
    let digest = ContentDigest::of(bytes);
    let palette = palette_from_digest(&digest, size);
    (digest, palette)
}

pub fn palette_from_digest(digest: &ContentDigest, size: usize) -> Palette {
    // Local generator only; nothing process-wide may leak into the draw.
    let mut rng = StdRng::seed_from_u64(u64::from(digest.seed()));
    let colors = (0..size)
        .map(|_| {
            let r: u8 = rng.random();
            let g: u8 = rng.random();
            let b: u8 = rng.random();
            Rgb::new(r, g, b)
        })
        .collect();
    Palette::new(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<u8> {
        let mut bytes: Vec<u8> = (0u8..=255).collect();
        bytes.extend_from_slice(b"test");
        bytes
    }

    #[test]
    fn same_bytes_same_palette() {
        let (d1, p1) = generate_palette(&fixture(), 6);
        let (d2, p2) = generate_palette(&fixture(), 6);
        assert_eq!(d1, d2);
        assert_eq!(p1, p2);
        assert_eq!(p1.to_json(), p2.to_json());
        assert_eq!(p1.len(), 6);
        assert!(p1.colors().iter().all(|c| c.hex().len() == 6));
    }

    #[test]
    fn fixture_palette_matches_snapshot() {
        let (_, p) = generate_palette(&fixture(), 6);
        assert_eq!(
            p.to_json(),
            r#"["3e5f9d","72ea5d","c193d6","c0254f","ef2685","dcdfd8"]"#
        );
    }

    #[test]
    fn seed_is_the_hex_prefix() {
        let digest = ContentDigest::of(&fixture());
        let hex = digest.hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(digest.seed(), u32::from_str_radix(&hex[..8], 16).unwrap());
    }

    #[test]
    fn digest_matches_known_blake3_vector() {
        // BLAKE3 of the empty input.
        assert_eq!(
            ContentDigest::of(b"").hex(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn palette_size_is_always_honoured() {
        for size in [0, 1, 6, 17] {
            let (_, p) = generate_palette(b"x", size);
            assert_eq!(p.len(), size);
        }
    }

    #[test]
    fn longer_palette_extends_shorter_one() {
        // Draw order is fixed, so the first colors agree.
        let (_, six) = generate_palette(&fixture(), 6);
        let (_, eight) = generate_palette(&fixture(), 8);
        assert_eq!(&eight.colors()[..6], six.colors());
    }

    #[test]
    fn different_content_gives_different_palette() {
        let (_, a) = generate_palette(b"first file", 6);
        let (_, b) = generate_palette(b"second file", 6);
        assert_ne!(a, b);
    }
}
