//! Flash image files backing the emulated chip

use blackbox_core::chip::{self, FlashGeometry};
use blackbox_dummy::{EmulatedChip, EmulatorConfig};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Geometry emulated for IDs missing from the chip table (64 KiB)
const UNKNOWN_CHIP_GEOMETRY: FlashGeometry = FlashGeometry::new(256, 16, 16);

/// Error opening or saving an image
#[derive(Debug, Error)]
pub enum ImageError {
    /// Image file could not be read or written
    #[error("cannot access image {path}: {source}")]
    Io {
        /// Image file
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// Image does not fit the chip
    #[error("image {path} is {actual} bytes, chip holds {expected}")]
    SizeMismatch {
        /// Image file
        path: PathBuf,
        /// Chip size
        expected: usize,
        /// Image size
        actual: usize,
    },
}

/// Open `path` as the contents of a chip answering `jedec_id`
///
/// A missing file gives an erased chip. IDs not in the chip table still
/// get an emulated chip so detection failure can be exercised.
pub fn open_image(path: &Path, jedec_id: u32) -> Result<EmulatedChip, ImageError> {
    let config = match chip::find_by_jedec_id(jedec_id) {
        Some(desc) => {
            log::debug!("Emulating {} {} from {}", desc.vendor, desc.name, path.display());
            EmulatorConfig::custom(jedec_id, desc.geometry())
        }
        None => {
            log::warn!("JEDEC ID 0x{:06X} is not in the chip table", jedec_id);
            EmulatorConfig::custom(jedec_id, UNKNOWN_CHIP_GEOMETRY)
        }
    };

    let expected = config.geometry.total_size as usize;
    let chip = EmulatedChip::load(config, path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if let Ok(meta) = std::fs::metadata(path) {
        let actual = meta.len() as usize;
        if actual > expected {
            return Err(ImageError::SizeMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }
    }
    Ok(chip)
}

/// Write the chip contents back to `path`
pub fn save_image(chip: &EmulatedChip, path: &Path) -> Result<(), ImageError> {
    chip.save(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Saved {} bytes to {}", chip.data().len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("blackbox-image-{}-{}.bin", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_missing_image_is_erased() {
        let path = temp_path("missing");
        let chip = open_image(&path, 0xEF4015).unwrap();
        assert_eq!(chip.data().len(), 2 * 1024 * 1024);
        assert!(chip.data().iter().all(|&b| b == 0xFF));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_and_reopen() {
        let path = temp_path("reopen");
        let mut chip = open_image(&path, 0xEF4015).unwrap();
        chip.data_mut()[10] = 0x42;
        save_image(&chip, &path).unwrap();

        let chip = open_image(&path, 0xEF4015).unwrap();
        assert_eq!(chip.data()[10], 0x42);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_oversized_image_rejected() {
        let path = temp_path("oversized");
        std::fs::write(&path, vec![0u8; 128 * 1024]).unwrap();
        assert!(matches!(
            open_image(&path, 0x123456),
            Err(ImageError::SizeMismatch { expected: 65536, .. })
        ));
        std::fs::remove_file(&path).unwrap();
    }
}
