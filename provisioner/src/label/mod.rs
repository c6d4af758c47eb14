//! # QR Label
//!
//! Renders the device identifier as the QR code printed on the unit's
//! label: error correction L, 10 px modules, 4 module quiet zone, black on
//! white. The code grows to the smallest version that fits the identifier.

use std::path::PathBuf;

use image::Luma;
use qrcode::{EcLevel, QrCode};
use tracing::info;

use shared::{
    constants::{LABEL_MODULE_PIXELS, LABEL_QUIET_ZONE_MODULES},
    error::{ProvisionError, ProvisionResult},
    types::DeviceId,
};

/// Renders device labels to PNG files
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    /// Output image path
    path: PathBuf,
}

impl LabelRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Encode `device_id` as a QR code
    pub fn encode(device_id: &DeviceId) -> ProvisionResult<QrCode> {
        QrCode::with_error_correction_level(device_id.as_str().as_bytes(), EcLevel::L)
            .map_err(|e| ProvisionError::LabelError(e.to_string()))
    }

    /// Render the label and save it, replacing any previous label
    pub fn render(&self, device_id: &DeviceId) -> ProvisionResult<PathBuf> {
        let code = Self::encode(device_id)?;

        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(LABEL_MODULE_PIXELS, LABEL_MODULE_PIXELS)
            .dark_color(Luma([0u8]))
            .light_color(Luma([255u8]))
            .build();

        image
            .save(&self.path)
            .map_err(|e| ProvisionError::LabelError(e.to_string()))?;

        info!(
            device_id = %device_id,
            path = ?self.path,
            version = ?code.version(),
            "Label written"
        );
        Ok(self.path.clone())
    }

    /// Delete the label image
    pub fn remove(&self) -> ProvisionResult<()> {
        std::fs::remove_file(&self.path)?;
        info!(path = ?self.path, "Label removed");
        Ok(())
    }

    /// Side length in pixels of the label for a code of `width` modules
    pub fn side_pixels(width: usize) -> u32 {
        (width as u32 + 2 * LABEL_QUIET_ZONE_MODULES) * LABEL_MODULE_PIXELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrcode::{Color, Version};
    use tempfile::tempdir;

    #[test]
    fn test_encodes_identifier_only() {
        let code = LabelRenderer::encode(&DeviceId::from("abc123")).unwrap();

        // 6 bytes in byte mode fit a version 1 symbol at level L
        assert_eq!(code.version(), Version::Normal(1));
        assert_eq!(code.error_correction_level(), EcLevel::L);

        let other = QrCode::with_error_correction_level(b"abc1234", EcLevel::L).unwrap();
        assert_ne!(code.to_colors(), other.to_colors());
    }

    #[test]
    fn test_rendered_modules_match_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qrcode.png");
        let id = DeviceId::from("abc123");
        LabelRenderer::new(&path).render(&id).unwrap();

        let expected = QrCode::with_error_correction_level(b"abc123", EcLevel::L).unwrap();
        let width = expected.width();
        let colors = expected.to_colors();

        let image = image::open(&path).unwrap().to_luma8();
        assert_eq!(image.width(), LabelRenderer::side_pixels(width));

        // Sample the centre pixel of every module
        let offset = LABEL_QUIET_ZONE_MODULES * LABEL_MODULE_PIXELS + LABEL_MODULE_PIXELS / 2;
        for y in 0..width {
            for x in 0..width {
                let px = offset + x as u32 * LABEL_MODULE_PIXELS;
                let py = offset + y as u32 * LABEL_MODULE_PIXELS;
                let dark = image.get_pixel(px, py)[0] == 0;
                assert_eq!(
                    dark,
                    colors[y * width + x] == Color::Dark,
                    "module ({}, {}) differs",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_full_uuid_grows_version() {
        let id = DeviceId::from("3f2504e0-4f89-41d3-9a0c-0305e82c3301");
        let code = LabelRenderer::encode(&id).unwrap();
        assert!(matches!(code.version(), Version::Normal(v) if v > 1));
    }

    #[test]
    fn test_render_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qrcode.png");
        let renderer = LabelRenderer::new(&path);

        let written = renderer.render(&DeviceId::from("abc123")).unwrap();
        assert_eq!(written, path);

        let image = image::open(&path).unwrap().to_luma8();
        let side = LabelRenderer::side_pixels(21);
        assert_eq!(image.dimensions(), (side, side));

        // Quiet zone is white, finder pattern corner is black
        assert_eq!(image.get_pixel(0, 0), &Luma([255u8]));
        let corner = LABEL_QUIET_ZONE_MODULES * LABEL_MODULE_PIXELS;
        assert_eq!(image.get_pixel(corner, corner), &Luma([0u8]));
    }

    #[test]
    fn test_render_overwrites_previous_label() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qrcode.png");
        let renderer = LabelRenderer::new(&path);

        renderer.render(&DeviceId::from("abc123")).unwrap();
        renderer
            .render(&DeviceId::from("3f2504e0-4f89-41d3-9a0c-0305e82c3301"))
            .unwrap();

        let image = image::open(&path).unwrap().to_luma8();
        assert!(image.width() > LabelRenderer::side_pixels(21));
    }

    #[test]
    fn test_remove_deletes_label() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qrcode.png");
        let renderer = LabelRenderer::new(&path);

        renderer.render(&DeviceId::from("abc123")).unwrap();
        renderer.remove().unwrap();
        assert!(!path.exists());
        assert!(renderer.remove().is_err());
    }

    #[test]
    fn test_dark_module_count_matches_code() {
        let code = LabelRenderer::encode(&DeviceId::from("abc123")).unwrap();
        let dark = code.to_colors().iter().filter(|c| **c == Color::Dark).count();
        assert!(dark > 0 && dark < code.width() * code.width());
    }
}
