// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration: enhancement chain, region search bounds, acquisition.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};

/// How the enhancer binarizes luminance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// `luminance > value ? 255 : 0` across the whole image.
    Fixed { value: u8 },
    /// Compare each pixel with the mean of its `block_size` neighbourhood
    /// minus `constant`.
    Adaptive { block_size: u32, constant: f32 },
    /// Global threshold chosen from the histogram (Otsu's method).
    Otsu,
}

/// Smoothing kernel used by the denoise stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoiseMode {
    /// Normalised Gaussian-like spatial kernel.
    Gaussian,
    /// Spatial kernel weighted by luminance similarity, keeps hard edges.
    Bilateral,
}

/// Serialisation format handed to the decode capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

/// The enhancement chain applied to every search candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Larger side is scaled down to this many pixels.
    pub max_dimension: u32,
    /// The rescan loop stops once the larger side would drop below this.
    pub min_dimension: u32,
    /// Per-step downscale factor for the rescan loop, in (0, 1).
    pub scaling_factor: f32,
    /// Linear gain applied after gamma.
    pub contrast: f32,
    /// Additive offset applied after gain, in 0..255 units.
    pub brightness: f32,
    /// Exponent applied to normalised intensity.
    pub gamma: f32,
    pub grayscale: bool,
    pub denoise: bool,
    pub denoise_radius: u32,
    pub denoise_mode: DenoiseMode,
    pub sharpen: bool,
    /// Sobel edge darkening strength; `None` disables the stage.
    pub edge_emphasis: Option<f32>,
    /// `None` leaves the image continuous-tone.
    pub threshold: Option<ThresholdMode>,
    pub output_format: OutputFormat,
    /// Encoder quality in [0, 1]; only JPEG uses it.
    pub output_quality: f32,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            min_dimension: 200,
            scaling_factor: 0.75,
            contrast: 1.0,
            brightness: 0.0,
            gamma: 1.0,
            grayscale: true,
            denoise: false,
            denoise_radius: 1,
            denoise_mode: DenoiseMode::Bilateral,
            sharpen: true,
            edge_emphasis: None,
            threshold: Some(ThresholdMode::Adaptive {
                block_size: 31,
                constant: 10.0,
            }),
            output_format: OutputFormat::Png,
            output_quality: 0.92,
        }
    }
}

impl EnhancementConfig {
    /// A chain that only rescales and encodes.
    pub fn passthrough() -> Self {
        Self {
            grayscale: false,
            sharpen: false,
            threshold: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(invalid("max_dimension must be positive"));
        }
        if self.min_dimension > self.max_dimension {
            return Err(invalid(format!(
                "min_dimension {} exceeds max_dimension {}",
                self.min_dimension, self.max_dimension
            )));
        }
        if !(self.scaling_factor > 0.0 && self.scaling_factor < 1.0) {
            return Err(invalid(format!(
                "scaling_factor must lie in (0, 1), got {}",
                self.scaling_factor
            )));
        }
        if !self.contrast.is_finite() || self.contrast < 0.0 {
            return Err(invalid(format!("contrast must be >= 0, got {}", self.contrast)));
        }
        if !self.brightness.is_finite() {
            return Err(invalid("brightness must be finite"));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(invalid(format!("gamma must be > 0, got {}", self.gamma)));
        }
        if self.denoise && self.denoise_radius == 0 {
            return Err(invalid("denoise_radius must be positive when denoise is on"));
        }
        if let Some(strength) = self.edge_emphasis {
            if !(strength.is_finite() && strength >= 0.0) {
                return Err(invalid(format!("edge_emphasis must be >= 0, got {}", strength)));
            }
        }
        if let Some(ThresholdMode::Adaptive {
            block_size,
            constant,
        }) = self.threshold
        {
            if block_size < 3 {
                return Err(invalid(format!("adaptive block_size must be >= 3, got {}", block_size)));
            }
            if !constant.is_finite() {
                return Err(invalid("adaptive constant must be finite"));
            }
        }
        if !(0.0..=1.0).contains(&self.output_quality) {
            return Err(invalid(format!(
                "output_quality must lie in [0, 1], got {}",
                self.output_quality
            )));
        }
        Ok(())
    }
}

/// Bounds of the recursive quadrant search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Deepest node depth; the root is depth 0.
    pub max_depth: u32,
    /// Regions narrower or shorter than this are not subdivided.
    pub min_region_size: u32,
    /// Retry an exhausted page at successively smaller scales.
    pub rescan: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_region_size: 100,
            rescan: false,
        }
    }
}

impl SearchConfig {
    /// Upper bound on decode attempts for one initial region.
    pub fn max_attempts(&self) -> u64 {
        (0..=self.max_depth).map(|d| 4u64.saturating_pow(d)).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth > 6 {
            return Err(invalid(format!("max_depth {} exceeds 6", self.max_depth)));
        }
        if self.min_region_size < 2 {
            return Err(invalid("min_region_size must be >= 2"));
        }
        Ok(())
    }
}

/// How sources are turned into pixel buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// PDF render scale, in [1, 8].
    pub render_scale: f32,
    /// Search every page in order instead of only the first.
    pub multi_page: bool,
    /// Optional cap on the number of pages searched.
    pub max_pages: Option<usize>,
    pub max_document_bytes: usize,
    pub max_raster_pixels: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            multi_page: true,
            max_pages: None,
            max_document_bytes: 50 * 1024 * 1024,
            max_raster_pixels: 64_000_000,
        }
    }
}

impl AcquisitionConfig {
    /// Number of pages to visit in a document with `page_count` pages.
    pub fn pages_to_search(&self, page_count: usize) -> usize {
        let wanted = if self.multi_page { page_count } else { page_count.min(1) };
        match self.max_pages {
            Some(cap) => wanted.min(cap),
            None => wanted,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1.0..=8.0).contains(&self.render_scale) {
            return Err(invalid(format!(
                "render_scale must lie in [1, 8], got {}",
                self.render_scale
            )));
        }
        if self.max_pages == Some(0) {
            return Err(invalid("max_pages must be positive"));
        }
        if self.max_document_bytes == 0 || self.max_raster_pixels == 0 {
            return Err(invalid("size limits must be positive"));
        }
        Ok(())
    }
}

/// Everything a decode request needs, immutable for the request's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub enhancement: EnhancementConfig,
    pub search: SearchConfig,
    pub acquisition: AcquisitionConfig,
}

impl ScanConfig {
    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.enhancement.validate()?;
        self.search.validate()?;
        self.acquisition.validate()
    }
}

fn invalid(msg: impl Into<String>) -> ScanwerkError {
    ScanwerkError::InvalidConfig(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ScanConfig::default().validate().unwrap();
        EnhancementConfig::passthrough().validate().unwrap();
    }

    #[test]
    fn default_search_allows_85_attempts() {
        assert_eq!(SearchConfig::default().max_attempts(), 85);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = ScanConfig::from_json(
            r#"{
                "enhancement": { "gamma": 1.5, "threshold": { "mode": "fixed", "value": 160 } },
                "acquisition": { "multi_page": false }
            }"#,
        )
        .unwrap();
        assert_eq!(config.enhancement.gamma, 1.5);
        assert_eq!(
            config.enhancement.threshold,
            Some(ThresholdMode::Fixed { value: 160 })
        );
        assert!(!config.acquisition.multi_page);
        assert_eq!(config.search, SearchConfig::default());
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let config = ScanConfig::default();
        let back = ScanConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = ScanConfig::default();
        config.enhancement.scaling_factor = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ScanwerkError::InvalidConfig(_))
        ));

        let mut config = ScanConfig::default();
        config.acquisition.render_scale = 12.0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.enhancement.threshold = Some(ThresholdMode::Adaptive {
            block_size: 1,
            constant: 5.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            ScanConfig::from_json("{ not json"),
            Err(ScanwerkError::Serialization(_))
        ));
    }

    #[test]
    fn pages_to_search_respects_mode_and_cap() {
        let mut acq = AcquisitionConfig::default();
        assert_eq!(acq.pages_to_search(5), 5);
        acq.max_pages = Some(2);
        assert_eq!(acq.pages_to_search(5), 2);
        acq.multi_page = false;
        assert_eq!(acq.pages_to_search(5), 1);
        assert_eq!(acq.pages_to_search(0), 0);
    }
}
