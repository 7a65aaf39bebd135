// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image enhancement chain — rescale, grayscale, denoise, sharpen, edge
// emphasis, tone curve and binarization, tuned for code decoding rather than
// for looking good.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::{filter3x3, gaussian_blur_f32};
use imageproc::gradients::sobel_gradients;
use scanwerk_core::config::{DenoiseMode, EnhancementConfig, ThresholdMode};
use scanwerk_core::error::Result;
use scanwerk_core::types::{CHANNELS, EncodedImage, PixelBuffer};
use tracing::{debug, instrument, warn};

use crate::image::processor::ImageProcessor;

/// Intensity falloff of the bilateral denoise, in luminance units.
const BILATERAL_SIGMA_INTENSITY: f32 = 24.0;

/// `[[0,-1,0],[-1,5,-1],[0,-1,0]]`: unsharp Laplacian, sums to one.
const SHARPEN_KERNEL: [i32; 9] = [0, -1, 0, -1, 5, -1, 0, -1, 0];

/// Largest magnitude `sobel_gradients` can report (4 * 255 per axis).
const SOBEL_MAX: f32 = 1442.5;

/// Applies an [`EnhancementConfig`] to pixel buffers.
///
/// The stages run in a fixed order; each one is skipped when the config
/// disables it:
///
/// 1. Rescale so the larger side is at most `max_dimension`
/// 2. Grayscale (ITU-R BT.601 luminance)
/// 3. Denoise (Gaussian or bilateral)
/// 4. Sharpen (3x3 Laplacian-style kernel)
/// 5. Edge emphasis (Sobel magnitude darkening)
/// 6. Gamma, then contrast and brightness
/// 7. Threshold (fixed, adaptive local mean, or Otsu)
///
/// Alpha is carried through untouched.
#[derive(Debug, Clone)]
pub struct ImageEnhancer {
    config: EnhancementConfig,
}

impl ImageEnhancer {
    pub fn new(config: EnhancementConfig) -> Self {
        Self { config }
    }

    /// Run the chain over `buffer`.
    ///
    /// Never fails: if an internal stage errors the input is returned
    /// unchanged and the problem is logged.
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
    pub fn enhance(&self, buffer: PixelBuffer) -> PixelBuffer {
        match self.try_enhance(&buffer) {
            Ok(enhanced) => enhanced,
            Err(err) => {
                warn!(%err, "Enhancement failed, using the unenhanced buffer");
                buffer
            }
        }
    }

    /// Serialize a buffer in the configured output format.
    pub fn encode(&self, buffer: PixelBuffer) -> Result<EncodedImage> {
        ImageProcessor::from_pixel_buffer(buffer)?
            .encode(self.config.output_format, self.config.output_quality)
    }

    /// `enhance` followed by `encode`: the exact bytes a decoder sees.
    pub fn enhance_and_encode(&self, buffer: PixelBuffer) -> Result<EncodedImage> {
        self.encode(self.enhance(buffer))
    }

    fn try_enhance(&self, buffer: &PixelBuffer) -> Result<PixelBuffer> {
        let config = &self.config;

        let mut working = if buffer.width().max(buffer.height()) > config.max_dimension {
            ImageProcessor::from_pixel_buffer(buffer.clone())?
                .fit_within(config.max_dimension)
                .into_pixel_buffer()?
        } else {
            buffer.clone()
        };

        if config.grayscale {
            grayscale(&mut working);
        }
        if config.denoise {
            match config.denoise_mode {
                DenoiseMode::Gaussian => gaussian_denoise(&mut working, config.denoise_radius)?,
                DenoiseMode::Bilateral => bilateral_denoise(&mut working, config.denoise_radius),
            }
        }
        if config.sharpen {
            sharpen(&mut working)?;
        }
        if let Some(strength) = config.edge_emphasis {
            emphasize_edges(&mut working, strength);
        }
        apply_tone(&mut working, config.gamma, config.contrast, config.brightness);
        if let Some(mode) = config.threshold {
            threshold(&mut working, mode);
        }

        debug!(
            width = working.width(),
            height = working.height(),
            "Enhancement chain complete"
        );
        Ok(working)
    }
}

// -- Stages -------------------------------------------------------------------

/// BT.601 luma in integer arithmetic, so pure black and white stay exact.
fn luminance(px: &[u8]) -> u8 {
    let weighted = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
    ((weighted + 500) / 1000).min(255) as u8
}

fn luminance_plane(buffer: &PixelBuffer) -> Vec<u8> {
    buffer.pixels().chunks_exact(CHANNELS).map(luminance).collect()
}

fn grayscale(buffer: &mut PixelBuffer) {
    for px in buffer.pixels_mut().chunks_exact_mut(CHANNELS) {
        let l = luminance(px);
        px[0] = l;
        px[1] = l;
        px[2] = l;
    }
}

/// Round-trip through `image` so the imageproc filters can run on the buffer.
fn rgba_image(buffer: &PixelBuffer) -> Result<RgbaImage> {
    Ok(ImageProcessor::from_pixel_buffer(buffer.clone())?
        .into_dynamic()
        .into_rgba8())
}

/// Copy the colour channels of `filtered` into `buffer`, keeping its alpha.
fn replace_colour(buffer: &mut PixelBuffer, filtered: &RgbaImage) {
    for (dst, src) in buffer
        .pixels_mut()
        .chunks_exact_mut(CHANNELS)
        .zip(filtered.as_raw().chunks_exact(CHANNELS))
    {
        dst[..3].copy_from_slice(&src[..3]);
    }
}

fn gaussian_denoise(buffer: &mut PixelBuffer, radius: u32) -> Result<()> {
    let blurred = gaussian_blur_f32(&rgba_image(buffer)?, radius.max(1) as f32);
    replace_colour(buffer, &blurred);
    Ok(())
}

/// Edge-preserving smoothing: Gaussian spatial weights, scaled down by
/// `exp(-|dL| / sigma)` for neighbours whose luminance differs from the centre.
fn bilateral_denoise(buffer: &mut PixelBuffer, radius: u32) {
    let (w, h) = (buffer.width() as i64, buffer.height() as i64);
    let r = radius.max(1) as i64;
    let side = (2 * r + 1) as usize;

    let two_sigma_sq = 2.0 * (r * r) as f32;
    let mut spatial = Vec::with_capacity(side * side);
    for dy in -r..=r {
        for dx in -r..=r {
            spatial.push((-((dx * dx + dy * dy) as f32) / two_sigma_sq).exp());
        }
    }

    let source = buffer.pixels().to_vec();
    let luma: Vec<u8> = source.chunks_exact(CHANNELS).map(luminance).collect();
    let out = buffer.pixels_mut();

    for y in 0..h {
        for x in 0..w {
            let centre = (y * w + x) as usize;
            let mut acc = [0f32; 3];
            let mut weight_sum = 0f32;

            for dy in -r..=r {
                let ny = y + dy;
                if ny < 0 || ny >= h {
                    continue;
                }
                for dx in -r..=r {
                    let nx = x + dx;
                    if nx < 0 || nx >= w {
                        continue;
                    }
                    let neighbour = (ny * w + nx) as usize;
                    let delta = (luma[neighbour] as f32 - luma[centre] as f32).abs();
                    let weight = spatial[((dy + r) as usize) * side + (dx + r) as usize]
                        * (-delta / BILATERAL_SIGMA_INTENSITY).exp();
                    let base = neighbour * CHANNELS;
                    for (c, slot) in acc.iter_mut().enumerate() {
                        *slot += weight * source[base + c] as f32;
                    }
                    weight_sum += weight;
                }
            }

            let base = centre * CHANNELS;
            for (c, value) in acc.iter().enumerate() {
                out[base + c] = clamp_u8(value / weight_sum);
            }
        }
    }
}

/// Per colour channel, border pixels replicated, results saturated to a byte.
fn sharpen(buffer: &mut PixelBuffer) -> Result<()> {
    let sharpened: RgbaImage = filter3x3::<_, i32, u8>(&rgba_image(buffer)?, &SHARPEN_KERNEL);
    replace_colour(buffer, &sharpened);
    Ok(())
}

/// Darken pixels in proportion to their Sobel gradient magnitude, so module
/// boundaries survive a later threshold.
fn emphasize_edges(buffer: &mut PixelBuffer, strength: f32) {
    if strength <= 0.0 {
        return;
    }
    let (w, h) = (buffer.width(), buffer.height());
    let luma = luminance_plane(buffer);
    let gray = GrayImage::from_fn(w, h, |x, y| Luma([luma[(y * w + x) as usize]]));
    let gradients = sobel_gradients(&gray);

    for (i, px) in buffer.pixels_mut().chunks_exact_mut(CHANNELS).enumerate() {
        let x = i as u32 % w;
        let y = i as u32 / w;
        let magnitude = gradients.get_pixel(x, y).0[0] as f32;
        let darken = strength * 255.0 * (magnitude / SOBEL_MAX).min(1.0);
        for value in px.iter_mut().take(3) {
            *value = clamp_u8(*value as f32 - darken);
        }
    }
}

/// `clamp(255 * (in/255)^gamma * contrast + brightness)`, via a lookup table.
fn apply_tone(buffer: &mut PixelBuffer, gamma: f32, contrast: f32, brightness: f32) {
    if gamma == 1.0 && contrast == 1.0 && brightness == 0.0 {
        return;
    }
    let lut = tone_table(gamma, contrast, brightness);
    for px in buffer.pixels_mut().chunks_exact_mut(CHANNELS) {
        for value in px.iter_mut().take(3) {
            *value = lut[*value as usize];
        }
    }
}

fn tone_table(gamma: f32, contrast: f32, brightness: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        let normalised = i as f32 / 255.0;
        *slot = clamp_u8(255.0 * normalised.powf(gamma) * contrast + brightness);
    }
    lut
}

fn threshold(buffer: &mut PixelBuffer, mode: ThresholdMode) {
    let (w, h) = (buffer.width(), buffer.height());
    let luma = luminance_plane(buffer);

    let is_white: Box<dyn Fn(usize) -> bool> = match mode {
        ThresholdMode::Fixed { value } => Box::new(move |i| luma[i] > value),
        ThresholdMode::Otsu => {
            let gray = GrayImage::from_fn(w, h, |x, y| Luma([luma[(y * w + x) as usize]]));
            let level = otsu_level(&gray);
            debug!(level, "Otsu level computed");
            Box::new(move |i| luma[i] > level)
        }
        ThresholdMode::Adaptive {
            block_size,
            constant,
        } => {
            let integral = compute_integral_image(&luma, w, h);
            let global_mean = integral[integral.len() - 1] as f64 / (w as f64 * h as f64);
            let constant = constant as f64;
            Box::new(move |i| {
                let x = i as u32 % w;
                let y = i as u32 / w;
                let mean = window_mean(&integral, w, h, x, y, block_size).unwrap_or(global_mean);
                luma[i] as f64 > mean - constant
            })
        }
    };

    for (i, px) in buffer.pixels_mut().chunks_exact_mut(CHANNELS).enumerate() {
        let v = if is_white(i) { 255 } else { 0 };
        px[0] = v;
        px[1] = v;
        px[2] = v;
    }
}

fn clamp_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

// -- Integral image helpers ---------------------------------------------------

/// Summed-area table of a `width` x `height` luminance plane.
///
/// `table[y * (width+1) + x]` holds the sum of all samples above and to the
/// left of (x, y), exclusive. The first row and column are zero.
fn compute_integral_image(luma: &[u8], width: u32, height: u32) -> Vec<u64> {
    let stride = (width + 1) as usize;
    let mut table = vec![0u64; stride * (height + 1) as usize];

    for y in 0..height as usize {
        let mut row_sum: u64 = 0;
        for x in 0..width as usize {
            row_sum += luma[y * width as usize + x] as u64;
            table[(y + 1) * stride + x + 1] = row_sum + table[y * stride + x + 1];
        }
    }

    table
}

/// Mean of the `block` x `block` window centred on (cx, cy), clipped at the
/// image edges. `None` when the clipped window is empty.
fn window_mean(
    integral: &[u64],
    width: u32,
    height: u32,
    cx: u32,
    cy: u32,
    block: u32,
) -> Option<f64> {
    let stride = (width + 1) as usize;
    let before = block / 2;
    let after = block - before;

    let x1 = cx.saturating_sub(before) as usize;
    let y1 = cy.saturating_sub(before) as usize;
    let x2 = (cx.saturating_add(after) as usize).min(width as usize);
    let y2 = (cy.saturating_add(after) as usize).min(height as usize);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    let sum = integral[y2 * stride + x2] + integral[y1 * stride + x1]
        - integral[y1 * stride + x2]
        - integral[y2 * stride + x1];
    Some(sum as f64 / area)
}

// -- Tests --------------------------------------------------------------------
