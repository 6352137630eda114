//! Deterministic style filters.
//!
//! Every recipe works on an RGBA copy of the input and returns an image with
//! the same dimensions. Alpha is carried through untouched.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use pictura_contracts::styles::{StyleName, StyleSelection};

const EDGE_KERNEL: [i32; 9] = [-1, -1, -1, -1, 8, -1, -1, -1, -1];
const PIXEL_ART_DIVISOR: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Unknown styles are filtered as monochrome.
pub fn filter_style(selection: &StyleSelection) -> StyleName {
    selection.style().unwrap_or(StyleName::Monochrome)
}

pub fn filter_bytes(bytes: &[u8], selection: &StyleSelection) -> Result<DynamicImage, FilterError> {
    let decoded = image::load_from_memory(bytes)?;
    apply_filter(&decoded, filter_style(selection))
}

pub fn apply_filter(image: &DynamicImage, style: StyleName) -> Result<DynamicImage, FilterError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(FilterError::Empty { width, height });
    }
    let rgba = image.to_rgba8();

    let out = match style {
        StyleName::Monochrome => enhance_contrast(&to_grayscale(&rgba), 1.2),
        StyleName::Sketch => {
            let inverted = invert(&to_grayscale(&rgba));
            invert(&find_edges(&inverted))
        }
        StyleName::Anime => {
            // The edge map is computed but never blended into the output.
            let _edges = find_edges(&rgba);
            enhance_color(&rgba, 1.5)
        }
        StyleName::Watercolor => enhance_color(&gaussian_blur(&rgba, 2.0), 0.8),
        StyleName::OilPainting => {
            let contrasted = enhance_contrast(&rgba, 1.3);
            gaussian_blur(&enhance_color(&contrasted, 1.4), 0.5)
        }
        StyleName::PixelArt => pixelate(&rgba, PIXEL_ART_DIVISOR),
        StyleName::Neon => {
            let edges = find_edges(&rgba);
            enhance_brightness(&enhance_color(&edges, 2.0), 1.5)
        }
        StyleName::PopArt => enhance_contrast(&enhance_color(&rgba, 2.0), 1.5),
    };

    tracing::debug!(style = style.id(), width, height, "applied filter");
    Ok(DynamicImage::ImageRgba8(out))
}

fn luma(pixel: &Rgba<u8>) -> f32 {
    let [r, g, b, _] = pixel.0;
    (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) as f32 / 1000.0
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn map_rgb(image: &RgbaImage, mut f: impl FnMut(&Rgba<u8>, u8) -> u8) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let source = *pixel;
        for channel in 0..3 {
            pixel.0[channel] = f(&source, source.0[channel]);
        }
    }
    out
}

fn to_grayscale(image: &RgbaImage) -> RgbaImage {
    map_rgb(image, |pixel, _| luma(pixel) as u8)
}

fn invert(image: &RgbaImage) -> RgbaImage {
    map_rgb(image, |_, value| 255 - value)
}

/// Saturation: blends each channel away from the pixel's own grey value.
fn enhance_color(image: &RgbaImage, factor: f32) -> RgbaImage {
    map_rgb(image, |pixel, value| {
        let base = luma(pixel);
        clamp_channel(base + factor * (f32::from(value) - base))
    })
}

/// Contrast: blends away from the mean grey level of the whole image.
fn enhance_contrast(image: &RgbaImage, factor: f32) -> RgbaImage {
    let count = u64::from(image.width()) * u64::from(image.height());
    let total: f64 = image.pixels().map(|pixel| f64::from(luma(pixel) as u8)).sum();
    let mean = (total / count.max(1) as f64 + 0.5).floor() as f32;
    map_rgb(image, |_, value| {
        clamp_channel(mean + factor * (f32::from(value) - mean))
    })
}

fn enhance_brightness(image: &RgbaImage, factor: f32) -> RgbaImage {
    map_rgb(image, |_, value| clamp_channel(factor * f32::from(value)))
}

fn gaussian_blur(image: &RgbaImage, radius: f32) -> RgbaImage {
    let mut out = imageops::blur(image, radius);
    for (blurred, source) in out.pixels_mut().zip(image.pixels()) {
        blurred.0[3] = source.0[3];
    }
    out
}

/// 3x3 edge kernel over the colour channels, sampling clamped to the border.
fn find_edges(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    for y in 0..height {
        for x in 0..width {
            let mut sums = [0i32; 3];
            for (index, weight) in EDGE_KERNEL.iter().enumerate() {
                let dx = (index % 3) as i64 - 1;
                let dy = (index / 3) as i64 - 1;
                let sx = (i64::from(x) + dx).clamp(0, i64::from(width) - 1) as u32;
                let sy = (i64::from(y) + dy).clamp(0, i64::from(height) - 1) as u32;
                let sample = image.get_pixel(sx, sy);
                for (channel, sum) in sums.iter_mut().enumerate() {
                    *sum += weight * i32::from(sample.0[channel]);
                }
            }
            let pixel = out.get_pixel_mut(x, y);
            for (channel, sum) in sums.into_iter().enumerate() {
                pixel.0[channel] = sum.clamp(0, 255) as u8;
            }
        }
    }
    out
}

fn pixelate(image: &RgbaImage, divisor: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let small_width = (width / divisor).max(1);
    let small_height = (height / divisor).max(1);
    let small = imageops::resize(image, small_width, small_height, FilterType::Nearest);
    imageops::resize(&small, width, height, FilterType::Nearest)
}
