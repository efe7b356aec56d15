//! Conversions between `image` buffers and `ndarray` pixel arrays.
//!
//! Interleaved arrays use `[row, col, channel]` indexing with shape
//! `(height, width, channels)`. The array store keeps images channel-first,
//! `(channels, height, width)`.

use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::{Array, Array3, ArrayView, ArrayView3, Dimension};
use std::path::Path;
use tracing::debug;

/// Copies an RGB image into a `(height, width, 3)` array.
pub fn rgb_to_array(img: &RgbImage) -> Array3<u8> {
    let (width, height) = img.dimensions();

    Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        img.get_pixel(x as u32, y as u32)[c]
    })
}

/// Turns a `(height, width, 3)` array back into an RGB image.
///
/// Returns `None` if the array doesn't have exactly three channels.
pub fn array_to_rgb(pixels: ArrayView3<u8>) -> Option<RgbImage> {
    let (height, width, channels) = pixels.dim();
    if channels != 3 {
        return None;
    }

    Some(ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([pixels[[y, x, 0]], pixels[[y, x, 1]], pixels[[y, x, 2]]])
    }))
}

/// `(height, width, channels)` -> `(channels, height, width)`
pub fn to_channel_first<T: Clone>(pixels: ArrayView3<T>) -> Array3<T> {
    pixels
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned()
}

/// `(channels, height, width)` -> `(height, width, channels)`
pub fn from_channel_first<T: Clone>(pixels: ArrayView3<T>) -> Array3<T> {
    pixels
        .permuted_axes([1, 2, 0])
        .as_standard_layout()
        .into_owned()
}

/// Maps 8 bit pixel values onto floats in `[0, 1]`.
pub fn to_float<D: Dimension>(pixels: ArrayView<u8, D>) -> Array<f64, D> {
    pixels.mapv(|p| f64::from(p) / f64::from(u8::MAX))
}

/// Opens an image file as RGB and returns its pixels as floats in `[0, 1]`.
pub fn load_float(path: &Path) -> image::ImageResult<Array3<f64>> {
    let img = image::open(path)?.to_rgb8();
    let pixels = to_float(rgb_to_array(&img).view());
    debug!(path = %path.display(), shape = ?pixels.dim(), "loaded image as floats");

    Ok(pixels)
}
