//! Image decoding and normalization for the classifier input.

use image::imageops::FilterType;

use crate::errors::ClassifyError;

/// Spatial resolution the model was trained on.
pub const INPUT_SIZE: u32 = 224;
/// RGB channel count.
pub const CHANNELS: usize = 3;

/// Number of float values in one flattened input image.
pub const INPUT_LEN: usize = (INPUT_SIZE as usize) * (INPUT_SIZE as usize) * CHANNELS;

/// Decodes an encoded image and turns it into the flat `[0,1]` float vector
/// the classifier expects: 224x224, RGB interleaved, row-major. The batch
/// dimension is added by the backend.
///
/// The resize is exact (aspect ratio is not preserved) with nearest-neighbor
/// sampling, matching the preprocessing the model was trained against.
pub fn pixels_from_bytes(data: &[u8]) -> Result<Vec<f32>, ClassifyError> {
    let img = image::load_from_memory(data)?;
    let resized = img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Nearest)
        .to_rgb8();

    let mut pixels = Vec::with_capacity(INPUT_LEN);
    for pixel in resized.pixels() {
        pixels.push(pixel[0] as f32 / 255.0);
        pixels.push(pixel[1] as f32 / 255.0);
        pixels.push(pixel[2] as f32 / 255.0);
    }

    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClassifyError;
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn output_has_fixed_shape_and_range() {
        let pixels = pixels_from_bytes(&encode_png(64, 48, [120, 200, 80])).unwrap();
        assert_eq!(pixels.len(), INPUT_LEN);
        assert!(pixels.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn channel_order_is_rgb() {
        let pixels = pixels_from_bytes(&encode_png(10, 10, [255, 0, 0])).unwrap();
        assert_eq!(pixels[0], 1.0);
        assert_eq!(pixels[1], 0.0);
        assert_eq!(pixels[2], 0.0);
    }

    #[test]
    fn full_intensity_normalizes_to_one() {
        let pixels = pixels_from_bytes(&encode_png(1, 1, [255, 255, 255])).unwrap();
        assert!(pixels.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let err = pixels_from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode(_)));
    }
}
