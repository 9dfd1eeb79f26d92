use image::imageops::{self, colorops::BiLevel, crop_imm, FilterType};
use image::{GrayImage, ImageBuffer, RgbImage};

pub use image::imageops::colorops::grayscale;

pub const WHITE: u8 = u8::MAX;
pub const BLACK: u8 = u8::MIN;

/// Scale the image to fit within `width`x`height` keeping its aspect ratio and
/// center it on a black canvas, like the ffmpeg scale+pad filter chain.
pub fn letterbox(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    assert!(width > 0 && height > 0);
    let (fit_w, fit_h) = fit_dimensions(image.width(), image.height(), width, height);
    let scaled = imageops::resize(image, fit_w, fit_h, FilterType::Lanczos3);

    let mut canvas = RgbImage::new(width, height);
    let x = (width - fit_w) / 2;
    let y = (height - fit_h) / 2;
    imageops::overlay(&mut canvas, &scaled, x.into(), y.into());
    canvas
}

/// Scale the image to cover `width`x`height` keeping its aspect ratio and crop
/// the overshoot equally from both sides.
pub fn fill_crop(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    assert!(width > 0 && height > 0);
    let (cover_w, cover_h) =
        cover_dimensions(image.width(), image.height(), width, height);
    let scaled = imageops::resize(image, cover_w, cover_h, FilterType::Lanczos3);

    let x = (cover_w - width) / 2;
    let y = (cover_h - height) / 2;
    crop_imm(&scaled, x, y, width, height).to_image()
}

/// The largest dimensions with the same aspect ratio as `oldw`x`oldh` that
/// still fit within the target.
fn fit_dimensions(oldw: u32, oldh: u32, neww: u32, newh: u32) -> (u32, u32) {
    assert!(oldw > 0 && oldh > 0);
    let scaled_h = (neww as u64 * oldh as u64) / oldw as u64;
    if scaled_h <= newh as u64 {
        (neww, (scaled_h as u32).max(1))
    } else {
        let scaled_w = (newh as u64 * oldw as u64) / oldh as u64;
        ((scaled_w as u32).max(1), newh)
    }
}

/// The smallest dimensions with the same aspect ratio as `oldw`x`oldh` that
/// completely cover the target.
fn cover_dimensions(oldw: u32, oldh: u32, neww: u32, newh: u32) -> (u32, u32) {
    assert!(oldw > 0 && oldh > 0);
    let scaled_h = div_ceil(neww as u64 * oldh as u64, oldw as u64);
    if scaled_h >= newh as u64 {
        (neww, scaled_h as u32)
    } else {
        let scaled_w = div_ceil(newh as u64 * oldw as u64, oldh as u64);
        (scaled_w as u32, newh)
    }
}

fn div_ceil(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

/// Adjust the contrast around the mean luminance. A factor of 1.0 returns the
/// image untouched, 0.0 makes it a solid gray.
pub fn adjust_contrast(mut image: GrayImage, factor: f32) -> GrayImage {
    if image.is_empty() || factor == 1.0 {
        return image;
    }

    let sum: u64 = image.pixels().map(|p| u64::from(p[0])).sum();
    let mean = sum as f32 / (image.width() * image.height()) as f32;

    image.pixels_mut().for_each(|p| {
        let adjusted = mean + (p[0] as f32 - mean) * factor;
        p[0] = adjusted.round().clamp(0.0, 255.0) as u8;
    });
    image
}

/// Floyd-Steinberg dither down to pure black and white.
pub fn dither_1bit(image: &mut GrayImage) {
    imageops::colorops::dither(image, &BiLevel);
}

/// Pack a bilevel image into one bit per pixel, most significant bit first,
/// rows padded to a byte boundary. White is 1.
pub fn pack_1bpp(image: &GrayImage) -> Vec<u8> {
    let bytes_per_row = (image.width() as usize + 7) / 8;
    let mut packed = vec![0u8; bytes_per_row * image.height() as usize];

    for (x, y, p) in image.enumerate_pixels() {
        if p[0] >= 128 {
            let i = y as usize * bytes_per_row + x as usize / 8;
            packed[i] |= 0x80 >> (x % 8);
        }
    }
    packed
}

pub fn filled(width: u32, height: u32, red: u8, green: u8, blue: u8) -> RgbImage {
    let mut buf = ImageBuffer::new(width, height);
    buf.pixels_mut()
        .for_each(|pixel| *pixel = image::Rgb([red, green, blue]));
    buf
}

pub fn construct_gray(raw: &[&[u8]]) -> GrayImage {
    assert!(raw.windows(2).all(|w| w[0].len() == w[1].len()));
    let height = raw.len() as u32;
    let width = raw.iter().next().map(|row| row.len()).unwrap_or(0) as u32;
    GrayImage::from_fn(width, height, |x, y| {
        image::Luma([raw[y as usize][x as usize]])
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn luma(image: &GrayImage, x: u32, y: u32) -> u8 {
        image.get_pixel(x, y)[0]
    }

    #[test]
    fn fit_wide_into_square() {
        assert_eq!((100, 50), fit_dimensions(200, 100, 100, 100));
        assert_eq!((50, 100), fit_dimensions(100, 200, 100, 100));
        assert_eq!((100, 100), fit_dimensions(64, 64, 100, 100));
    }

    #[test]
    fn cover_is_at_least_target() {
        let (w, h) = cover_dimensions(200, 100, 100, 100);
        assert!(w >= 100 && h >= 100);
        assert_eq!((200, 100), cover_dimensions(200, 100, 200, 50));
    }

    #[test]
    fn letterbox_pads_with_black() {
        let white = filled(100, 100, WHITE, WHITE, WHITE);
        let boxed = letterbox(&white, 200, 100);
        assert_eq!((200, 100), boxed.dimensions());
        // the square ends up centered, columns outside it stay black
        assert_eq!(image::Rgb([BLACK; 3]), *boxed.get_pixel(10, 50));
        assert_eq!(image::Rgb([BLACK; 3]), *boxed.get_pixel(190, 50));
        assert_eq!(image::Rgb([WHITE; 3]), *boxed.get_pixel(100, 50));
    }

    #[test]
    fn fill_crop_has_exact_dimensions() {
        let img = filled(123, 45, 10, 20, 30);
        assert_eq!((80, 48), fill_crop(&img, 80, 48).dimensions());
    }

    #[test]
    fn contrast_identity_and_flatten() {
        let img = construct_gray(&[&[0, 100, 200]]);
        assert_eq!(img, adjust_contrast(img.clone(), 1.0));

        let flat = adjust_contrast(img, 0.0);
        assert_eq!(luma(&flat, 0, 0), luma(&flat, 1, 0));
        assert_eq!(luma(&flat, 1, 0), luma(&flat, 2, 0));
    }

    #[test]
    fn contrast_pushes_away_from_mean() {
        let img = construct_gray(&[&[50, 150]]);
        let punchy = adjust_contrast(img, 2.0);
        assert!(luma(&punchy, 0, 0) < 50);
        assert!(luma(&punchy, 1, 0) > 150);
    }

    #[test]
    fn dither_keeps_extremes() {
        let mut img = construct_gray(&[&[BLACK, WHITE], &[WHITE, BLACK]]);
        dither_1bit(&mut img);
        assert_eq!(BLACK, luma(&img, 0, 0));
        assert_eq!(WHITE, luma(&img, 1, 0));
    }

    #[test]
    fn pack_whole_bytes() {
        let img = construct_gray(&[&[WHITE; 8], &[BLACK; 8]]);
        assert_eq!(vec![0xFF, 0x00], pack_1bpp(&img));
    }

    #[test]
    fn pack_pads_rows() {
        let mut row = [BLACK; 10];
        row[0] = WHITE;
        row[9] = WHITE;
        let img = construct_gray(&[&row]);
        // bit 0 of the first byte and bit 9 overall, rest is padding
        assert_eq!(vec![0x80, 0x40], pack_1bpp(&img));
    }
}
