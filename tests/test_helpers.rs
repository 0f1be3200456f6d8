//! # Test Helper Library
//!
//! Raster builders shared by the integration tests.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Opaque gray pixel
pub fn gray(value: u8) -> Rgba<u8> {
    Rgba([value, value, value, 255])
}

/// White canvas of the given size
pub fn white_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, WHITE)
}

/// Fill the `[x, x+w) x [y, y+h)` block with `pixel`
pub fn fill_rect(raster: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, pixel: Rgba<u8>) {
    for py in y..y + h {
        for px in x..x + w {
            raster.put_pixel(px, py, pixel);
        }
    }
}

/// Simulated document photo: white page with a dark block of "text"
pub fn document_page(width: u32, height: u32, text_x: u32, text_y: u32, text_w: u32, text_h: u32) -> RgbaImage {
    let mut raster = white_canvas(width, height);
    fill_rect(&mut raster, text_x, text_y, text_w, text_h, gray(20));
    raster
}

/// Asserts two floats agree to within `1e-9`
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} to be close to {}",
        actual,
        expected
    );
}
