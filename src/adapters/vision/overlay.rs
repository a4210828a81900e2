//! Drawing helpers shared by all detectors: contour outlines, boxes and a
//! small built-in 5x7 bitmap font for labels, so no font file is needed.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

pub const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const COUNT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Baseline-left anchor of the count label.
pub const COUNT_ANCHOR: (i32, i32) = (20, 50);
const COUNT_SCALE: u32 = 3;
const LABEL_SCALE: u32 = 2;

const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;

/// Draws each contour as a closed polyline, two pixels thick.
pub fn draw_contours(image: &mut RgbImage, contours: &[Vec<Point<i32>>], color: Rgb<u8>) {
    for contour in contours {
        match contour.len() {
            0 => {}
            1 => {
                let p = contour[0];
                draw_filled_rect_mut(image, Rect::at(p.x, p.y).of_size(2, 2), color);
            }
            n => {
                for i in 0..n {
                    let a = contour[i];
                    let b = contour[(i + 1) % n];
                    thick_segment(image, a, b, color);
                }
            }
        }
    }
}

fn thick_segment(image: &mut RgbImage, a: Point<i32>, b: Point<i32>, color: Rgb<u8>) {
    let (ax, ay, bx, by) = (a.x as f32, a.y as f32, b.x as f32, b.y as f32);
    draw_line_segment_mut(image, (ax, ay), (bx, by), color);
    draw_line_segment_mut(image, (ax + 1.0, ay), (bx + 1.0, by), color);
    draw_line_segment_mut(image, (ax, ay + 1.0), (bx, by + 1.0), color);
}

/// Draws a labelled box given corner coordinates in pixels.
pub fn draw_box(image: &mut RgbImage, x1: f32, y1: f32, x2: f32, y2: f32, label: &str) {
    let w = image.width() as f32;
    let h = image.height() as f32;
    let left = x1.clamp(0.0, (w - 1.0).max(0.0)).round() as i32;
    let top = y1.clamp(0.0, (h - 1.0).max(0.0)).round() as i32;
    let right = x2.clamp(0.0, (w - 1.0).max(0.0)).round() as i32;
    let bottom = y2.clamp(0.0, (h - 1.0).max(0.0)).round() as i32;
    if right <= left || bottom <= top {
        return;
    }

    let rect = Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32);
    draw_hollow_rect_mut(image, rect, BOX_COLOR);
    if right - left > 2 && bottom - top > 2 {
        let inner = Rect::at(left + 1, top + 1).of_size((right - left - 2) as u32, (bottom - top - 2) as u32);
        draw_hollow_rect_mut(image, inner, BOX_COLOR);
    }

    let label_h = GLYPH_H * LABEL_SCALE as i32;
    let label_y = (top - label_h - 2).max(0);
    draw_text(image, left, label_y, label, LABEL_SCALE, BOX_COLOR);
}

/// Writes `COUNT: n` at the fixed anchor.
pub fn draw_count(image: &mut RgbImage, count: usize) {
    let (x, baseline) = COUNT_ANCHOR;
    let top = baseline - GLYPH_H * COUNT_SCALE as i32;
    draw_text(image, x, top, &format!("Count: {}", count), COUNT_SCALE, COUNT_COLOR);
}

/// Renders text with the built-in font. Unknown characters advance the
/// cursor without drawing; anything outside the image is clipped.
pub fn draw_text(image: &mut RgbImage, x: i32, y: i32, text: &str, scale: u32, color: Rgb<u8>) {
    let step = (GLYPH_W + 1) * scale as i32;
    let mut cursor = x;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(rows) = glyph_bits(ch) {
            for (row, pattern) in rows.iter().enumerate() {
                for col in 0..GLYPH_W {
                    if (pattern >> (GLYPH_W - 1 - col)) & 1 == 1 {
                        let px = cursor + col * scale as i32;
                        let py = y + row as i32 * scale as i32;
                        draw_filled_rect_mut(image, Rect::at(px, py).of_size(scale, scale), color);
                    }
                }
            }
        }
        cursor += step;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'N' => [0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '%' => [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_label_lands_near_the_anchor() {
        let mut image = RgbImage::new(200, 100);
        draw_count(&mut image, 7);
        let (x, baseline) = COUNT_ANCHOR;
        let red = image
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == COUNT_COLOR)
            .map(|(px, py, _)| (px as i32, py as i32))
            .collect::<Vec<_>>();
        assert!(!red.is_empty());
        assert!(red.iter().all(|&(px, py)| px >= x && py < baseline));
    }

    #[test]
    fn drawing_clips_on_tiny_images() {
        let mut image = RgbImage::new(4, 4);
        draw_count(&mut image, 123);
        draw_box(&mut image, -10.0, -10.0, 50.0, 50.0, "ID 3 0.91");
        draw_contours(&mut image, &[vec![Point::new(0, 0), Point::new(10, 10)]], CONTOUR_COLOR);
        assert_eq!(image.dimensions(), (4, 4));
    }
}
