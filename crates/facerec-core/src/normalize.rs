//! Face crop normalization to the fixed 200×200 grayscale geometry.
//!
//! Resizing is separable. Along an axis that shrinks, each output pixel is the
//! coverage-weighted mean of the source pixels under it (area averaging);
//! along an axis that grows, bilinear interpolation is used. Aspect ratio is
//! not preserved.

use crate::types::{FaceRect, NormalizedFace, FACE_SIZE};
use image::GrayImage;

/// Source taps for one output index: (source index, weight).
type Taps = Vec<(usize, f32)>;

/// Crop `rect` out of a grayscale frame and resize it to 200×200.
///
/// Returns `None` if the rectangle does not fit inside the frame or is empty.
pub fn crop_and_normalize(
    frame: &[u8],
    width: u32,
    height: u32,
    rect: &FaceRect,
) -> Option<NormalizedFace> {
    let (w, h) = (width as usize, height as usize);
    let (rx, ry) = (rect.x as usize, rect.y as usize);
    let (rw, rh) = (rect.width as usize, rect.height as usize);

    if rw == 0 || rh == 0 || rx + rw > w || ry + rh > h || frame.len() < w * h {
        return None;
    }

    let mut roi = Vec::with_capacity(rw * rh);
    for y in ry..ry + rh {
        roi.extend_from_slice(&frame[y * w + rx..y * w + rx + rw]);
    }

    NormalizedFace::from_pixels(resize_gray(&roi, rw, rh, FACE_SIZE, FACE_SIZE))
}

/// Resize a decoded grayscale image to 200×200.
pub fn normalize_image(img: &GrayImage) -> Option<NormalizedFace> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return None;
    }
    NormalizedFace::from_pixels(resize_gray(img.as_raw(), w, h, FACE_SIZE, FACE_SIZE))
}

/// Resize a `width`×`height` grayscale buffer to `dst_w`×`dst_h`.
pub fn resize_gray(src: &[u8], width: usize, height: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let x_taps = axis_taps(width, dst_w);
    let y_taps = axis_taps(height, dst_h);

    // Horizontal pass: height rows of dst_w.
    let mut horizontal = vec![0f32; dst_w * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for (x, taps) in x_taps.iter().enumerate() {
            horizontal[y * dst_w + x] = taps.iter().map(|&(i, wt)| row[i] as f32 * wt).sum();
        }
    }

    // Vertical pass.
    let mut out = vec![0u8; dst_w * dst_h];
    for (y, taps) in y_taps.iter().enumerate() {
        for x in 0..dst_w {
            let val: f32 = taps
                .iter()
                .map(|&(i, wt)| horizontal[i * dst_w + x] * wt)
                .sum();
            out[y * dst_w + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// Compute per-output source taps for resampling `src_len` samples to `dst_len`.
fn axis_taps(src_len: usize, dst_len: usize) -> Vec<Taps> {
    if src_len == dst_len {
        return (0..dst_len).map(|i| vec![(i, 1.0)]).collect();
    }

    let scale = src_len as f32 / dst_len as f32;

    if scale > 1.0 {
        // Area averaging: output i covers [i*scale, (i+1)*scale) in source space.
        (0..dst_len)
            .map(|i| {
                let start = i as f32 * scale;
                let end = ((i + 1) as f32 * scale).min(src_len as f32);
                let first = start.floor() as usize;
                let last = (end.ceil() as usize).min(src_len);
                (first..last)
                    .filter_map(|j| {
                        let cover = end.min(j as f32 + 1.0) - start.max(j as f32);
                        (cover > 0.0).then_some((j, cover / scale))
                    })
                    .collect()
            })
            .collect()
    } else {
        // Bilinear with half-pixel centers.
        (0..dst_len)
            .map(|i| {
                let src = (i as f32 + 0.5) * scale - 0.5;
                let i0 = (src.floor() as i64).clamp(0, src_len as i64 - 1) as usize;
                let i1 = (i0 + 1).min(src_len - 1);
                let f = (src - src.floor()).clamp(0.0, 1.0);
                if src < 0.0 || i0 == i1 {
                    vec![(i0, 1.0)]
                } else {
                    vec![(i0, 1.0 - f), (i1, f)]
                }
            })
            .collect()
    }
}
