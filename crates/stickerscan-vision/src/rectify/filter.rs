// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel filters for marker detection: Gaussian smoothing and Gaussian-weighted
// adaptive thresholding.

use image::GrayImage;
use imageproc::filter::separable_filter_equal;

/// Build a normalised 1-D Gaussian kernel of odd length `size`.
///
/// The standard deviation is derived from the size the usual way,
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`, so a 5-tap kernel has sigma 1.1 and an
/// 11-tap kernel sigma 2.0.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) as i32;
    let sigma = 0.3 * ((size - 1) as f64 * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Smooth with the outer product of `kernel` with itself. Edges are padded
/// by continuity.
pub fn gaussian_blur(src: &GrayImage, kernel: &[f32]) -> GrayImage {
    if src.width() == 0 || src.height() == 0 || kernel.is_empty() {
        return src.clone();
    }
    separable_filter_equal(src, kernel)
}

/// Binarise against a Gaussian-weighted local mean.
///
/// A pixel becomes foreground (255) when it is at least `offset` darker than
/// the weighted mean of its neighbourhood, background (0) otherwise. Uniform
/// regions, however bright or dark, come out as background, so only the
/// contrast edges of the marker survive regardless of uneven lighting.
pub fn adaptive_threshold(src: &GrayImage, kernel: &[f32], offset: f64) -> GrayImage {
    let mean = gaussian_blur(src, kernel);
    let mut out = GrayImage::new(src.width(), src.height());
    for ((dst, value), local) in out.pixels_mut().zip(src.pixels()).zip(mean.pixels()) {
        let foreground = value.0[0] as f64 <= local.0[0] as f64 - offset;
        dst.0[0] = if foreground { 255 } else { 0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        for size in [3u32, 5, 11] {
            let k = gaussian_kernel(size);
            assert_eq!(k.len(), size as usize);
            let sum: f32 = k.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "size {size} sums to {sum}");
            for i in 0..k.len() / 2 {
                assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
            }
            assert!(k[k.len() / 2] > k[0]);
        }
    }

    #[test]
    fn blur_keeps_uniform_image_level() {
        let img = GrayImage::from_pixel(20, 15, Luma([137u8]));
        let out = gaussian_blur(&img, &gaussian_kernel(5));
        assert_eq!(out.dimensions(), (20, 15));
        assert!(out.pixels().all(|p| p.0[0].abs_diff(137) <= 2));
    }

    #[test]
    fn blur_softens_a_hard_edge() {
        let img = GrayImage::from_fn(20, 4, |x, _| if x < 10 { Luma([0u8]) } else { Luma([200u8]) });
        let out = gaussian_blur(&img, &gaussian_kernel(5));
        let left = out.get_pixel(9, 1).0[0];
        let right = out.get_pixel(10, 1).0[0];
        assert!(left > 0 && left < 100, "left of edge is {left}");
        assert!(right > 100 && right < 200, "right of edge is {right}");
        assert!(out.get_pixel(0, 1).0[0] <= 1);
    }

    #[test]
    fn empty_image_passes_through() {
        let img = GrayImage::new(0, 0);
        assert_eq!(gaussian_blur(&img, &gaussian_kernel(5)).dimensions(), (0, 0));
    }

    #[test]
    fn uniform_regions_are_background() {
        let img = GrayImage::from_pixel(30, 30, Luma([20u8]));
        let out = adaptive_threshold(&img, &gaussian_kernel(11), 2.0);
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn dark_side_of_an_edge_is_foreground() {
        // Left half dark, right half bright.
        let img = GrayImage::from_fn(40, 10, |x, _| if x < 20 { Luma([30u8]) } else { Luma([220u8]) });
        let out = adaptive_threshold(&img, &gaussian_kernel(11), 2.0);

        assert_eq!(out.get_pixel(19, 5).0[0], 255, "dark pixel next to edge");
        assert_eq!(out.get_pixel(20, 5).0[0], 0, "bright pixel next to edge");
        assert_eq!(out.get_pixel(2, 5).0[0], 0, "dark pixel far from edge");
        assert_eq!(out.get_pixel(38, 5).0[0], 0, "bright pixel far from edge");
    }
}
