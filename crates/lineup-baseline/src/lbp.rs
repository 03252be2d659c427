//! Local binary pattern histograms.
//!
//! Each interior pixel gets an 8-bit code, one bit per neighbour that is at
//! least as bright as the centre. The image is split into a grid of cells and
//! every cell contributes a normalized 256-bin histogram of its codes.

use image::GrayImage;

pub const GRID_X: usize = 8;
pub const GRID_Y: usize = 8;
const BINS: usize = 256;

/// Neighbour offsets, clockwise from the top-left.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

/// Length of the feature vector produced by [`histogram`].
pub const FEATURE_LEN: usize = GRID_X * GRID_Y * BINS;

fn code_at(image: &GrayImage, x: u32, y: u32) -> u8 {
    let center = image.get_pixel(x, y).0[0];
    let mut code = 0u8;
    for (bit, (dx, dy)) in NEIGHBOURS.iter().enumerate() {
        let nx = (x as i32 + dx) as u32;
        let ny = (y as i32 + dy) as u32;
        if image.get_pixel(nx, ny).0[0] >= center {
            code |= 1 << bit;
        }
    }
    code
}

/// Spatial LBP histogram of `image`. Images smaller than 3x3 have no interior
/// pixels and yield an all-zero vector.
pub fn histogram(image: &GrayImage) -> Vec<f32> {
    let mut features = vec![0.0f32; FEATURE_LEN];
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return features;
    }

    let inner_w = (width - 2) as usize;
    let inner_h = (height - 2) as usize;
    let mut counts = [0u32; GRID_X * GRID_Y];

    for y in 1..height - 1 {
        let cell_y = (y as usize - 1) * GRID_Y / inner_h;
        for x in 1..width - 1 {
            let cell_x = (x as usize - 1) * GRID_X / inner_w;
            let cell = cell_y * GRID_X + cell_x;
            let code = code_at(image, x, y) as usize;
            features[cell * BINS + code] += 1.0;
            counts[cell] += 1;
        }
    }

    for (cell, &count) in counts.iter().enumerate() {
        if count > 0 {
            let bins = &mut features[cell * BINS..(cell + 1) * BINS];
            for v in bins.iter_mut() {
                *v /= count as f32;
            }
        }
    }
    features
}

/// Chi-square distance between two histograms.
pub fn chi_square(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let sum = x + y;
            if sum > 0.0 {
                (x - y).powi(2) / sum
            } else {
                0.0
            }
        })
        .sum()
}
