//! Pixel-to-map affine transform, read from and written to GeoTIFF tags

use serde::{Deserialize, Serialize};

/// Six-coefficient affine transform of a raster grid.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up grids
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Unrotated transform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Build from ModelPixelScaleTag + ModelTiepointTag values
    pub fn from_scale_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<Self> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return None;
        }
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        Some(Self::new(origin_x, origin_y, scale[0], -scale[1]))
    }

    /// Build from a row-major 4x4 ModelTransformationTag matrix
    pub fn from_model_transformation(matrix: &[f64]) -> Option<Self> {
        if matrix.len() < 16 {
            return None;
        }
        Some(Self {
            origin_x: matrix[3],
            origin_y: matrix[7],
            pixel_width: matrix[0],
            pixel_height: matrix[5],
            row_rotation: matrix[1],
            col_rotation: matrix[4],
        })
    }

    /// Whether the transform can be expressed as scale + tiepoint
    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0 && self.pixel_height < 0.0
    }

    /// ModelPixelScaleTag payload (only meaningful when north-up)
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width, -self.pixel_height, 0.0]
    }

    /// ModelTiepointTag payload tying pixel (0, 0) to the origin
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }

    /// ModelTransformationTag payload
    pub fn model_transformation(&self) -> [f64; 16] {
        [
            self.pixel_width, self.row_rotation, 0.0, self.origin_x,
            self.col_rotation, self.pixel_height, 0.0, self.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    /// Map coordinates of the pixel corner at (`col`, `row`)
    fn corner(&self, col: usize, row: usize) -> (f64, f64) {
        let (c, r) = (col as f64, row as f64);
        (
            self.origin_x + c * self.pixel_width + r * self.row_rotation,
            self.origin_y + c * self.col_rotation + r * self.pixel_height,
        )
    }

    /// Extent covered by a `width` x `height` grid
    pub fn bounds(&self, width: usize, height: usize) -> Bounds {
        let corners = [
            self.corner(0, 0),
            self.corner(width, 0),
            self.corner(0, height),
            self.corner(width, height),
        ];
        corners.iter().fold(
            Bounds {
                north: f64::NEG_INFINITY,
                south: f64::INFINITY,
                west: f64::INFINITY,
                east: f64::NEG_INFINITY,
            },
            |b, &(x, y)| Bounds {
                north: b.north.max(y),
                south: b.south.min(y),
                west: b.west.min(x),
                east: b.east.max(x),
            },
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Geographic extent in the native units of the raster CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_tiepoint_roundtrip() {
        let gt = GeoTransform::new(500_000.0, 9_200_000.0, 30.0, -30.0);
        let back = GeoTransform::from_scale_tiepoint(&gt.pixel_scale(), &gt.tiepoint()).unwrap();
        assert_eq!(back, gt);
    }

    #[test]
    fn test_tiepoint_offset_pixel() {
        // Tiepoint anchored at pixel (2, 3) instead of the corner
        let gt = GeoTransform::from_scale_tiepoint(
            &[10.0, 10.0, 0.0],
            &[2.0, 3.0, 0.0, 120.0, 170.0, 0.0],
        )
        .unwrap();
        assert_relative_eq!(gt.origin_x, 100.0);
        assert_relative_eq!(gt.origin_y, 200.0);
    }

    #[test]
    fn test_model_transformation_roundtrip() {
        let mut gt = GeoTransform::new(10.0, 50.0, 0.5, -0.5);
        gt.row_rotation = 0.1;
        assert!(!gt.is_north_up());
        let back = GeoTransform::from_model_transformation(&gt.model_transformation()).unwrap();
        assert_eq!(back, gt);
    }

    #[test]
    fn test_bounds_of_utm_scene() {
        let gt = GeoTransform::new(300_000.0, 6_000_000.0, 10.0, -10.0);
        let b = gt.bounds(16, 12);
        assert_relative_eq!(b.west, 300_000.0);
        assert_relative_eq!(b.east, 300_160.0);
        assert_relative_eq!(b.north, 6_000_000.0);
        assert_relative_eq!(b.south, 5_999_880.0);
    }
}
