use std::f32::consts::PI;

/// Cubic falloff kernel: W(d, r) = |r - d|^3 / V with V = pi * r^4 / 2.
///
/// The unbounded shape keeps contributing past `r`. `compact` clamps both
/// the value and the slope to zero for `d >= r`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SmoothingKernel {
    radius: f32,
    inv_volume: f32,
    compact: bool,
}

impl SmoothingKernel {
    pub(crate) fn new(radius: f32, compact: bool) -> Self {
        let volume = PI * radius.powi(4) / 2.0;
        Self {
            radius,
            inv_volume: 1.0 / volume,
            compact,
        }
    }

    #[inline]
    pub(crate) fn value(&self, dist: f32) -> f32 {
        if self.compact && dist >= self.radius {
            return 0.0;
        }
        let q = (self.radius - dist).abs();
        q * q * q * self.inv_volume
    }

    #[inline]
    pub(crate) fn derivative(&self, dist: f32) -> f32 {
        if self.compact && dist >= self.radius {
            return 0.0;
        }
        let q = (self.radius - dist).abs();
        -3.0 * q * q * self.inv_volume
    }
}
