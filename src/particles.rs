use crate::vec2::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// Particle state, index-aligned. The count is fixed at construction.
#[derive(Clone, Debug)]
pub(crate) struct Particles {
    pub(crate) positions: Vec<Vec2>,
    pub(crate) velocities: Vec<Vec2>,
}

/// Smallest `s` with `s * s >= n`.
pub(crate) fn grid_side(n: usize) -> usize {
    let mut s = (n as f64).sqrt() as usize;
    while s * s < n {
        s += 1;
    }
    s
}

impl Particles {
    /// Square grid of side `ceil(sqrt(n))`, offset by `(spacing - side) / 2`
    /// on both axes, all at rest.
    pub(crate) fn grid(n: usize, spacing: f32) -> Self {
        let side = grid_side(n);
        let offset = (spacing - side as f32) / 2.0;

        let positions = (0..n)
            .map(|i| {
                let gx = (i % side) as f32;
                let gy = (i / side) as f32;
                Vec2::new(gx * spacing + offset, gy * spacing + offset)
            })
            .collect();

        Self {
            positions,
            velocities: vec![Vec2::ZERO; n],
        }
    }

    /// Gives every particle a random heading with speed in `min..max`.
    pub(crate) fn scatter_velocities<R: Rng + ?Sized>(&mut self, rng: &mut R, min: f32, max: f32) {
        for v in &mut self.velocities {
            let a = rng.gen_range(0.0..TAU);
            let sp = if max > min { rng.gen_range(min..max) } else { min };
            *v = Vec2::new(a.cos() * sp, a.sin() * sp);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.positions.iter().all(|p| p.is_finite()) && self.velocities.iter().all(|v| v.is_finite())
    }
}
