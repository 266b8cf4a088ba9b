use crate::kernel::SmoothingKernel;
use crate::vec2::Vec2;
use rand::Rng;

/// Stand-in distance for two particles sharing a position.
pub(crate) const COINCIDENT_EPSILON: f32 = 0.001;

/// Per-particle density for one frame.
///
/// Built in one pass over every pair and never mutated afterwards, so the
/// pressure pass always reads a finished field.
#[derive(Clone, Debug, Default)]
pub(crate) struct DensityField {
    values: Vec<f32>,
}

impl DensityField {
    /// Exhaustive all-pairs estimate, self-pairs excluded.
    pub(crate) fn compute(positions: &[Vec2], kernel: &SmoothingKernel, mass: f32) -> Self {
        let values = positions
            .iter()
            .enumerate()
            .map(|(i, &pi)| {
                positions
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &pj)| mass * kernel.value((pi - pj).length()))
                    .sum::<f32>()
            })
            .collect();
        Self { values }
    }

    pub(crate) fn get(&self, i: usize) -> f32 {
        self.values[i]
    }

    pub(crate) fn values(&self) -> &[f32] {
        &self.values
    }

    pub(crate) fn max(&self) -> f32 {
        self.values
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0, f32::max)
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PressureParams {
    pub(crate) mass: f32,
    pub(crate) target_density: f32,
    pub(crate) multiplier: f32,
}

/// Summed pressure gradient acting on particle `i`.
///
/// Neighbours with a non-positive density contribute nothing.
pub(crate) fn pressure_force<R: Rng + ?Sized>(
    i: usize,
    positions: &[Vec2],
    densities: &DensityField,
    kernel: &SmoothingKernel,
    params: PressureParams,
    rng: &mut R,
) -> Vec2 {
    let pi = positions[i];
    let pressure = (densities.get(i) - params.target_density) * params.multiplier;

    let mut total = Vec2::ZERO;
    for (j, &pj) in positions.iter().enumerate() {
        if j == i {
            continue;
        }
        let dj = densities.get(j);
        if !(dj > 0.0) || !dj.is_finite() {
            continue;
        }

        let mut diff = pj - pi;
        let mut dist = diff.length();
        if dist == 0.0 {
            diff = Vec2::random_unit(rng);
            dist = COINCIDENT_EPSILON;
        }

        let k = params.mass * pressure / (dist * dj) * kernel.derivative(dist);
        total += diff * k;
    }
    total
}

/// Fills `out` with the pressure force of every particle.
pub(crate) fn pressure_forces<R: Rng + ?Sized>(
    positions: &[Vec2],
    densities: &DensityField,
    kernel: &SmoothingKernel,
    params: PressureParams,
    rng: &mut R,
    out: &mut Vec<Vec2>,
) {
    out.clear();
    out.extend(
        (0..positions.len()).map(|i| pressure_force(i, positions, densities, kernel, params, rng)),
    );
}
