use crate::boundary::{Domain, Walls};
use crate::config::{Mode, Settings};
use crate::forces::{pressure_forces, DensityField, PressureParams};
use crate::kernel::SmoothingKernel;
use crate::particles::Particles;
use crate::vec2::Vec2;
use rand::{rngs::StdRng, SeedableRng};

const KINEMATIC_SPEED_MIN: f32 = 2.0;
const KINEMATIC_SPEED_MAX: f32 = 8.0;
const DEBUG_EVERY_FRAMES: u64 = 300;

/// Semi-implicit Euler: gravity, then pressure acceleration, then position.
///
/// A particle with no positive density gets no pressure term.
pub(crate) fn integrate(
    particles: &mut Particles,
    forces: &[Vec2],
    densities: &DensityField,
    gravity: Vec2,
    dt: f32,
) {
    for (i, (p, v)) in particles
        .positions
        .iter_mut()
        .zip(particles.velocities.iter_mut())
        .enumerate()
    {
        *v += gravity;
        let d = densities.get(i);
        if d > 0.0 && d.is_finite() {
            *v += forces[i] * (dt / d);
        }
        *p += *v * dt;
    }
}

pub(crate) struct Simulation {
    mode: Mode,
    dt: f32,
    seed: u64,
    gravity: Vec2,
    kernel: SmoothingKernel,
    pressure: PressureParams,
    walls: Walls,
    initial: Particles,
    particles: Particles,
    densities: DensityField,
    forces: Vec<Vec2>,
    rng: StdRng,
    frame: u64,
    warned_non_finite: bool,
}

impl Simulation {
    pub(crate) fn new(settings: &Settings, width: usize, height: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut initial = Particles::grid(settings.particle_count, settings.initial_spacing);
        if settings.mode == Mode::Kinematic {
            initial.scatter_velocities(&mut rng, KINEMATIC_SPEED_MIN, KINEMATIC_SPEED_MAX);
        }

        let domain = Domain::from_size(width, height);
        let n = initial.len();

        log::info!(
            "{} particles, mode {}, domain half-extents {:.2} x {:.2}",
            n,
            settings.mode.label(),
            domain.half.x,
            domain.half.y
        );

        Self {
            mode: settings.mode,
            dt: settings.timestep,
            seed: settings.seed,
            gravity: Vec2::new(0.0, settings.gravity) * settings.timestep,
            kernel: SmoothingKernel::new(settings.smoothing_radius, settings.compact_kernel),
            pressure: PressureParams {
                mass: settings.particle_mass,
                target_density: settings.target_density,
                multiplier: settings.pressure_multiplier,
            },
            walls: Walls {
                domain,
                collision_damping: settings.collision_damping,
                velocity_tolerance: settings.velocity_tolerance,
            },
            particles: initial.clone(),
            initial,
            densities: DensityField::default(),
            forces: Vec::with_capacity(n),
            rng,
            frame: 0,
            warned_non_finite: false,
        }
    }

    /// Back to the start-up layout with a fresh RNG stream.
    pub(crate) fn reset(&mut self) {
        self.particles = self.initial.clone();
        self.densities = DensityField::default();
        self.rng = StdRng::seed_from_u64(self.seed);
        self.frame = 0;
        self.warned_non_finite = false;
    }

    /// One frame: density, then pressure and integration, then walls.
    pub(crate) fn step(&mut self) {
        match self.mode {
            Mode::Kinematic => {
                for (p, v) in self
                    .particles
                    .positions
                    .iter_mut()
                    .zip(self.particles.velocities.iter())
                {
                    *p += *v * self.dt;
                }
            }
            Mode::Ballistic => {
                for (p, v) in self
                    .particles
                    .positions
                    .iter_mut()
                    .zip(self.particles.velocities.iter_mut())
                {
                    *v += self.gravity;
                    *p += *v * self.dt;
                }
            }
            Mode::Fluid => {
                self.densities = DensityField::compute(
                    &self.particles.positions,
                    &self.kernel,
                    self.pressure.mass,
                );
                pressure_forces(
                    &self.particles.positions,
                    &self.densities,
                    &self.kernel,
                    self.pressure,
                    &mut self.rng,
                    &mut self.forces,
                );
                integrate(
                    &mut self.particles,
                    &self.forces,
                    &self.densities,
                    self.gravity,
                    self.dt,
                );
            }
        }

        self.walls.resolve_all(&mut self.particles);
        self.frame += 1;

        if !self.warned_non_finite && !self.particles.is_finite() {
            log::warn!("non-finite particle state at frame {}", self.frame);
            self.warned_non_finite = true;
        }
        if self.frame % DEBUG_EVERY_FRAMES == 0 {
            log::debug!("frame {} max density {:.3}", self.frame, self.max_density());
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn positions(&self) -> &[Vec2] {
        &self.particles.positions
    }

    /// Densities from the most recent fluid frame; empty before the first.
    #[cfg(test)]
    pub(crate) fn densities(&self) -> &[f32] {
        self.densities.values()
    }

    pub(crate) fn max_density(&self) -> f32 {
        self.densities.max()
    }

    pub(crate) fn len(&self) -> usize {
        self.particles.len()
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut Particles {
        &mut self.particles
    }

    #[cfg(test)]
    pub(crate) fn velocities(&self) -> &[Vec2] {
        &self.particles.velocities
    }

    #[cfg(test)]
    pub(crate) fn domain(&self) -> Domain {
        self.walls.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings(mode: Mode, n: usize) -> Settings {
        Settings {
            mode,
            particle_count: n,
            ..Settings::default()
        }
    }

    fn all_finite(sim: &Simulation) -> bool {
        sim.positions().iter().all(|p| p.is_finite())
            && sim.velocities().iter().all(|v| v.is_finite())
            && sim.densities().iter().all(|d| d.is_finite())
    }

    #[test]
    fn gravity_is_prescaled_by_timestep() {
        let s = Settings {
            gravity: 6.0,
            timestep: 0.5,
            ..settings(Mode::Ballistic, 1)
        };
        let sim = Simulation::new(&s, 80, 24);
        assert_eq!(sim.gravity, Vec2::new(0.0, 3.0));
    }

    #[test]
    fn single_particle_without_gravity_stays_put() {
        let s = Settings {
            gravity: 0.0,
            ..settings(Mode::Fluid, 1)
        };
        let mut sim = Simulation::new(&s, 80, 24);
        let start = sim.positions()[0];
        for _ in 0..10 {
            sim.step();
            assert_eq!(sim.densities(), &[0.0]);
            assert_eq!(sim.velocities()[0], Vec2::ZERO);
            assert_eq!(sim.positions()[0], start);
        }
    }

    #[test]
    fn single_particle_falls_under_gravity() {
        let mut sim = Simulation::new(&settings(Mode::Fluid, 1), 80, 24);
        sim.step();
        let g = 9.8 / 60.0;
        assert!((sim.velocities()[0].y - g).abs() < 1e-5);
        assert!(sim.positions()[0].y > 0.0);
        assert!(all_finite(&sim));
    }

    #[test]
    fn integrate_applies_pressure_scaled_by_density() {
        let mut ps = Particles::grid(1, 1.0);
        let k = SmoothingKernel::new(1.0, false);
        let pos = [Vec2::ZERO, Vec2::new(0.5, 0.0)];
        let field = DensityField::compute(&pos, &k, 1.0);
        let d = field.get(0);

        integrate(&mut ps, &[Vec2::new(2.0, 0.0)], &field, Vec2::new(0.0, 1.0), 0.1);
        let v = ps.velocities[0];
        assert!((v.x - 2.0 * 0.1 / d).abs() < 1e-4);
        assert_eq!(v.y, 1.0);
        assert!((ps.positions[0].x - v.x * 0.1).abs() < 1e-6);
        assert!((ps.positions[0].y - 0.1).abs() < 1e-6);
    }

    #[test]
    fn coincident_start_stays_finite() {
        let mut sim = Simulation::new(&settings(Mode::Fluid, 6), 80, 24);
        for p in sim.particles_mut().positions.iter_mut() {
            *p = Vec2::new(1.0, 1.0);
        }
        sim.step();
        assert!(all_finite(&sim));
    }

    #[test]
    fn kinematic_moves_in_straight_lines() {
        let mut sim = Simulation::new(&settings(Mode::Kinematic, 4), 400, 400);
        let p0 = sim.positions().to_vec();
        let v0 = sim.velocities().to_vec();
        sim.step();
        for i in 0..4 {
            let expected = p0[i] + v0[i] * (1.0 / 60.0);
            assert!((sim.positions()[i] - expected).length() < 1e-5);
            assert_eq!(sim.velocities()[i], v0[i]);
        }
        assert!(sim.densities().is_empty());
    }

    #[test]
    fn ballistic_particle_lands_and_bounces() {
        let s = Settings {
            gravity: 60.0,
            ..settings(Mode::Ballistic, 1)
        };
        let mut sim = Simulation::new(&s, 40, 4);
        let mut bounced = false;
        for _ in 0..120 {
            let before = sim.velocities()[0].y;
            sim.step();
            assert!(sim.positions()[0].y <= 2.0);
            if before > 0.0 && sim.velocities()[0].y < 0.0 {
                bounced = true;
            }
        }
        assert!(bounced);
        assert_eq!(sim.positions()[0].x, 0.0);
    }

    #[test]
    fn reset_restores_start() {
        let mut sim = Simulation::new(&settings(Mode::Fluid, 16), 80, 24);
        let start = sim.positions().to_vec();
        for _ in 0..5 {
            sim.step();
        }
        assert_eq!(sim.frame(), 5);
        sim.reset();
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.positions(), &start[..]);
    }

    #[test]
    fn same_seed_same_run() {
        let s = settings(Mode::Fluid, 25);
        let mut a = Simulation::new(&s, 80, 24);
        let mut b = Simulation::new(&s, 80, 24);
        for _ in 0..20 {
            a.step();
            b.step();
        }
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn fluid_run_is_contained() {
        let mut sim = Simulation::new(&settings(Mode::Fluid, 100), 60, 20);
        let domain = sim.domain();
        for _ in 0..60 {
            sim.step();
            assert!(sim.positions().iter().all(|&p| domain.contains(p)));
        }
        assert_eq!(sim.len(), 100);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn every_mode_stays_inside_the_walls(
            mode in prop_oneof![Just(Mode::Kinematic), Just(Mode::Ballistic), Just(Mode::Fluid)],
            n in 0usize..48,
            width in 8usize..120,
            height in 4usize..40,
            spacing in 0.2f32..3.0,
            gravity in -20.0f32..20.0,
            seed in any::<u64>(),
        ) {
            let s = Settings {
                mode,
                particle_count: n,
                initial_spacing: spacing,
                gravity,
                seed,
                ..Settings::default()
            };
            let mut sim = Simulation::new(&s, width, height);
            let domain = sim.domain();
            for _ in 0..8 {
                sim.step();
                for &p in sim.positions() {
                    prop_assert!(!p.is_finite() || domain.contains(p));
                }
            }
        }

        #[test]
        fn densities_are_never_negative(
            n in 1usize..40,
            radius in 0.3f32..4.0,
            compact in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let s = Settings {
                particle_count: n,
                smoothing_radius: radius,
                compact_kernel: compact,
                seed,
                ..Settings::default()
            };
            let mut sim = Simulation::new(&s, 80, 24);
            for _ in 0..5 {
                sim.step();
                prop_assert_eq!(sim.densities().len(), n);
                for &d in sim.densities() {
                    prop_assert!(d >= 0.0);
                }
            }
        }

        #[test]
        fn stacked_particles_step_to_finite_state(
            n in 2usize..12,
            x in -5.0f32..5.0,
            y in -5.0f32..5.0,
            seed in any::<u64>(),
        ) {
            let s = Settings { particle_count: n, seed, ..Settings::default() };
            let mut sim = Simulation::new(&s, 80, 24);
            for p in sim.particles_mut().positions.iter_mut() {
                *p = Vec2::new(x, y);
            }
            sim.step();
            prop_assert!(all_finite(&sim));
        }
    }
}
