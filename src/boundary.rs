use crate::particles::Particles;
use crate::vec2::Vec2;

/// Axis-aligned box centred on the origin.
///
/// The x half-extent is `width / 4`: terminal cells are roughly twice as
/// tall as they are wide, and the renderer doubles x to compensate.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Domain {
    pub(crate) half: Vec2,
}

impl Domain {
    pub(crate) fn from_size(width: usize, height: usize) -> Self {
        Self {
            half: Vec2::new(width as f32 / 4.0, height as f32 / 2.0),
        }
    }

    pub(crate) fn contains(&self, p: Vec2) -> bool {
        p.x.abs() <= self.half.x && p.y.abs() <= self.half.y
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Walls {
    pub(crate) domain: Domain,
    pub(crate) collision_damping: f32,
    pub(crate) velocity_tolerance: f32,
}

fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl Walls {
    /// Clamp to the wall and bounce with `collision_damping - 1`.
    /// A slow particle touching a wall is brought to a full stop first.
    pub(crate) fn resolve(&self, pos: &mut Vec2, vel: &mut Vec2) {
        let half = self.domain.half;
        let bounce = self.collision_damping - 1.0;
        let tol2 = self.velocity_tolerance * self.velocity_tolerance;

        if pos.x.abs() >= half.x {
            if vel.length_squared() <= tol2 {
                *vel = Vec2::ZERO;
            }
            pos.x = half.x * sign(pos.x);
            vel.x *= bounce;
        }
        if pos.y.abs() >= half.y {
            if vel.length_squared() <= tol2 {
                *vel = Vec2::ZERO;
            }
            pos.y = half.y * sign(pos.y);
            vel.y *= bounce;
        }
    }

    pub(crate) fn resolve_all(&self, particles: &mut Particles) {
        for (p, v) in particles
            .positions
            .iter_mut()
            .zip(particles.velocities.iter_mut())
        {
            self.resolve(p, v);
            debug_assert!(!p.is_finite() || self.domain.contains(*p));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walls() -> Walls {
        Walls {
            domain: Domain::from_size(80, 24),
            collision_damping: 0.6,
            velocity_tolerance: 0.05,
        }
    }

    #[test]
    fn half_extents_follow_cell_aspect() {
        let d = Domain::from_size(80, 24);
        assert_eq!(d.half, Vec2::new(20.0, 12.0));
    }

    #[test]
    fn damped_reflection_off_right_wall() {
        let w = walls();
        let mut p = Vec2::new(20.1, 0.0);
        let mut v = Vec2::new(5.0, 0.0);
        w.resolve(&mut p, &mut v);
        assert_eq!(p.x, 20.0);
        assert!((v.x - 5.0 * (0.6 - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn left_and_top_walls_keep_sign() {
        let w = walls();
        let mut p = Vec2::new(-25.0, -13.0);
        let mut v = Vec2::new(-3.0, -2.0);
        w.resolve(&mut p, &mut v);
        assert_eq!(p, Vec2::new(-20.0, -12.0));
        assert!((v.x - 1.2).abs() < 1e-6);
        assert!((v.y - 0.8).abs() < 1e-6);
    }

    #[test]
    fn slow_particle_at_wall_is_stopped() {
        let w = walls();
        let mut p = Vec2::new(0.0, 12.5);
        let mut v = Vec2::new(0.02, 0.03);
        w.resolve(&mut p, &mut v);
        assert_eq!(p.y, 12.0);
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn interior_particle_untouched() {
        let w = walls();
        let mut p = Vec2::new(3.0, -4.0);
        let mut v = Vec2::new(1.0, 1.0);
        w.resolve(&mut p, &mut v);
        assert_eq!(p, Vec2::new(3.0, -4.0));
        assert_eq!(v, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn zero_extent_axis_maps_origin_to_origin() {
        let w = Walls {
            domain: Domain::from_size(0, 10),
            collision_damping: 0.5,
            velocity_tolerance: 0.0,
        };
        let mut p = Vec2::new(0.0, 1.0);
        let mut v = Vec2::new(2.0, 0.0);
        w.resolve(&mut p, &mut v);
        assert_eq!(p.x, 0.0);
        assert_eq!(v.x, -1.0);
    }

    #[test]
    fn resolve_all_contains_every_particle() {
        let w = walls();
        let mut ps = Particles::grid(16, 10.0);
        w.resolve_all(&mut ps);
        assert!(ps.positions.iter().all(|&p| w.domain.contains(p)));
    }
}
