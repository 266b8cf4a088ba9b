use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Mode {
    /// Constant velocity, no forces
    Kinematic,
    /// Gravity and walls only
    Ballistic,
    /// Density-driven pressure, gravity and walls
    Fluid,
}

impl Mode {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Mode::Kinematic => "kinematic",
            Mode::Ballistic => "ballistic",
            Mode::Fluid => "fluid",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) mode: Mode,
    pub(crate) particle_count: usize,
    /// Render columns; the domain is `width / 4` wide each side of the origin.
    pub(crate) width: Option<usize>,
    /// Render rows; the domain is `height / 2` tall each side of the origin.
    pub(crate) height: Option<usize>,
    pub(crate) timestep: f32,
    pub(crate) smoothing_radius: f32,
    pub(crate) particle_mass: f32,
    pub(crate) collision_damping: f32,
    pub(crate) velocity_tolerance: f32,
    pub(crate) pressure_multiplier: f32,
    pub(crate) target_density: f32,
    pub(crate) initial_spacing: f32,
    pub(crate) gravity: f32,
    pub(crate) compact_kernel: bool,
    pub(crate) seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Fluid,
            particle_count: 400,
            width: None,
            height: None,
            timestep: 1.0 / 60.0,
            smoothing_radius: 1.2,
            particle_mass: 1.0,
            collision_damping: 0.6,
            velocity_tolerance: 0.05,
            pressure_multiplier: 40.0,
            target_density: 0.0,
            initial_spacing: 1.0,
            gravity: 9.8,
            compact_kernel: false,
            seed: 0xC0FFEE_u64,
        }
    }
}

impl Settings {
    pub(crate) fn validate(&self) -> Result<()> {
        let positive = [
            ("timestep", self.timestep),
            ("smoothing_radius", self.smoothing_radius),
            ("particle_mass", self.particle_mass),
            ("initial_spacing", self.initial_spacing),
        ];
        for (name, v) in positive {
            if !(v > 0.0) || !v.is_finite() {
                bail!("{name} must be a positive number, got {v}");
            }
        }
        let finite = [
            ("collision_damping", self.collision_damping),
            ("velocity_tolerance", self.velocity_tolerance),
            ("pressure_multiplier", self.pressure_multiplier),
            ("target_density", self.target_density),
            ("gravity", self.gravity),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                bail!("{name} must be finite, got {v}");
            }
        }
        if self.width == Some(0) {
            bail!("width must be at least 1");
        }
        if self.height == Some(0) {
            bail!("height must be at least 1");
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "inkfluid")]
#[command(about = "Particle fluid rendered as an ASCII density field", long_about = None)]
pub(crate) struct Args {
    /// JSON settings file; flags below override its values
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Simulation variant
    #[arg(long, value_enum)]
    pub(crate) mode: Option<Mode>,

    /// Number of particles
    #[arg(long, short = 'n')]
    pub(crate) particles: Option<usize>,

    /// Render columns (defaults to the terminal width)
    #[arg(long)]
    pub(crate) width: Option<usize>,

    /// Render rows (defaults to the terminal height minus the status line)
    #[arg(long)]
    pub(crate) height: Option<usize>,

    /// Fixed simulation step in seconds
    #[arg(long)]
    pub(crate) timestep: Option<f32>,

    #[arg(long)]
    pub(crate) smoothing_radius: Option<f32>,

    #[arg(long)]
    pub(crate) mass: Option<f32>,

    /// Wall bounce keeps `damping - 1` of the normal velocity
    #[arg(long)]
    pub(crate) damping: Option<f32>,

    /// Speed below which a particle touching a wall stops
    #[arg(long)]
    pub(crate) velocity_tolerance: Option<f32>,

    #[arg(long)]
    pub(crate) pressure_multiplier: Option<f32>,

    #[arg(long)]
    pub(crate) target_density: Option<f32>,

    #[arg(long)]
    pub(crate) spacing: Option<f32>,

    /// Downward acceleration (screen y grows downward)
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) gravity: Option<f32>,

    /// Zero the kernel beyond the smoothing radius
    #[arg(long, default_value_t = false)]
    pub(crate) compact_kernel: bool,

    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Frame rate cap; 0 runs unpaced
    #[arg(long, default_value_t = 30)]
    pub(crate) fps: u64,

    /// Run without a terminal UI and print the last frame
    #[arg(long, default_value_t = false)]
    pub(crate) headless: bool,

    /// Stop after this many frames
    #[arg(long)]
    pub(crate) frames: Option<u64>,
}

pub(crate) fn load_settings(path: &Path) -> Result<Settings> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("could not read settings file {}", path.display()))?;
    let settings = serde_json::from_str::<Settings>(&s)
        .with_context(|| format!("could not parse settings file {}", path.display()))?;
    Ok(settings)
}

impl Args {
    /// Settings from `--config` (or defaults) with flag overrides applied.
    pub(crate) fn resolve(&self) -> Result<Settings> {
        let mut s = match &self.config {
            Some(path) => load_settings(path)?,
            None => Settings::default(),
        };
        self.apply(&mut s);
        s.validate()?;
        Ok(s)
    }

    fn apply(&self, s: &mut Settings) {
        if let Some(v) = self.mode {
            s.mode = v;
        }
        if let Some(v) = self.particles {
            s.particle_count = v;
        }
        if self.width.is_some() {
            s.width = self.width;
        }
        if self.height.is_some() {
            s.height = self.height;
        }
        if let Some(v) = self.timestep {
            s.timestep = v;
        }
        if let Some(v) = self.smoothing_radius {
            s.smoothing_radius = v;
        }
        if let Some(v) = self.mass {
            s.particle_mass = v;
        }
        if let Some(v) = self.damping {
            s.collision_damping = v;
        }
        if let Some(v) = self.velocity_tolerance {
            s.velocity_tolerance = v;
        }
        if let Some(v) = self.pressure_multiplier {
            s.pressure_multiplier = v;
        }
        if let Some(v) = self.target_density {
            s.target_density = v;
        }
        if let Some(v) = self.spacing {
            s.initial_spacing = v;
        }
        if let Some(v) = self.gravity {
            s.gravity = v;
        }
        if self.compact_kernel {
            s.compact_kernel = true;
        }
        if let Some(v) = self.seed {
            s.seed = v;
        }
    }
}
