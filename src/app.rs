use crate::config::{Args, Settings};
use crate::render::{InkGrid, Screen};
use crate::sim::Simulation;
use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal,
};
use std::io::{self, Write};
use std::time::{Duration, Instant};

const HEADLESS_W: usize = 80;
const HEADLESS_H: usize = 24;
const HEADLESS_FRAMES: u64 = 300;
const FPS_MIN: u64 = 5;
const FPS_MAX: u64 = 240;

pub(crate) fn run() -> Result<()> {
    let args = Args::parse();
    let settings = args.resolve()?;
    log::info!("settings: {:?}", settings);

    if args.headless {
        let frames = args.frames.unwrap_or(HEADLESS_FRAMES);
        let mut out = io::stdout().lock();
        return run_headless(&settings, frames, &mut out);
    }
    run_interactive(&settings, args.fps, args.frames)
}

/// Steps `frames` times off-screen and writes the last ink grid as text.
pub(crate) fn run_headless<W: Write>(settings: &Settings, frames: u64, out: &mut W) -> Result<()> {
    let w = settings.width.unwrap_or(HEADLESS_W);
    let h = settings.height.unwrap_or(HEADLESS_H);
    let mut sim = Simulation::new(settings, w, h);
    for _ in 0..frames {
        sim.step();
    }

    let mut grid = InkGrid::new(w, h);
    grid.plot(sim.positions());
    out.write_all(grid.to_text().as_bytes())?;
    out.flush()?;
    log::info!("headless run finished after {} frames", sim.frame());
    Ok(())
}

struct FpsMeter {
    frames: u64,
    last: Instant,
    fps: f32,
}

impl FpsMeter {
    fn new() -> Self {
        Self {
            frames: 0,
            last: Instant::now(),
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        if elapsed >= Duration::from_millis(500) {
            self.fps = (self.frames as f32) / elapsed.as_secs_f32();
            self.frames = 0;
            self.last = now;
        }
    }
}

fn status_line(sim: &Simulation, fps: f32, target_fps: u64, paused: bool) -> String {
    let pace = if target_fps == 0 {
        "unpaced".to_string()
    } else {
        format!("cap {target_fps}")
    };
    format!(
        "{} [{}]  frame {}  {:.1} fps ({})  n {}  max density {:.2}  | q quit  space pause  s step  r reset  +/- pace",
        sim.mode().label(),
        if paused { "paused" } else { "running" },
        sim.frame(),
        fps,
        pace,
        sim.len(),
        sim.max_density(),
    )
}

fn run_interactive(settings: &Settings, fps: u64, max_frames: Option<u64>) -> Result<()> {
    let (tw, th) = terminal::size()?;
    let w = settings.width.unwrap_or(tw as usize).max(1);
    // leave the bottom row for the status line
    let h = settings
        .height
        .unwrap_or((th as usize).saturating_sub(1))
        .max(1);

    let mut sim = Simulation::new(settings, w, h);
    let mut grid = InkGrid::new(w, h);
    let mut screen = Screen::begin()?;

    let result = drive(&mut sim, &mut grid, &mut screen, fps, max_frames);
    screen.end()?;
    result
}

fn drive(
    sim: &mut Simulation,
    grid: &mut InkGrid,
    screen: &mut Screen,
    mut target_fps: u64,
    max_frames: Option<u64>,
) -> Result<()> {
    let mut paused = false;
    let mut meter = FpsMeter::new();

    'outer: loop {
        let frame_start = Instant::now();
        let mut single_step = false;

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind == KeyEventKind::Press => match k.code {
                    KeyCode::Char('q') | KeyCode::Esc => break 'outer,
                    KeyCode::Char(' ') => paused = !paused,
                    KeyCode::Char('s') => single_step = true,
                    KeyCode::Char('r') => {
                        sim.reset();
                        screen.invalidate();
                    }
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        target_fps = if target_fps == 0 {
                            0
                        } else {
                            (target_fps + 5).min(FPS_MAX)
                        };
                    }
                    KeyCode::Char('-') => {
                        target_fps = if target_fps == 0 {
                            FPS_MAX
                        } else {
                            target_fps.saturating_sub(5).max(FPS_MIN)
                        };
                    }
                    _ => {}
                },
                Event::Resize(_, _) => screen.invalidate(),
                _ => {}
            }
        }

        if !paused || single_step {
            sim.step();
        }
        meter.tick();

        grid.plot(sim.positions());
        screen.present(grid, &status_line(sim, meter.fps, target_fps, paused))?;

        if max_frames.is_some_and(|n| sim.frame() >= n) {
            break;
        }

        // sleep only what is left of the frame budget
        if target_fps > 0 {
            let budget = Duration::from_secs_f64(1.0 / target_fps as f64);
            let elapsed = frame_start.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            }
        }
    }
    Ok(())
}
