mod app;
mod boundary;
mod config;
mod forces;
mod kernel;
mod particles;
mod render;
mod sim;
mod vec2;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    app::run()
}
