mod app;
mod canvas;
mod config;
mod input;
mod logging;
mod presence;
mod render;
mod scene;
mod task;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = config::Config::from_args(config::Args::parse())?;
    logging::init(cfg.log_file.as_deref())?;
    app::run(cfg)
}
