use clap::Parser;
use tui_player::config::Config;
use tui_player::{app, output};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cfg = Config::parse();

    if cfg.list_devices {
        output::list_devices()?;
        return Ok(());
    }

    app::run(cfg)
}
