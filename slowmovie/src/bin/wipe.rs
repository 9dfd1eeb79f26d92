use clap::Parser;
use color_eyre::eyre::{self, Context};
use slowmovie::display;
use slowmovie_common::bin_common::init::{init_eyre, init_logger};

#[derive(Parser)]
#[command()]
/// Wipe the panel to white and put it into deep sleep. Run this before
/// storing the device, e-paper left with an image for months can ghost.
struct Cli {
    /// The display driver to use
    #[arg(long, short = 'e', default_value = display::EPD7IN5_V2_NAME)]
    epd: String,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    init_logger(log::LevelFilter::Info, None)?;
    let cli = Cli::parse();

    let mut display = display::load_display_driver(&cli.epd)
        .wrap_err("failed to load the display driver")?;

    log::info!("Clearing '{}'", display.name());
    display.prepare().wrap_err("failed to initialize the display")?;
    display.clear().wrap_err("failed to clear the display")?;
    display.sleep().wrap_err("failed to put the display to sleep")?;
    display.close().wrap_err("failed to close the display")?;

    Ok(())
}
