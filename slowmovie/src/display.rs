//! The display seam: a [`DisplayDevice`] trait shaped like the panel
//! lifecycle (prepare, display, sleep, clear, close) with drivers looked up
//! by name, so the player never has to know what hardware it is talking to.

pub mod mock;
pub mod waveshare;

use image::GrayImage;
use linux_embedded_hal::{sysfs_gpio, SPIError};
use thiserror::Error;

pub use mock::MockDisplay;
pub use waveshare::WaveshareDisplay;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error(transparent)]
    Spi(#[from] SPIError),
    #[error(transparent)]
    Gpio(#[from] sysfs_gpio::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("the image is {got_width}x{got_height} but the panel is {want_width}x{want_height}")]
    WrongDimensions {
        got_width: u32,
        got_height: u32,
        want_width: u32,
        want_height: u32,
    },
    #[error("the panel never reported idle, is it connected?")]
    BusyTimeout,
    #[error("unknown display '{0}', supported displays: {}", .1.join(", "))]
    UnknownDisplay(String, Vec<String>),
}

/// One attached e-paper panel (or a stand-in for one). Drivers get a bilevel
/// grayscale image and are themselves responsible for the wire format.
pub trait DisplayDevice {
    /// The name this driver was loaded under.
    fn name(&self) -> &str;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Wake the panel up, run at the top of each update.
    fn prepare(&mut self) -> Result<(), DisplayError>;

    /// Push a full frame and refresh.
    fn display(&mut self, image: &GrayImage) -> Result<(), DisplayError>;

    /// Low-power mode between updates, e-paper keeps its image unpowered.
    fn sleep(&mut self) -> Result<(), DisplayError>;

    /// Wipe the panel to white.
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Release the hardware when the program ends.
    fn close(&mut self) -> Result<(), DisplayError>;
}

impl std::fmt::Debug for dyn DisplayDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayDevice")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

pub const MOCK_NAME: &str = "mock";
pub const EPD7IN5_V2_NAME: &str = "waveshare.epd7in5_v2";

pub fn list_supported_displays() -> Vec<String> {
    vec![MOCK_NAME.to_string(), EPD7IN5_V2_NAME.to_string()]
}

/// The plugin lookup: match a driver name to a constructed device.
pub fn load_display_driver(name: &str) -> Result<Box<dyn DisplayDevice>, DisplayError> {
    match name {
        MOCK_NAME => Ok(Box::new(MockDisplay::new())),
        EPD7IN5_V2_NAME => Ok(Box::new(WaveshareDisplay::new()?)),
        unknown => Err(DisplayError::UnknownDisplay(
            unknown.to_string(),
            list_supported_displays(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_drivers_are_rejected_with_suggestions() {
        match load_display_driver("waveshare.epd2in13") {
            Err(DisplayError::UnknownDisplay(name, supported)) => {
                assert_eq!("waveshare.epd2in13", name);
                assert!(supported.contains(&MOCK_NAME.to_string()));
            }
            other => panic!("expected UnknownDisplay, got {other:?}"),
        }
    }

    #[test]
    fn mock_is_always_loadable() {
        let display = load_display_driver(MOCK_NAME).unwrap();
        assert_eq!(MOCK_NAME, display.name());
    }
}
