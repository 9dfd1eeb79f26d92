use image::GrayImage;

use super::{DisplayDevice, DisplayError, MOCK_NAME};

/// A display that writes to the log instead of to hardware. Used for running
/// the player on machines with no screen attached, and in tests.
pub struct MockDisplay {
    width: u32,
    height: u32,
    frames_shown: usize,
}

impl MockDisplay {
    pub fn new() -> Self {
        // same dimensions as the real panel so frames come out looking right
        Self::with_dimensions(800, 480)
    }

    pub fn with_dimensions(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0);
        Self {
            width,
            height,
            frames_shown: 0,
        }
    }

    pub fn frames_shown(&self) -> usize {
        self.frames_shown
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayDevice for MockDisplay {
    fn name(&self) -> &str {
        MOCK_NAME
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn prepare(&mut self) -> Result<(), DisplayError> {
        log::debug!("preparing {}", self.name());
        Ok(())
    }

    fn display(&mut self, image: &GrayImage) -> Result<(), DisplayError> {
        if image.dimensions() != (self.width, self.height) {
            return Err(DisplayError::WrongDimensions {
                got_width: image.width(),
                got_height: image.height(),
                want_width: self.width,
                want_height: self.height,
            });
        }
        self.frames_shown += 1;
        log::info!("writing image {} to {}", self.frames_shown, self.name());
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        log::debug!("{} is sleeping", self.name());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        log::info!("clearing {}", self.name());
        Ok(())
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        log::debug!("closing {}", self.name());
        Ok(())
    }
}
