//! Driver for the waveshare 7.5" V2 black/white panel (the one the original
//! build was designed around) on the standard e-paper HAT wiring of a
//! Raspberry Pi: SPI for data, sysfs GPIO for the control pins.

use std::thread::sleep;
use std::time::{Duration, Instant};

use embedded_hal::spi::SpiDevice;
use image::GrayImage;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::sysfs_gpio::{Direction, Pin};
use linux_embedded_hal::SpidevDevice;
use slowmovie_common::utils::imgutils;

use super::{DisplayDevice, DisplayError, EPD7IN5_V2_NAME};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 480;
const FRAME_BYTES: usize = (WIDTH as usize / 8) * HEIGHT as usize;

const SPI_DEVICE: &str = "/dev/spidev0.0";
const SPI_SPEED_HZ: u32 = 4_000_000;
// the spidev default transfer size limit
const SPI_CHUNK: usize = 4096;

// BCM numbering, the standard waveshare HAT pinout
const RESET_PIN: u64 = 17;
const DATA_COMMAND_PIN: u64 = 25;
const BUSY_PIN: u64 = 24;
const POWER_PIN: u64 = 18;

const BUSY_POLL: Duration = Duration::from_millis(20);
const BUSY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Copy, Clone)]
#[repr(u8)]
enum CommandCode {
    PanelSetting = 0x00,
    PowerSetting = 0x01,
    PowerOff = 0x02,
    PowerOn = 0x04,
    DeepSleep = 0x07,
    DataStartTransmission1 = 0x10,
    DisplayRefresh = 0x12,
    DataStartTransmission2 = 0x13,
    DualSpi = 0x15,
    VcomAndDataInterval = 0x50,
    TconSetting = 0x60,
    ResolutionSetting = 0x61,
    GetStatus = 0x71,
}

impl CommandCode {
    fn cmd(self) -> u8 {
        self as u8
    }
}

/// Low level access to the panel: raw commands, busy waiting, full frame
/// transfers. [`WaveshareDisplay`] is the [`DisplayDevice`] face of this.
struct Epd7in5V2 {
    spi: SpidevDevice,
    reset_pin: Pin,
    data_or_cmd_pin: Pin,
    busy_pin: Pin,
    power_pin: Pin,
}

impl Epd7in5V2 {
    fn open() -> Result<Self, DisplayError> {
        let mut spi = SpidevDevice::open(SPI_DEVICE)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;

        let reset_pin = output_pin(RESET_PIN, 0)?;
        let data_or_cmd_pin = output_pin(DATA_COMMAND_PIN, 0)?;
        let power_pin = output_pin(POWER_PIN, 1)?;

        let busy_pin = Pin::new(BUSY_PIN);
        busy_pin.export()?;
        sleep(Duration::from_millis(50));
        busy_pin.set_direction(Direction::In)?;

        Ok(Self {
            spi,
            reset_pin,
            data_or_cmd_pin,
            busy_pin,
            power_pin,
        })
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.reset_pin.set_value(1)?;
        sleep(Duration::from_millis(20));
        self.reset_pin.set_value(0)?;
        sleep(Duration::from_millis(2));
        self.reset_pin.set_value(1)?;
        sleep(Duration::from_millis(20));
        Ok(())
    }

    fn send_command(&mut self, code: CommandCode) -> Result<(), DisplayError> {
        self.data_or_cmd_pin.set_value(0)?;
        self.spi.write(&[code.cmd()])?;
        Ok(())
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.data_or_cmd_pin.set_value(1)?;
        for chunk in data.chunks(SPI_CHUNK) {
            self.spi.write(chunk)?;
        }
        Ok(())
    }

    /// The busy pin stays low while the controller works, polling its status
    /// keeps the line updated.
    fn wait_until_idle(&mut self) -> Result<(), DisplayError> {
        let deadline = Instant::now() + BUSY_TIMEOUT;
        loop {
            self.send_command(CommandCode::GetStatus)?;
            if self.busy_pin.get_value()? == 1 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DisplayError::BusyTimeout);
            }
            sleep(BUSY_POLL);
        }
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.reset()?;

        // VGH=20V VGL=-20V VDH=15V VDL=-15V
        self.send_command(CommandCode::PowerSetting)?;
        self.send_data(&[0x07, 0x07, 0x3F, 0x3F])?;

        self.send_command(CommandCode::PowerOn)?;
        sleep(Duration::from_millis(100));
        self.wait_until_idle()?;

        // KW mode, LUT from OTP, scan directions
        self.send_command(CommandCode::PanelSetting)?;
        self.send_data(&[0x1F])?;

        self.send_command(CommandCode::ResolutionSetting)?;
        self.send_data(&[0x03, 0x20, 0x01, 0xE0])?; // 800x480

        self.send_command(CommandCode::DualSpi)?;
        self.send_data(&[0x00])?;

        self.send_command(CommandCode::VcomAndDataInterval)?;
        self.send_data(&[0x10, 0x07])?;

        self.send_command(CommandCode::TconSetting)?;
        self.send_data(&[0x22])?;

        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DisplayError> {
        self.send_command(CommandCode::DisplayRefresh)?;
        sleep(Duration::from_millis(100));
        self.wait_until_idle()
    }

    /// `frame` is 1bpp packed with white = 1. The controller wants white = 0
    /// in its "new data" ram.
    fn display_frame(&mut self, frame: &[u8]) -> Result<(), DisplayError> {
        assert_eq!(FRAME_BYTES, frame.len());
        let inverted: Vec<u8> = frame.iter().map(|b| !b).collect();
        self.send_command(CommandCode::DataStartTransmission2)?;
        self.send_data(&inverted)?;
        self.refresh()
    }

    fn clear_white(&mut self) -> Result<(), DisplayError> {
        let blank = vec![0x00u8; FRAME_BYTES];
        self.send_command(CommandCode::DataStartTransmission1)?;
        self.send_data(&blank)?;
        self.send_command(CommandCode::DataStartTransmission2)?;
        self.send_data(&blank)?;
        self.refresh()
    }

    fn deep_sleep(&mut self) -> Result<(), DisplayError> {
        self.send_command(CommandCode::PowerOff)?;
        self.wait_until_idle()?;
        self.send_command(CommandCode::DeepSleep)?;
        self.send_data(&[0xA5])?;
        Ok(())
    }

    fn module_exit(&mut self) -> Result<(), DisplayError> {
        self.reset_pin.set_value(0)?;
        self.data_or_cmd_pin.set_value(0)?;
        self.power_pin.set_value(0)?;
        for pin in [
            &self.reset_pin,
            &self.data_or_cmd_pin,
            &self.busy_pin,
            &self.power_pin,
        ] {
            pin.unexport()?;
        }
        Ok(())
    }
}

fn output_pin(number: u64, initial: u8) -> Result<Pin, DisplayError> {
    let pin = Pin::new(number);
    pin.export()?;
    // sysfs needs a moment before the direction file becomes writable
    sleep(Duration::from_millis(50));
    pin.set_direction(Direction::Out)?;
    pin.set_value(initial)?;
    Ok(pin)
}

pub struct WaveshareDisplay {
    epd: Epd7in5V2,
    initialized: bool,
}

impl WaveshareDisplay {
    pub fn new() -> Result<Self, DisplayError> {
        Ok(Self {
            epd: Epd7in5V2::open()?,
            initialized: false,
        })
    }
}

impl DisplayDevice for WaveshareDisplay {
    fn name(&self) -> &str {
        EPD7IN5_V2_NAME
    }

    fn width(&self) -> u32 {
        WIDTH
    }

    fn height(&self) -> u32 {
        HEIGHT
    }

    fn prepare(&mut self) -> Result<(), DisplayError> {
        self.epd.init()?;
        self.initialized = true;
        Ok(())
    }

    fn display(&mut self, image: &GrayImage) -> Result<(), DisplayError> {
        if image.dimensions() != (WIDTH, HEIGHT) {
            return Err(DisplayError::WrongDimensions {
                got_width: image.width(),
                got_height: image.height(),
                want_width: WIDTH,
                want_height: HEIGHT,
            });
        }
        if !self.initialized {
            self.prepare()?;
        }

        let packed = imgutils::pack_1bpp(image);
        self.epd.display_frame(&packed)
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.initialized = false;
        self.epd.deep_sleep()
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        if !self.initialized {
            self.prepare()?;
        }
        self.epd.clear_white()
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        if self.initialized {
            self.epd.deep_sleep()?;
            self.initialized = false;
        }
        self.epd.module_exit()
    }
}
