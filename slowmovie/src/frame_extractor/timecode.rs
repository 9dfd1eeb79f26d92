extern crate ffmpeg_next as ffmpeg;

use std::fmt;
use std::time::Duration;

use ffmpeg::Rational;

/// A frame index tied to the frame rate of its video, convertible to wall
/// clock time. This is what ends up in logs and in the `--timecode` overlay.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Timecode {
    frame: u64,
    rate_numerator: i32,
    rate_denominator: i32,
}

impl Timecode {
    pub fn new(frame: u64, rate: Rational) -> Self {
        assert!(rate.numerator() > 0 && rate.denominator() > 0);
        Self {
            frame,
            rate_numerator: rate.numerator(),
            rate_denominator: rate.denominator(),
        }
    }

    /// Time from the start of the video to this frame.
    pub fn to_duration(&self) -> Duration {
        let millis = self.frame as u128 * 1000 * self.rate_denominator as u128
            / self.rate_numerator as u128;
        Duration::from_millis(millis.try_into().expect("videos are not that long"))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.to_duration().as_millis();
        let subsec = millis % 1000;
        let seconds = (millis / 1000) % 60;
        let minutes = (millis / 60_000) % 60;
        let hours = millis / 3_600_000;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, subsec)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timecode_at_25_fps() {
        let rate = Rational::new(25, 1);
        assert_eq!("00:00:00.000", Timecode::new(0, rate).to_string());
        assert_eq!("00:00:00.040", Timecode::new(1, rate).to_string());
        assert_eq!("00:00:01.000", Timecode::new(25, rate).to_string());
        assert_eq!("01:00:00.000", Timecode::new(25 * 3600, rate).to_string());
    }

    #[test]
    fn timecode_at_ntsc_rate() {
        let rate = Rational::new(24000, 1001);
        let tc = Timecode::new(24, rate);
        assert_eq!(Duration::from_millis(1001), tc.to_duration());
    }
}
