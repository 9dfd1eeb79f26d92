use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{self, Context};

/// One subtitle with the time span it should be on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// The cues of a SubRip (.srt) sidecar file. Parsing is deliberately
/// forgiving, a malformed block loses that one cue and nothing else.
#[derive(Debug, Default)]
pub struct Subtitles {
    cues: Vec<Cue>,
}

impl Subtitles {
    /// Where the sidecar for a video would be: same path, `.srt` extension.
    pub fn sidecar_of(video: &Path) -> PathBuf {
        video.with_extension("srt")
    }

    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read subtitles at: {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let contents = contents.trim_start_matches('\u{feff}');

        let mut cues: Vec<Cue> = contents
            .split("\n\n")
            .flat_map(|block| block.split("\r\n\r\n"))
            .filter_map(parse_block)
            .collect();
        cues.sort_by_key(|cue| cue.start);

        Self { cues }
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// The text that should be on screen at this point of the video.
    pub fn cue_at(&self, at: Duration) -> Option<&str> {
        // cues are sorted by start, everything at or before `at` is a candidate
        let candidates = self.cues.partition_point(|cue| cue.start <= at);
        self.cues[..candidates]
            .iter()
            .rev()
            .find(|cue| cue.end > at)
            .map(|cue| cue.text.as_str())
    }
}

fn parse_block(block: &str) -> Option<Cue> {
    let mut lines = block.lines().map(str::trim).skip_while(|line| line.is_empty());

    let first = lines.next()?;
    // the numeric counter line is optional in the wild
    let times = if first.contains("-->") {
        first
    } else {
        lines.next()?
    };

    let (start, end) = times.split_once("-->")?;
    let start = parse_srt_time(start.trim())?;
    let end = parse_srt_time(end.trim())?;
    if end <= start {
        return None;
    }

    let text: Vec<String> = lines.map(strip_tags).collect();
    let text = text.join("\n");
    if text.trim().is_empty() {
        return None;
    }

    Some(Cue { start, end, text })
}

/// `HH:MM:SS,mmm`, with some tolerance for `.` as the decimal separator.
fn parse_srt_time(time: &str) -> Option<Duration> {
    let mut clock_and_millis = time.splitn(2, [',', '.']);
    let clock = clock_and_millis.next()?;
    let millis: u64 = match clock_and_millis.next() {
        Some(millis) => millis.trim().parse().ok()?,
        None => 0,
    };

    let mut parts = clock.splitn(3, ':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.trim().parse().ok()?;
    let seconds: u64 = parts.next()?.trim().parse().ok()?;
    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return None;
    }

    Some(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
    ))
}

/// Throw away `<i>`-style html tags and `{\an8}`-style override codes, a
/// 1-bit panel is not going to honor them anyway.
fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut skip_until = None;
    for c in line.chars() {
        match (skip_until, c) {
            (None, '<') => skip_until = Some('>'),
            (None, '{') => skip_until = Some('}'),
            (None, c) => out.push(c),
            (Some(until), c) if c == until => skip_until = None,
            (Some(_), _) => (),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    const EXAMPLE: &str = "\
1
00:00:01,000 --> 00:00:04,000
Hello there.

2
00:00:05,500 --> 00:00:07,000
<i>General Kenobi!</i>
You are a bold one.

not a cue at all

3
00:01:00,000 --> 00:00:59,000
backwards, dropped
";

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn parses_well_formed_cues_and_skips_the_rest() {
        let subs = Subtitles::parse(EXAMPLE);
        assert_eq!(2, subs.len());
    }

    #[test]
    fn lookup_by_time() {
        let subs = Subtitles::parse(EXAMPLE);
        assert_eq!(None, subs.cue_at(secs(0)));
        assert_eq!(Some("Hello there."), subs.cue_at(secs(1)));
        assert_eq!(Some("Hello there."), subs.cue_at(secs(3)));
        assert_eq!(None, subs.cue_at(secs(4)));
        assert_eq!(
            Some("General Kenobi!\nYou are a bold one."),
            subs.cue_at(secs(6))
        );
        assert_eq!(None, subs.cue_at(secs(120)));
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let srt = "\u{feff}1\r\n00:00:00,000 --> 00:00:02,000\r\nhi\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nbye\r\n";
        let subs = Subtitles::parse(srt);
        assert_eq!(2, subs.len());
        assert_eq!(Some("hi"), subs.cue_at(secs(1)));
        assert_eq!(Some("bye"), subs.cue_at(secs(3)));
    }

    #[test]
    fn srt_time_parsing() {
        assert_eq!(
            Some(Duration::from_millis(3_723_456)),
            parse_srt_time("01:02:03,456")
        );
        assert_eq!(
            Some(Duration::from_millis(1_500)),
            parse_srt_time("00:00:01.500")
        );
        assert_eq!(None, parse_srt_time("99:99:99,000"));
        assert_eq!(None, parse_srt_time("nonsense"));
    }

    #[test]
    fn tags_are_stripped() {
        assert_eq!("hello", strip_tags("<i>hello</i>"));
        assert_eq!("up here", strip_tags("{\\an8}up here"));
        assert_eq!("plain", strip_tags("plain"));
    }

    #[test]
    fn sidecar_path() {
        assert_eq!(
            PathBuf::from("/videos/movie.srt"),
            Subtitles::sidecar_of(Path::new("/videos/movie.mp4"))
        );
    }
}
