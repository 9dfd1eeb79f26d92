pub mod display;
pub mod frame_extractor;
pub mod player;
pub mod playlist;
pub mod progress;
pub mod subtitles;
