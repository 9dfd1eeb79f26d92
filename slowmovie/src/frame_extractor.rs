pub mod frame_extractor;
pub mod timecode;

pub use frame_extractor::FrameExtractor;
pub use frame_extractor::Result;
pub use timecode::Timecode;
