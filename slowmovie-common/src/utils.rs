pub mod fsutils;
pub mod imgutils;
pub mod overlay;
