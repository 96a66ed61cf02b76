pub mod capture_sequencer;
pub mod flash_cycler;
pub mod frame_stats;
pub mod frame_throttler;
pub mod image_transcoder;
