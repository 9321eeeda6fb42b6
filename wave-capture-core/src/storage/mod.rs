pub mod erase;
pub mod metadata;
pub mod paths;
pub mod raw_sink;
pub mod wave_encoder;
