pub mod capture_delegate;
pub mod media_indexer;
pub mod player;
pub mod sample_source;
