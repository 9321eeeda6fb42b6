pub mod pcm;
pub mod sample_queue;
pub mod wav_format;
