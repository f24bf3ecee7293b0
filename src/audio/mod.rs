pub mod wav;

pub use wav::{
    WavError, WAV_HEADER_LEN, decode_wav, duration_ms, encode_pcm_bytes, encode_wav,
    pcm_samples_from_bytes,
};
