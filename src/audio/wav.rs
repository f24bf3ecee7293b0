use std::io::Cursor;
use thiserror::Error;

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;
const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("PCM byte length must be even, got {0} bytes")]
    OddPcmLength(usize),

    #[error("invalid WAV data: {0}")]
    Invalid(#[from] hound::Error),

    #[error("unsupported WAV layout: {channels} channel(s), {bits} bits per sample")]
    Unsupported { channels: u16, bits: u16 },
}

/// Reinterpret raw bytes as little-endian signed 16-bit samples.
///
/// Odd-length input is rejected rather than truncated: a dangling byte means
/// the payload was cut or mislabelled, and playing it anyway would hide that.
pub fn pcm_samples_from_bytes(bytes: &[u8]) -> Result<Vec<i16>, WavError> {
    if bytes.len() % 2 != 0 {
        return Err(WavError::OddPcmLength(bytes.len()));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Wrap mono 16-bit PCM samples in a minimal WAV container.
///
/// The output is always `44 + 2 * samples.len()` bytes. An empty sample slice
/// yields a bare header with a zero-length data chunk.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate.saturating_mul(u32::from(BLOCK_ALIGN));

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + samples.len() * 2);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    wav.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

/// Convenience for the fetch pipeline: raw PCM bytes straight to WAV.
pub fn encode_pcm_bytes(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, WavError> {
    let samples = pcm_samples_from_bytes(pcm)?;
    Ok(encode_wav(&samples, sample_rate))
}

/// Read a mono 16-bit PCM WAV buffer back into samples and its sample rate.
pub fn decode_wav(bytes: &[u8]) -> Result<(Vec<i16>, u32), WavError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    if spec.channels != CHANNELS
        || spec.bits_per_sample != BITS_PER_SAMPLE
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(WavError::Unsupported {
            channels: spec.channels,
            bits: spec.bits_per_sample,
        });
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok((samples, spec.sample_rate))
}

/// Playback length in whole milliseconds.
pub fn duration_ms(sample_count: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    sample_count as u64 * 1000 / u64::from(sample_rate)
}
