//! Speech playback — wraps gateway PCM in a WAV container and hands the
//! file to the OS default player. Callers treat any failure as non-fatal.

use std::env;
use std::fs;

use anyhow::{Context, Result, anyhow};
use chrono::Local;

use crate::constants::{APP_NAME, TTS_SAMPLE_RATE};

/// Play raw mono 16-bit PCM at the speech model's sample rate.
pub fn play_pcm(pcm: &[u8]) -> Result<()> {
    if pcm.is_empty() {
        return Err(anyhow!("empty audio payload"));
    }

    let wav = wav_from_pcm(pcm, TTS_SAMPLE_RATE);
    let stamp = Local::now().format("%H%M%S%3f");
    let path = env::temp_dir().join(format!("{APP_NAME}-speech-{stamp}.wav"));
    fs::write(&path, wav).with_context(|| format!("write {}", path.display()))?;
    open::that(&path).context("launch audio player")?;
    Ok(())
}

/// Prefix `pcm` (mono, 16-bit little-endian) with a minimal RIFF/WAV header.
fn wav_from_pcm(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS_PER_SAMPLE: u16 = 16;
    let byte_rate = sample_rate * u32::from(CHANNELS) * u32::from(BITS_PER_SAMPLE) / 8;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}
