//! Sound engine: procedural blip effects via rodio.
//!
//! All sounds are generated as in-memory WAV buffers at init time.
//! Playback is fire-and-forget (non-blocking) via rodio's Sink.
//!
//! Build without the "sound" feature to disable audio entirely
//! (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::{debug, warn};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_paint: Arc<Vec<u8>>,
        sfx_step: Arc<Vec<u8>>,
        sfx_rotate: Arc<Vec<u8>>,
        sfx_invalid: Arc<Vec<u8>>,
        sfx_clear: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "no audio output, sound disabled");
                    return None;
                }
            };
            debug!("sound engine ready");

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_paint: Arc::new(make_wav(&gen_blip(880.0, 0.04, 0.22))),
                sfx_step: Arc::new(make_wav(&gen_blip(330.0, 0.02, 0.10))),
                sfx_rotate: Arc::new(make_wav(&gen_sweep(500.0, 900.0, 0.07))),
                sfx_invalid: Arc::new(make_wav(&gen_buzz())),
                sfx_clear: Arc::new(make_wav(&gen_clear())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_paint(&self) { self.play(&self.sfx_paint); }
        pub fn play_step(&self) { self.play(&self.sfx_step); }
        pub fn play_rotate(&self) { self.play(&self.sfx_rotate); }
        pub fn play_invalid(&self) { self.play(&self.sfx_invalid); }
        pub fn play_clear(&self) { self.play(&self.sfx_clear); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * 2.0 * std::f32::consts::PI).sin() * env * volume
            })
            .collect()
    }

    /// Rotate: short rising sweep
    fn gen_sweep(from: f32, to: f32, duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.7);
                (phase * 2.0 * std::f32::consts::PI).sin() * env * 0.22
            })
            .collect()
    }

    /// Invalid: low square-ish buzz
    fn gen_buzz() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.12) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let s = (t * 140.0 * 2.0 * std::f32::consts::PI).sin();
                let square = if s >= 0.0 { 1.0 } else { -1.0 };
                let env = 1.0 - (i as f32 / n as f32);
                square * env * 0.12
            })
            .collect()
    }

    /// Level clear: ascending fanfare C5→E5→G5→C6
    fn gen_clear() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0];
        let note_dur = 0.1;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.6
                    + (t * freq * 2.0 * 2.0 * std::f32::consts::PI).sin() * 0.3
                    + (t * freq * 3.0 * 2.0 * std::f32::consts::PI).sin() * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        // Sustain the last note
        samples.extend(gen_blip(1047.0, 0.25, 0.3));
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a 16-bit PCM buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let wav = make_wav(&gen_blip(440.0, 0.01, 0.5));
            let n = (SAMPLE_RATE as f32 * 0.01) as usize;
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + n * 2);
            let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
            assert_eq!(data_size as usize, n * 2);
        }

        #[test]
        fn samples_are_clamped() {
            let wav = make_wav(&[2.0, -2.0]);
            assert_eq!(i16::from_le_bytes([wav[44], wav[45]]), 32767);
            assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), -32767);
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_paint(&self) {}
    pub fn play_step(&self) {}
    pub fn play_rotate(&self) {}
    pub fn play_invalid(&self) {}
    pub fn play_clear(&self) {}
}

/// Play at most one effect for a batch of events; the loudest wins.
pub fn react(sound: &SoundEngine, events: &[GameEvent]) {
    let has = |f: fn(&GameEvent) -> bool| events.iter().any(f);

    if has(|e| matches!(e, GameEvent::LevelWon(_))) {
        sound.play_clear();
    } else if has(|e| matches!(e, GameEvent::InvalidAction(_))) {
        sound.play_invalid();
    } else if has(|e| matches!(e, GameEvent::PieceRotated { .. })) {
        sound.play_rotate();
    } else if has(|e| matches!(e, GameEvent::CellsPainted { counted: true, .. })) {
        sound.play_paint();
    } else if has(|e| matches!(e, GameEvent::PieceMoved { .. } | GameEvent::CellsPainted { .. })) {
        sound.play_step();
    }
}
