// FILE: src/core/audio.rs
//! Background music for the page behind the intro.
//!
//! A `MusicPlayer` owns one cpal output stream and a decoder thread that
//! streams an Ogg Vorbis file into a bounded sample queue. Opening the device
//! or the track can fail on hosts without audio; callers treat that as
//! "playback refused", never as fatal.
use crate::error::IntroError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use lewton::inside_ogg::OggStreamReader;
use log::{debug, error, info};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// --- Tunables ---
const QUEUE_CAP_SAMPLES: usize = 1 << 16;
const DECODER_BACKOFF: Duration = Duration::from_millis(2);

type SampleQueue = Arc<Mutex<VecDeque<f32>>>;

pub struct MusicPlayer {
    // Dropping the stream stops output.
    stream: Stream,
    decoder: Option<thread::JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    path: PathBuf,
}

impl MusicPlayer {
    /// Opens the default output device and starts decoding `path`. The stream
    /// is built paused; nothing is audible until `play`.
    pub fn open(path: &Path) -> Result<Self, IntroError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| IntroError::Audio("no audio output device".to_string()))?;
        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| IntroError::Audio(format!("no default output config: {}", e)))?
            .into();
        let out_hz = config.sample_rate.0;
        let out_ch = config.channels as usize;

        let file = File::open(path)?;
        let ogg = OggStreamReader::new(BufReader::new(file))
            .map_err(|e| IntroError::Audio(format!("{}: {}", path.display(), e)))?;

        let queue: SampleQueue = Arc::new(Mutex::new(VecDeque::with_capacity(QUEUE_CAP_SAMPLES)));
        let callback_queue = queue.clone();
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| fill_from_queue(&callback_queue, data),
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| IntroError::Audio(format!("failed to build output stream: {}", e)))?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let decoder = thread::spawn(move || {
            if let Err(e) = decode_loop(ogg, out_hz, out_ch, &queue, &thread_stop) {
                error!("Music decoder failed: {}", e);
            }
        });

        info!("Music track '{}' ready ({} Hz, {} ch).", path.display(), out_hz, out_ch);
        Ok(Self { stream, decoder: Some(decoder), stop, path: path.to_path_buf() })
    }

    pub fn play(&self) -> Result<(), IntroError> {
        self.stream
            .play()
            .map_err(|e| IntroError::Audio(format!("failed to start '{}': {}", self.path.display(), e)))
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.decoder.take() {
            let _ = handle.join();
        }
    }
}

/// Real-time callback: drains the queue, pads with silence on underrun.
fn fill_from_queue(queue: &SampleQueue, out: &mut [f32]) {
    let Ok(mut q) = queue.try_lock() else {
        out.iter_mut().for_each(|s| *s = 0.0);
        return;
    };
    for s in out.iter_mut() {
        *s = q.pop_front().unwrap_or(0.0);
    }
}

fn decode_loop(
    mut ogg: OggStreamReader<BufReader<File>>,
    out_hz: u32,
    out_ch: usize,
    queue: &SampleQueue,
    stop: &AtomicBool,
) -> Result<(), lewton::VorbisError> {
    let in_ch = ogg.ident_hdr.audio_channels as usize;
    let in_hz = ogg.ident_hdr.audio_sample_rate;
    let mut resampler = Resampler::new(in_hz, out_hz, in_ch, out_ch);
    let mut out = Vec::with_capacity(1 << 14);

    while let Some(packet) = ogg.read_dec_packet_itl()? {
        out.clear();
        resampler.push(&packet, &mut out);

        let mut written = 0;
        while written < out.len() {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let pushed = match queue.lock() {
                Ok(mut q) => {
                    let n = (QUEUE_CAP_SAMPLES - q.len()).min(out.len() - written);
                    q.extend(&out[written..written + n]);
                    n
                }
                Err(_) => return Ok(()),
            };
            if pushed == 0 {
                thread::sleep(DECODER_BACKOFF);
            }
            written += pushed;
        }
    }
    debug!("Music decoder reached end of stream");
    Ok(())
}

/* -------------------- resampling and channel mapping -------------------- */

/// Linear-interpolating resampler over interleaved i16 frames.
/// Output channels beyond the input's repeat input channels round-robin.
pub struct Resampler {
    step: f64,
    in_ch: usize,
    out_ch: usize,
    pos: f64,
    prev: Vec<f32>,
    cur: Vec<f32>,
    primed: bool,
}

impl Resampler {
    pub fn new(in_hz: u32, out_hz: u32, in_ch: usize, out_ch: usize) -> Self {
        let in_ch = in_ch.max(1);
        Self {
            step: in_hz as f64 / out_hz.max(1) as f64,
            in_ch,
            out_ch: out_ch.max(1),
            pos: 0.0,
            prev: vec![0.0; in_ch],
            cur: vec![0.0; in_ch],
            primed: false,
        }
    }

    /// Consumes interleaved input frames, appending interleaved output.
    pub fn push(&mut self, input: &[i16], out: &mut Vec<f32>) {
        for frame in input.chunks_exact(self.in_ch) {
            std::mem::swap(&mut self.prev, &mut self.cur);
            for (c, &s) in frame.iter().enumerate() {
                self.cur[c] = s as f32 / 32768.0;
            }
            if !self.primed {
                self.prev.copy_from_slice(&self.cur);
                self.primed = true;
                continue;
            }
            // emit every output instant that falls between prev and cur
            while self.pos < 1.0 {
                let t = self.pos as f32;
                for c in 0..self.out_ch {
                    let ic = c % self.in_ch;
                    out.push(self.prev[ic] + (self.cur[ic] - self.prev[ic]) * t);
                }
                self.pos += self.step;
            }
            self.pos -= 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_mono_passes_through() {
        let mut r = Resampler::new(48_000, 48_000, 1, 1);
        let mut out = Vec::new();
        r.push(&[0, 16384, -16384, 0], &mut out);
        assert_eq!(out, vec![0.0, 0.5, -0.5]);
    }

    #[test]
    fn upsampling_interpolates() {
        let mut r = Resampler::new(24_000, 48_000, 1, 1);
        let mut out = Vec::new();
        r.push(&[0, 16384, 0], &mut out);
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.25]);
    }

    #[test]
    fn mono_is_spread_to_stereo() {
        let mut r = Resampler::new(44_100, 44_100, 1, 2);
        let mut out = Vec::new();
        r.push(&[8192, 8192], &mut out);
        assert_eq!(out, vec![0.25, 0.25]);
    }

    #[test]
    fn underrun_is_silence() {
        let queue: SampleQueue = Arc::new(Mutex::new(VecDeque::from(vec![0.5, 0.5])));
        let mut out = [1.0f32; 4];
        fill_from_queue(&queue, &mut out);
        assert_eq!(out, [0.5, 0.5, 0.0, 0.0]);
    }
}
