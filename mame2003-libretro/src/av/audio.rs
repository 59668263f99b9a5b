use super::{AvInfo, Delivery, MAX_DRIFT_CORRECTION, effective_sample_rate};
use crate::frontend::AudioSink;
use log::{debug, info, warn};

/// Converts the machine's fractional samples-per-frame rate into integral
/// per-frame batches.
///
/// Lifecycle: [`start`](Self::start) once per session (and again after a
/// sample-rate change), [`deliver`](Self::deliver) once per frame,
/// [`stop`](Self::stop) on unload.
#[derive(Debug, Default)]
pub struct AudioPacer {
    sample_rate: u32,
    frames_per_second: f64,
    stereo: bool,
    ratio: f64,
    nominal: usize,
    samples_per_frame: usize,
    drift: f64,
    /// Interleaved stereo output, sized for the largest possible frame.
    staging: Vec<i16>,
}

impl AudioPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a stream and return the sample count for the first frame.
    ///
    /// Returns 0 (and leaves the pacer stopped) when the frame rate is not
    /// positive or the effective rate is zero.
    pub fn start(&mut self, frames_per_second: f64, configured_rate: u32, stereo: bool) -> usize {
        self.stop();

        if !(frames_per_second.is_finite() && frames_per_second > 0.0) {
            warn!("audio not started, bad frame rate {frames_per_second}");
            return 0;
        }
        let sample_rate = effective_sample_rate(frames_per_second, configured_rate);
        if sample_rate == 0 {
            return 0;
        }
        if sample_rate != configured_rate {
            info!("frame rate {frames_per_second:.3} too low for {configured_rate} Hz, using {sample_rate} Hz");
        }

        let ratio = f64::from(sample_rate) / frames_per_second;
        let nominal = ratio as usize;

        self.sample_rate = sample_rate;
        self.frames_per_second = frames_per_second;
        self.stereo = stereo;
        self.ratio = ratio;
        self.nominal = nominal;
        self.samples_per_frame = nominal;
        self.drift = 0.0;
        self.staging = Vec::with_capacity((nominal + MAX_DRIFT_CORRECTION) * 2);

        debug!(
            "audio: {sample_rate} Hz at {frames_per_second:.6} fps, {nominal} samples per frame, {}",
            if stereo { "stereo" } else { "mono" }
        );
        nominal
    }

    /// Hand one frame of machine audio to `sink`.
    ///
    /// `buffer` holds `samples_per_frame()` samples per channel, interleaved
    /// when the machine is stereo. A short buffer is padded with silence.
    pub fn deliver(&mut self, buffer: Option<&[i16]>, sink: &mut impl AudioSink) -> Delivery {
        if !self.is_running() {
            return Delivery::default();
        }
        let Some(buffer) = buffer else {
            return Delivery {
                emitted: 0,
                next_samples_per_frame: self.samples_per_frame,
            };
        };

        let count = self.samples_per_frame;
        let channels = if self.stereo { 2 } else { 1 };
        let wanted = count * channels;
        if buffer.len() < wanted {
            debug!("audio: machine produced {} of {wanted} samples", buffer.len());
        }
        let source = &buffer[..buffer.len().min(wanted)];

        self.staging.clear();
        if self.stereo {
            self.staging.extend_from_slice(source);
        } else {
            self.staging.extend(source.iter().flat_map(|&s| [s, s]));
        }
        self.staging.resize(count * 2, 0);

        sink.upload_audio(&self.staging);
        self.settle_drift();

        Delivery {
            emitted: count,
            next_samples_per_frame: self.samples_per_frame,
        }
    }

    /// Release the stream. The pacer reports zero samples until restarted.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    fn settle_drift(&mut self) {
        self.samples_per_frame = self.nominal;
        self.drift += self.ratio - self.nominal as f64;
        if self.drift < 1.0 {
            return;
        }

        let correction = self.drift as usize;
        if correction < MAX_DRIFT_CORRECTION {
            self.samples_per_frame += correction;
        } else {
            warn!("audio: drift correction of {correction} samples suppressed");
        }
        self.drift -= correction as f64;
    }

    pub fn is_running(&self) -> bool {
        self.sample_rate != 0
    }

    /// Effective sample rate in Hz, 0 when stopped.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn stereo(&self) -> bool {
        self.stereo
    }

    pub fn nominal(&self) -> usize {
        self.nominal
    }

    /// Samples per channel expected for the next frame.
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    pub fn drift(&self) -> f64 {
        self.drift
    }

    pub fn av_info(&self) -> Option<AvInfo> {
        self.is_running().then_some(AvInfo {
            frames_per_second: self.frames_per_second,
            sample_rate: self.sample_rate,
        })
    }

    #[cfg(test)]
    pub(super) fn force_drift(&mut self, drift: f64) {
        self.drift = drift;
    }
}
