//! Synthetic spectra for exercising the channel without an analyzer.

use std::f32::consts::PI;

/// Noise floor under the peak.
const FLOOR: f32 = 0.05;

/// A Gaussian peak that sweeps across the bins, one step per frame.
#[derive(Debug, Clone)]
pub struct TravellingPeak {
    position: f32,
    speed: f32,
    width: f32,
    frame: u64,
    magnitude: Vec<f32>,
    phase: Vec<f32>,
}

impl TravellingPeak {
    /// Peak sweeping `bin_count` bins in roughly two seconds at 43 fps.
    pub fn new(bin_count: usize) -> Self {
        let bins = bin_count as f32;
        Self {
            position: 0.0,
            speed: (bins / 86.0).max(1.0),
            width: (bins / 64.0).max(1.0),
            frame: 0,
            magnitude: vec![0.0; bin_count],
            phase: vec![0.0; bin_count],
        }
    }

    /// Bins per frame.
    pub fn bin_count(&self) -> usize {
        self.magnitude.len()
    }

    /// Bin the peak is centred on for the next frame.
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Produce the next spectrum: magnitudes in `[0, 1]`, phases in `[-π, π]`.
    pub fn next_frame(&mut self) -> (&[f32], &[f32]) {
        let bins = self.bin_count() as f32;
        let t = self.frame as f32 * 0.05;

        for (i, (m, p)) in self.magnitude.iter_mut().zip(self.phase.iter_mut()).enumerate() {
            let x = i as f32;
            // Distance on a ring so the peak wraps smoothly at the top bin.
            let d = (x - self.position).abs();
            let d = d.min(bins - d);
            *m = FLOOR + (1.0 - FLOOR) * (-(d * d) / (2.0 * self.width * self.width)).exp();
            *p = wrap_phase(x * 0.1 + t);
        }

        if bins > 0.0 {
            self.position = (self.position + self.speed) % bins;
        }
        self.frame += 1;
        (&self.magnitude, &self.phase)
    }
}

fn wrap_phase(angle: f32) -> f32 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}
