use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

pub const ALARM_FREQUENCY_HZ: f32 = 880.0;
const SAMPLE_RATE: u32 = 44100;

/// Beeping alarm that follows an on/off millisecond pattern: even slots ring,
/// odd slots are silent. Finite, mono.
pub struct AlarmTone {
    frequency: f32,
    sample_rate: u32,
    /// Sample index where each slot ends.
    slot_ends: Vec<usize>,
    num_sample: usize,
}

impl AlarmTone {
    pub fn new(pattern: &[u64]) -> Self {
        let sample_rate = SAMPLE_RATE;
        let mut elapsed = 0usize;
        let slot_ends = pattern
            .iter()
            .map(|ms| {
                elapsed += (*ms as usize * sample_rate as usize) / 1000;
                elapsed
            })
            .collect();

        Self {
            frequency: ALARM_FREQUENCY_HZ,
            sample_rate,
            slot_ends,
            num_sample: 0,
        }
    }

    pub fn total_samples(&self) -> usize {
        self.slot_ends.last().copied().unwrap_or(0)
    }

    fn is_ringing(&self, index: usize) -> bool {
        let slot = self.slot_ends.partition_point(|end| *end <= index);
        slot % 2 == 0
    }
}

impl Iterator for AlarmTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples() {
            return None;
        }
        let index = self.num_sample;
        self.num_sample += 1;

        if !self.is_ringing(index) {
            return Some(0.0);
        }
        let t = index as f32 / self.sample_rate as f32;
        Some((2.0 * PI * self.frequency * t).sin() * 0.3)
    }
}

impl Source for AlarmTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples() - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total_samples() as f64 / self.sample_rate as f64,
        ))
    }
}
