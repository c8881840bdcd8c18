//! Frame timing instrumentation.
//!
//! The renderer brackets the work of each frame with `begin_frame` and
//! `finish_frame`; the aggregator keeps a short history of the resulting
//! samples for reporting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of recent frames the aggregator averages over
pub const AGGREGATION_WINDOW: usize = 30;

/// Timing of one completed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTiming {
    /// Time between the end of the previous frame and the end of this one
    pub interframe_time: Duration,
    /// Time between `begin_frame` and `finish_frame`
    pub frame_time: Duration,
}

#[derive(Debug)]
pub struct Profiler {
    this_frame_start: Instant,
    last_frame_end: Instant,
    previous: FrameTiming,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            this_frame_start: now,
            last_frame_end: now,
            previous: FrameTiming::default(),
        }
    }

    pub fn begin_frame(&mut self) {
        self.begin_frame_at(Instant::now());
    }

    pub fn finish_frame(&mut self) {
        self.finish_frame_at(Instant::now());
    }

    fn begin_frame_at(&mut self, now: Instant) {
        self.this_frame_start = now;
    }

    fn finish_frame_at(&mut self, now: Instant) {
        self.previous = FrameTiming {
            interframe_time: now.saturating_duration_since(self.last_frame_end),
            frame_time: now.saturating_duration_since(self.this_frame_start),
        };
        self.last_frame_end = now;
    }

    /// Timing of the most recently finished frame
    pub fn previous_frame_results(&self) -> FrameTiming {
        self.previous
    }
}

/// Minimum, average and maximum of a series of durations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationStats {
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
}

impl DurationStats {
    fn from_samples(samples: impl Iterator<Item = Duration> + Clone) -> Self {
        let count = samples.clone().count() as u32;
        if count == 0 {
            return Self::default();
        }
        Self {
            min: samples.clone().min().unwrap_or_default(),
            avg: samples.clone().sum::<Duration>() / count,
            max: samples.max().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregatedTiming {
    /// Frames seen since creation, not just those in the window
    pub frame_count: u64,
    /// Frames per second derived from the average interframe time
    pub fps: f64,
    pub interframe_time: DurationStats,
    pub frame_time: DurationStats,
}

/// Rolling window of recent frame timings
#[derive(Debug, Default)]
pub struct TimingResultsAggregator {
    window: VecDeque<FrameTiming>,
    frame_count: u64,
}

impl TimingResultsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_frame(&mut self, timing: FrameTiming) {
        if self.window.len() == AGGREGATION_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(timing);
        self.frame_count += 1;
    }

    pub fn aggregated_results(&self) -> AggregatedTiming {
        let interframe_time = DurationStats::from_samples(self.window.iter().map(|t| t.interframe_time));
        let frame_time = DurationStats::from_samples(self.window.iter().map(|t| t.frame_time));
        let fps = if interframe_time.avg.is_zero() {
            0.0
        } else {
            1.0 / interframe_time.avg.as_secs_f64()
        };

        AggregatedTiming {
            frame_count: self.frame_count,
            fps,
            interframe_time,
            frame_time,
        }
    }
}
