//! Snapshot timeline
//!
//! The timeline samples the world at a fixed interval of simulation time and
//! keeps every snapshot in memory, ordered by time. Memory grows with run
//! length; callers bound the run or call [`Timeline::reset`].

use std::collections::BTreeMap;

use askit_math::{Quat, Vec3};
use askit_physics::{BodyId, FluidId, FluidSummary};
use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// Slack when deciding whether a sample boundary has been crossed
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Sampling parameters
///
/// Snapshots are taken after a step that reaches the next sample boundary.
/// A step longer than `sample_interval` still records a single snapshot, at
/// the step's end time; the skipped boundaries are not filled in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Simulation seconds between snapshots
    pub sample_interval: f64,
    /// When false, steps record nothing
    pub recording: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            sample_interval: 0.02,
            recording: true,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !(self.sample_interval > 0.0 && self.sample_interval.is_finite()) {
            return Err(TimelineError::InvalidParameter(format!(
                "sample interval must be positive, got {}",
                self.sample_interval
            )));
        }
        Ok(())
    }
}

/// Recorded state of one rigid body
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub id: BodyId,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub kinetic_energy: f64,
    pub potential_energy: f64,
}

impl BodyState {
    /// Kinetic plus gravitational potential energy
    pub fn energy(&self) -> f64 {
        self.kinetic_energy + self.potential_energy
    }
}

/// Recorded summary of one fluid block
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidState {
    pub id: FluidId,
    pub summary: FluidSummary,
}

/// Immutable record of the observable world at one instant
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub bodies: Vec<BodyState>,
    pub fluids: Vec<FluidState>,
    /// Slider, button and named variable values
    pub variables: BTreeMap<String, f64>,
    /// Body energies plus spring potential
    pub total_energy: f64,
}

impl Snapshot {
    pub fn body(&self, id: BodyId) -> Option<&BodyState> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn fluid(&self, id: FluidId) -> Option<&FluidState> {
        self.fluids.iter().find(|f| f.id == id)
    }

    pub fn variable(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }
}

/// Append-only, time-ordered history of snapshots
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    config: TimelineConfig,
    snapshots: Vec<Snapshot>,
    /// Simulation time at which the next snapshot is due
    next_sample: f64,
}

impl Timeline {
    pub fn new(config: TimelineConfig) -> Result<Self, TimelineError> {
        config.validate()?;
        Ok(Self {
            config,
            snapshots: Vec::new(),
            next_sample: 0.0,
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Change the sample interval; recorded snapshots are kept
    pub fn configure(&mut self, sample_interval: f64) -> Result<(), TimelineError> {
        let config = TimelineConfig {
            sample_interval,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        self.next_sample = match self.last_time() {
            Some(t) => self.boundary_after(t),
            None => 0.0,
        };
        log::info!("Timeline sample interval set to {sample_interval}s");
        Ok(())
    }

    /// Pause or resume sampling
    pub fn set_recording(&mut self, recording: bool) {
        if recording != self.config.recording {
            log::info!("Timeline recording {}", if recording { "resumed" } else { "paused" });
        }
        self.config.recording = recording;
    }

    pub fn is_recording(&self) -> bool {
        self.config.recording
    }

    /// Drop every snapshot and restart sampling at the next step
    pub fn reset(&mut self) {
        log::info!("Timeline reset ({} snapshots dropped)", self.snapshots.len());
        self.snapshots.clear();
        self.next_sample = 0.0;
    }

    /// True when a snapshot should be taken at simulation time `time`
    pub fn is_due(&self, time: f64) -> bool {
        self.config.recording && time + BOUNDARY_EPSILON >= self.next_sample
    }

    /// Append `snapshot` if it is later than the latest one
    ///
    /// Returns false when the snapshot was dropped to keep times strictly
    /// increasing.
    pub fn record(&mut self, snapshot: Snapshot) -> bool {
        if self.last_time().is_some_and(|last| snapshot.time <= last) {
            return false;
        }
        self.next_sample = self.boundary_after(snapshot.time);
        self.snapshots.push(snapshot);
        true
    }

    /// The first sample boundary strictly after `time`
    fn boundary_after(&self, time: f64) -> f64 {
        let interval = self.config.sample_interval;
        (((time + BOUNDARY_EPSILON) / interval).floor() + 1.0) * interval
    }

    /// Latest snapshot recorded at or before `time`
    pub fn query_at(&self, time: f64) -> Result<&Snapshot, TimelineError> {
        let idx = self.snapshots.partition_point(|s| s.time <= time);
        idx.checked_sub(1)
            .map(|i| &self.snapshots[i])
            .ok_or(TimelineError::NoData(time))
    }

    /// Snapshots with time in `[start, end]`
    pub fn query_range(&self, start: f64, end: f64) -> &[Snapshot] {
        let lo = self.snapshots.partition_point(|s| s.time < start);
        let hi = self.snapshots.partition_point(|s| s.time <= end);
        if lo < hi {
            &self.snapshots[lo..hi]
        } else {
            &[]
        }
    }

    /// Ordered traversal of every snapshot; clone the iterator to restart it
    pub fn history(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn first_time(&self) -> Option<f64> {
        self.snapshots.first().map(|s| s.time)
    }

    pub fn last_time(&self) -> Option<f64> {
        self.snapshots.last().map(|s| s.time)
    }
}
