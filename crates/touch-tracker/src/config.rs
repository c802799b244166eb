//! Configuration for the tracking engine

use crate::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use touch_core::FrameSize;

/// Upper bound on the neighbour count used by association
pub const MAX_NEIGHBORS: usize = 15;
/// Upper bound on the movement filtering strength
pub const MAX_MOVEMENT_FILTERING: f64 = 15.0;

/// Configuration for the tracking engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sensor frame used for calibrated projection
    pub frame: FrameSize,
    /// Detection-to-track association settings
    pub association: AssociationConfig,
    /// Lifecycle thresholds
    pub lifecycle: LifecycleConfig,
    /// Position smoothing settings
    pub filter: FilterConfig,
}

/// Nearest-neighbour association configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Neighbours that vote; even values are bumped to the next odd value
    pub k: usize,
    /// Early-exit radius in raw pixels, 0 disables the shortcut
    pub match_threshold: f64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            k: 3,
            match_threshold: 0.0,
        }
    }
}

/// Lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Speed (raw units per millisecond) below which a contact counts as still
    pub stillness_threshold: f64,
    /// Seconds of stillness before a held event fires
    pub held_threshold_secs: f64,
    /// First id handed out; ids below it are left to fiducial markers
    pub first_track_id: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stillness_threshold: 7.0,
            held_threshold_secs: 1.0,
            first_track_id: 200,
        }
    }
}

/// Adaptive position filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Smoothing strength in [0, 15], 0 disables smoothing of slow motion
    pub movement_filtering: f64,
    /// Floor applied to the time between two updates of one track
    pub min_elapsed_secs: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            movement_filtering: 0.0,
            min_elapsed_secs: 0.001,
        }
    }
}

impl TrackerConfig {
    /// Config for fast interaction: light smoothing, quick held detection
    pub fn responsive() -> Self {
        Self {
            lifecycle: LifecycleConfig {
                held_threshold_secs: 0.5,
                ..Default::default()
            },
            filter: FilterConfig {
                movement_filtering: 1.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Config for noisy sensors: heavy smoothing and a wider neighbourhood
    pub fn smooth() -> Self {
        Self {
            association: AssociationConfig {
                k: 5,
                ..Default::default()
            },
            filter: FilterConfig {
                movement_filtering: 10.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Check every field; `FrameSize` validates itself on construction
    pub fn validate(&self) -> TrackerResult<()> {
        let association = &self.association;
        if association.k > MAX_NEIGHBORS {
            return Err(TrackerError::invalid_config(format!(
                "association.k must be at most {MAX_NEIGHBORS}, got {}",
                association.k
            )));
        }
        if !association.match_threshold.is_finite() || association.match_threshold < 0.0 {
            return Err(TrackerError::invalid_config(format!(
                "association.match_threshold must be a non-negative number, got {}",
                association.match_threshold
            )));
        }

        let lifecycle = &self.lifecycle;
        if !lifecycle.stillness_threshold.is_finite() || lifecycle.stillness_threshold < 0.0 {
            return Err(TrackerError::invalid_config(format!(
                "lifecycle.stillness_threshold must be a non-negative number, got {}",
                lifecycle.stillness_threshold
            )));
        }
        if !lifecycle.held_threshold_secs.is_finite() || lifecycle.held_threshold_secs <= 0.0 {
            return Err(TrackerError::invalid_config(format!(
                "lifecycle.held_threshold_secs must be positive, got {}",
                lifecycle.held_threshold_secs
            )));
        }

        let filter = &self.filter;
        if !(0.0..=MAX_MOVEMENT_FILTERING).contains(&filter.movement_filtering) {
            return Err(TrackerError::invalid_config(format!(
                "filter.movement_filtering must be within [0, {MAX_MOVEMENT_FILTERING}], got {}",
                filter.movement_filtering
            )));
        }
        if !filter.min_elapsed_secs.is_finite() || filter.min_elapsed_secs <= 0.0 {
            return Err(TrackerError::invalid_config(format!(
                "filter.min_elapsed_secs must be positive, got {}",
                filter.min_elapsed_secs
            )));
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
