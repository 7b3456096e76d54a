pub mod compound_fdp;
pub mod parameters;

use crate::error::{Error, Result};

/// Tunables of the compound force-directed placement.
///
/// Deserializes from camelCase JSON; omitted fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompoundFdpOptions {
    /// Ideal length of an edge between two boxes, measured between their outlines.
    pub ideal_edge_length: f64,
    pub elastic_constant: f64,
    pub repulsion_constant: f64,
    /// Stretches the ideal length of edges whose endpoints live in different containers.
    pub nesting_factor: f64,
    pub gravitation_factor: f64,
    pub phase1_iterations: usize,
    pub phase2_iterations: usize,
    pub phase3_iterations: usize,
    pub phase2_temperature_initial_multiplier: f64,
    pub phase3_temperature_initial_multiplier: f64,
    /// Per-step temperature decay.
    pub temperature_factor: f64,
    /// Applied once per phase transition to the starting temperature of the next phase.
    pub temperature_decreasing: f64,
    pub displacement_limit_multiplier: f64,
    /// Repulsion between boxes further apart than `ideal_edge_length * separation_multiplier` is
    /// ignored.
    pub separation_multiplier: f64,
    /// Phase-2 steps between two regrowth rounds of pruned leaves.
    pub grow_interval: usize,
    /// Side of the square in which vertices without an initial position are scattered.
    pub initial_box_size: f64,
    /// Seed for deterministic randomness (initial placement and degenerate-vector jitter).
    pub random_seed: u64,
}

impl Default for CompoundFdpOptions {
    fn default() -> Self {
        Self {
            ideal_edge_length: 25.0,
            elastic_constant: 0.005,
            repulsion_constant: 150.0,
            nesting_factor: 0.2,
            gravitation_factor: 8.0,
            phase1_iterations: 50,
            phase2_iterations: 70,
            phase3_iterations: 30,
            phase2_temperature_initial_multiplier: 0.5,
            phase3_temperature_initial_multiplier: 0.2,
            temperature_factor: 0.95,
            temperature_decreasing: 0.5,
            displacement_limit_multiplier: 0.5,
            separation_multiplier: 15.0,
            grow_interval: 5,
            initial_box_size: 300.0,
            random_seed: 0,
        }
    }
}

impl CompoundFdpOptions {
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("repulsionConstant", self.repulsion_constant),
            ("nestingFactor", self.nesting_factor),
            ("gravitationFactor", self.gravitation_factor),
            (
                "phase2TemperatureInitialMultiplier",
                self.phase2_temperature_initial_multiplier,
            ),
            (
                "phase3TemperatureInitialMultiplier",
                self.phase3_temperature_initial_multiplier,
            ),
            ("temperatureFactor", self.temperature_factor),
            ("temperatureDecreasing", self.temperature_decreasing),
            ("displacementLimitMultiplier", self.displacement_limit_multiplier),
            ("separationMultiplier", self.separation_multiplier),
            ("initialBoxSize", self.initial_box_size),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParameter { name, value });
            }
        }

        let positive = [
            ("idealEdgeLength", self.ideal_edge_length),
            ("elasticConstant", self.elastic_constant),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParameter { name, value });
            }
        }

        // Cooling must never heat the system up.
        if self.temperature_factor > 1.0 {
            return Err(Error::InvalidParameter {
                name: "temperatureFactor",
                value: self.temperature_factor,
            });
        }
        if self.grow_interval == 0 {
            return Err(Error::InvalidParameter {
                name: "growInterval",
                value: 0.0,
            });
        }
        Ok(())
    }

    pub(crate) fn phase_iterations(&self, phase: compound_fdp::Phase) -> usize {
        match phase {
            compound_fdp::Phase::First => self.phase1_iterations,
            compound_fdp::Phase::Second => self.phase2_iterations,
            compound_fdp::Phase::Third => self.phase3_iterations,
        }
    }

    pub(crate) fn phase_temperature_multiplier(&self, phase: compound_fdp::Phase) -> f64 {
        match phase {
            compound_fdp::Phase::First => 1.0,
            compound_fdp::Phase::Second => self.phase2_temperature_initial_multiplier,
            compound_fdp::Phase::Third => self.phase3_temperature_initial_multiplier,
        }
    }
}
