use super::CompoundFdpOptions;
use crate::error::Result;

/// Notification sent to subscribers after a parameter took a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterChanged {
    pub name: &'static str,
}

type Listener = Box<dyn FnMut(&ParameterChanged) + Send>;

/// Observable, validated wrapper around [`CompoundFdpOptions`].
///
/// Equality compares values only. A clone copies the values but starts without subscribers.
pub struct CompoundFdpParameters {
    values: CompoundFdpOptions,
    listeners: Vec<Listener>,
}

impl Default for CompoundFdpParameters {
    fn default() -> Self {
        Self {
            values: CompoundFdpOptions::default(),
            listeners: Vec::new(),
        }
    }
}

impl Clone for CompoundFdpParameters {
    fn clone(&self) -> Self {
        Self {
            values: self.values,
            listeners: Vec::new(),
        }
    }
}

impl PartialEq for CompoundFdpParameters {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl std::fmt::Debug for CompoundFdpParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundFdpParameters")
            .field("values", &self.values)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

macro_rules! setters {
    ($($setter:ident => $field:ident : $ty:ty, $name:literal;)*) => {
        $(
            #[doc = concat!("Sets `", $name, "`. Returns whether the value changed.")]
            pub fn $setter(&mut self, value: $ty) -> Result<bool> {
                let mut next = self.values;
                next.$field = value;
                self.replace(next, $name)
            }
        )*
    };
}

impl CompoundFdpParameters {
    pub fn new(values: CompoundFdpOptions) -> Result<Self> {
        values.validate()?;
        Ok(Self {
            values,
            listeners: Vec::new(),
        })
    }

    pub fn options(&self) -> &CompoundFdpOptions {
        &self.values
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ParameterChanged) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    setters! {
        set_ideal_edge_length => ideal_edge_length: f64, "idealEdgeLength";
        set_elastic_constant => elastic_constant: f64, "elasticConstant";
        set_repulsion_constant => repulsion_constant: f64, "repulsionConstant";
        set_nesting_factor => nesting_factor: f64, "nestingFactor";
        set_gravitation_factor => gravitation_factor: f64, "gravitationFactor";
        set_phase1_iterations => phase1_iterations: usize, "phase1Iterations";
        set_phase2_iterations => phase2_iterations: usize, "phase2Iterations";
        set_phase3_iterations => phase3_iterations: usize, "phase3Iterations";
        set_phase2_temperature_initial_multiplier => phase2_temperature_initial_multiplier: f64, "phase2TemperatureInitialMultiplier";
        set_phase3_temperature_initial_multiplier => phase3_temperature_initial_multiplier: f64, "phase3TemperatureInitialMultiplier";
        set_temperature_factor => temperature_factor: f64, "temperatureFactor";
        set_temperature_decreasing => temperature_decreasing: f64, "temperatureDecreasing";
        set_displacement_limit_multiplier => displacement_limit_multiplier: f64, "displacementLimitMultiplier";
        set_separation_multiplier => separation_multiplier: f64, "separationMultiplier";
        set_grow_interval => grow_interval: usize, "growInterval";
        set_initial_box_size => initial_box_size: f64, "initialBoxSize";
        set_random_seed => random_seed: u64, "randomSeed";
    }

    fn replace(&mut self, next: CompoundFdpOptions, name: &'static str) -> Result<bool> {
        next.validate()?;
        if next == self.values {
            return Ok(false);
        }
        self.values = next;
        let event = ParameterChanged { name };
        for listener in &mut self.listeners {
            listener(&event);
        }
        Ok(true)
    }
}
