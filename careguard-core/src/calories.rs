//! Calorie estimation
//!
//! The estimate is a pure function so deployments can swap in their own
//! model with [`crate::Engine::with_calorie_model`]. The default model adds
//! the basal burn over the period to a per-stride cost that scales with body
//! weight.

use crate::{config::CalorieConfig, constants::MS_PER_DAY};

/// Reference body mass for the per-stride calorie factor (kg)
///
/// The pet tracker firmware tunes its factor for a 10 kg animal.
pub const CALORIE_REFERENCE_MASS_KG: f32 = 10.0;

/// Everything a calorie model may look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalorieInputs {
    /// Steps in the period
    pub steps: u32,
    /// Period length
    pub duration_ms: u64,
    /// Body weight (kg)
    pub weight_kg: f32,
    /// Per-stride factor
    pub factor: f32,
    /// Basal metabolic rate (kcal/day)
    pub basal_kcal_per_day: f32,
}

impl CalorieInputs {
    /// Combine counters with the configured constants
    pub fn new(steps: u32, duration_ms: u64, config: &CalorieConfig) -> Self {
        Self {
            steps,
            duration_ms,
            weight_kg: config.weight_kg,
            factor: config.factor,
            basal_kcal_per_day: config.basal_kcal_per_day,
        }
    }
}

/// Calorie model, kcal for a period
pub type CalorieFn = fn(&CalorieInputs) -> f32;

/// Basal burn plus weight-scaled stride cost
pub fn stride_calories(inputs: &CalorieInputs) -> f32 {
    let activity = inputs.steps as f32 * inputs.factor * inputs.weight_kg / CALORIE_REFERENCE_MASS_KG;
    basal_calories(inputs) + activity
}

/// Basal burn only
pub fn basal_calories(inputs: &CalorieInputs) -> f32 {
    inputs.basal_kcal_per_day * (inputs.duration_ms as f32 / MS_PER_DAY as f32)
}
