//! Terminal-side display collaborators.

use std::sync::{PoisonError, RwLock};

use control_client::{AutonomyIndicator, AutonomyLabels, DisplaySurface};

/// Sensor text is untrusted: drop control characters so a reading cannot
/// move the cursor or change terminal modes.
pub fn sanitize_reading(reading: &str) -> String {
    reading
        .chars()
        .map(|ch| if ch == '\n' || ch == '\t' { ' ' } else { ch })
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

pub struct StdoutDisplay;

impl DisplaySurface for StdoutDisplay {
    fn show(&self, reading: &str) {
        println!("{}", sanitize_reading(reading));
    }
}

pub struct AutonomyLabelCell {
    labels: RwLock<AutonomyLabels>,
}

impl Default for AutonomyLabelCell {
    fn default() -> Self {
        Self {
            labels: RwLock::new(AutonomyLabels::for_state(false)),
        }
    }
}

impl AutonomyLabelCell {
    pub fn current(&self) -> AutonomyLabels {
        *self.labels.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AutonomyIndicator for AutonomyLabelCell {
    fn show(&self, labels: AutonomyLabels) {
        *self.labels.write().unwrap_or_else(PoisonError::into_inner) = labels;
    }
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
