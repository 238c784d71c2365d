//! Pipeline step trait definition.
//!
//! Each job step is a `PipelineStep`. The runner drives a step for one
//! video at a time:
//!
//! 1. logs `start_message`
//! 2. `validate_input` checks preconditions left by earlier steps
//! 3. `execute` does the work or decides it was already done
//! 4. `validate_output` runs after a `Success`

use super::errors::StepResult;
use super::types::{StepContext, StepOutcome};
use crate::models::JobStep;

/// Trait for pipeline steps.
pub trait PipelineStep: Send + Sync {
    /// Which job step this implements.
    fn step(&self) -> JobStep;

    /// Step name (for progress labels and errors).
    fn name(&self) -> &str {
        self.step().as_str()
    }

    /// Line logged before the step touches anything.
    fn start_message(&self) -> &str;

    /// Check preconditions before execution.
    fn validate_input(&self, ctx: &StepContext<'_>) -> StepResult<()>;

    /// Perform the work, or return `Skipped` when it is already done.
    fn execute(&self, ctx: &StepContext<'_>) -> StepResult<StepOutcome>;

    /// Verify the step recorded its results.
    fn validate_output(&self, _ctx: &StepContext<'_>) -> StepResult<()> {
        Ok(())
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
