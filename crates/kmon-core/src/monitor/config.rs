//! Monitor session settings.

use crate::types::StackBounds;
use crate::unwind::DEFAULT_MAX_FRAMES;

/// Prompt printed before each line is read.
pub const DEFAULT_PROMPT: &str = "K> ";

/// What a failing command does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy
{
    /// End the session after reporting the failure.
    #[default]
    Terminate,
    /// Report the failure and read the next line.
    Continue,
}

/// Settings for one monitor session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig
{
    pub prompt: String,
    /// Frames walked by `backtrace` before it gives up.
    pub max_frames: usize,
    /// Stack window the unwinder accepts frame pointers from.
    pub stack_bounds: StackBounds,
    pub failure_policy: FailurePolicy,
}

impl Default for MonitorConfig
{
    fn default() -> Self
    {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_frames: DEFAULT_MAX_FRAMES,
            stack_bounds: StackBounds::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl MonitorConfig
{
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self
    {
        self.prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self
    {
        self.max_frames = max_frames;
        self
    }

    #[must_use]
    pub fn with_stack_bounds(mut self, stack_bounds: StackBounds) -> Self
    {
        self.stack_bounds = stack_bounds;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self
    {
        self.failure_policy = failure_policy;
        self
    }
}
