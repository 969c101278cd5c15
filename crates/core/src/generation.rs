//! Fixed generation parameters for the single supported job type.

use crate::error::CoreError;
use crate::run::RunInputs;

/// Images per run.
pub const BATCH_SIZE: u32 = 1;

/// Output width in pixels (portrait 2:3-ish SDXL bucket).
pub const IMAGE_WIDTH: u32 = 832;

/// Output height in pixels.
pub const IMAGE_HEIGHT: u32 = 1216;

/// Longest prompt accepted, in characters.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Reject blank or oversized prompts before any outbound call is made.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be empty".into()));
    }
    let len = prompt.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "prompt is {len} characters, maximum is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(())
}

/// Build the provider input record for an (already optimized) prompt.
pub fn build_inputs(effective_prompt: &str) -> RunInputs {
    RunInputs {
        input_text: effective_prompt.to_string(),
        batch: BATCH_SIZE.to_string(),
        width: IMAGE_WIDTH.to_string(),
        height: IMAGE_HEIGHT.to_string(),
        id: String::new(),
    }
}
