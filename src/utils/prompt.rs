//! Confirmation prompts for destructive commands

use anyhow::Result;
use dialoguer::Confirm;

/// Ask user for yes/no confirmation, defaulting to no
pub fn confirm(prompt: &str) -> Result<bool> {
    let result = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(result)
}

/// Confirm unless `skip` is set
pub fn confirm_unless(skip: bool, prompt: &str) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    confirm(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_confirmation_is_accepted() {
        assert!(confirm_unless(true, "Delete Pod[x]?").unwrap());
    }
}
