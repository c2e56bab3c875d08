use anyhow::Result;
use dialoguer::Select;

/// Interactive confirmation prompt using arrow-key navigable selection.
pub fn prompt_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let items = vec!["Yes", "No"];
    let default_index = if default_yes { 0 } else { 1 };

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(default_index)
        .interact()?;

    Ok(selection == 0)
}

/// Guard for destructive loads: unsaved plan changes would be thrown away.
pub fn prompt_discard_changes() -> Result<bool> {
    prompt_confirmation(
        "The current plan has unsaved changes. Discard them?",
        false, // Default to "No" for safety
    )
}

pub fn prompt_overwrite_plan(path: &str) -> Result<bool> {
    prompt_confirmation(
        &format!("Plan file '{}' already exists. Overwrite?", path),
        false, // Default to "No" for safety
    )
}
