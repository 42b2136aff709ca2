//! Loader for YAML prompt template overrides.

use crate::types::{PromptDefinition, ANALYZE_TEMPLATE_ID, DETAILED_TEMPLATE_ID, FAST_TEMPLATE_ID};
use ragstack_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

const KNOWN_TEMPLATE_IDS: [&str; 3] = [FAST_TEMPLATE_ID, DETAILED_TEMPLATE_ID, ANALYZE_TEMPLATE_ID];

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".ragstack/prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in `.ragstack/prompts/`.
///
/// # Example
/// ```no_run
/// use ragstack_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.fast")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition, prompt_id)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all prompt IDs present in the workspace, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Load every override for a known template id.
///
/// Unknown files in the prompts directory are ignored with a warning.
pub fn load_overrides(workspace_path: &Path) -> AppResult<Vec<PromptDefinition>> {
    let mut overrides = Vec::new();

    for id in list_prompts(workspace_path)? {
        if !KNOWN_TEMPLATE_IDS.contains(&id.as_str()) {
            tracing::warn!("Ignoring unknown prompt template: {}", id);
            continue;
        }
        overrides.push(load_prompt(workspace_path, &id)?);
    }

    Ok(overrides)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition, expected_id: &str) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.id != expected_id {
        return Err(AppError::Prompt(format!(
            "Prompt id '{}' does not match file name '{}'",
            def.id, expected_id
        )));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, file_id: &str, body: &str) -> PathBuf {
        let prompts_dir = dir.join(".ragstack/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();

        let file_path = prompts_dir.join(format!("{}.yml", file_id));
        fs::write(&file_path, body).unwrap();
        file_path
    }

    fn valid_prompt(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
createdBy: test
template: "Question: {{{{query}}}}"
"#,
            id
        )
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag.fast", &valid_prompt("rag.fast"));

        let prompt = load_prompt(temp_dir.path(), "rag.fast").unwrap();
        assert_eq!(prompt.id, "rag.fast");
        assert_eq!(prompt.title, "Test Prompt");
        assert_eq!(prompt.template, "Question: {{query}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(temp_dir.path(), "nonexistent");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", "invalid: yaml: content:");

        let result = load_prompt(temp_dir.path(), "invalid");
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_rejects_mismatched_id() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag.fast", &valid_prompt("rag.detailed"));

        let err = load_prompt(temp_dir.path(), "rag.fast").unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_rejects_bad_api_version() {
        let temp_dir = TempDir::new().unwrap();
        let body = valid_prompt("rag.fast").replace("\"1.0\"", "\"1\"");
        write_prompt(temp_dir.path(), "rag.fast", &body);

        assert!(load_prompt(temp_dir.path(), "rag.fast").is_err());
    }

    #[test]
    fn test_list_prompts_sorted() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag.fast", &valid_prompt("rag.fast"));
        write_prompt(temp_dir.path(), "rag.analyze", &valid_prompt("rag.analyze"));

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["rag.analyze", "rag.fast"]);
    }

    #[test]
    fn test_load_overrides_skips_unknown_ids() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "rag.detailed", &valid_prompt("rag.detailed"));
        write_prompt(temp_dir.path(), "custom", &valid_prompt("custom"));

        let overrides = load_overrides(temp_dir.path()).unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].id, "rag.detailed");
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_prompts(temp_dir.path()).unwrap().is_empty());
        assert!(load_overrides(temp_dir.path()).unwrap().is_empty());
    }
}
