use super::Task;

pub fn ensure_non_empty(task: Task, model_name: &str, output: String) -> Result<String, String> {
    if output.trim().is_empty() {
        return Err(format!(
            "ollama returned empty output for task {} ({})",
            task.as_str(),
            model_name
        ));
    }
    Ok(output)
}

pub fn strip_wrapping_code_fence(output: String) -> String {
    let trimmed = output.trim();
    if trimmed.len() >= 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let inner = &trimmed[3..trimmed.len() - 3];
        let mut lines = inner.lines();
        let first = lines.next().unwrap_or_default();
        // a lone word on the opening line is a language tag
        if first.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
            lines.collect::<Vec<_>>().join("\n").trim().to_string()
        } else {
            inner.trim().to_string()
        }
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        let out = strip_wrapping_code_fence("```markdown\n# Title\nbody\n```".to_string());
        assert_eq!(out, "# Title\nbody");
    }

    #[test]
    fn strips_bare_fence() {
        let out = strip_wrapping_code_fence("```\n## Overview\n```".to_string());
        assert_eq!(out, "## Overview");
    }

    #[test]
    fn leaves_unfenced_output_alone() {
        let out = strip_wrapping_code_fence("  plain text\n".to_string());
        assert_eq!(out, "plain text");
        assert_eq!(strip_wrapping_code_fence("```".to_string()), "```");
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(ensure_non_empty(Task::Readme, "m", "  \n".to_string()).is_err());
        assert_eq!(
            ensure_non_empty(Task::Readme, "m", "ok".to_string()).unwrap(),
            "ok"
        );
    }
}
