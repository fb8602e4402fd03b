use std::path::Path;

/// Maps a file name to a human-readable language name by extension.
pub fn detect_language(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase();

    let language = match ext.as_str() {
        "html" => "HTML",
        "css" => "CSS",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "jsx" => "JavaScript (React)",
        "tsx" => "TypeScript (React)",
        "py" => "Python",
        "java" => "Java",
        "cpp" => "C++",
        "c" => "C",
        "cs" => "C#",
        "go" => "Go",
        "rs" => "Rust",
        "rb" => "Ruby",
        "php" => "PHP",
        "kt" => "Kotlin",
        "swift" => "Swift",
        "scala" => "Scala",
        "sh" => "Shell",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "xml" => "XML",
        "toml" => "TOML",
        "dockerfile" => "Dockerfile",
        "hs" => "Haskell",
        "erl" => "Erlang",
        "ex" => "Elixir",
        "r" => "R",
        "jl" => "Julia",
        "sql" => "SQL",
        "md" => "Markdown",
        _ => return None,
    };

    Some(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_languages() {
        assert_eq!(detect_language("main.rs"), Some("Rust"));
        assert_eq!(detect_language("App.TSX"), Some("TypeScript (React)"));
        assert_eq!(detect_language("ci.yml"), Some("YAML"));
        assert_eq!(detect_language("Makefile"), None);
        assert_eq!(detect_language("data.bin"), None);
    }
}
