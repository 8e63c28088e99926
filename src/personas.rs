use std::path::Path;

/// Used when the persona wordlist cannot be read.
pub const FALLBACK_PERSONAS: &[&str] = &[
    "John Danaher",
    "Rickson Gracie",
    "Roger Gracie",
    "Marcelo Garcia",
    "Gordon Ryan",
    "Kyra Gracie",
    "Helio Gracie",
    "Carlos Gracie",
    "Eddie Bravo",
    "Andre Galvao",
    "Buchecha",
    "Keenan Cornelius",
    "Bernardo Faria",
    "Renzo Gracie",
    "Jean Jacques Machado",
];

/// Reads a newline-delimited list of persona names, one per line.
///
/// A missing, unreadable or empty file yields [`FALLBACK_PERSONAS`].
pub fn load_personas(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let names = parse_personas(&text);
            if names.is_empty() {
                tracing::warn!(path = %path.display(), "persona list is empty, using built-in names");
                fallback_personas()
            } else {
                tracing::debug!(path = %path.display(), count = names.len(), "loaded persona list");
                names
            }
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not read persona list, using built-in names");
            fallback_personas()
        }
    }
}

pub fn parse_personas(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn fallback_personas() -> Vec<String> {
    FALLBACK_PERSONAS.iter().map(|s| s.to_string()).collect()
}
