use std::path::Path;

/// Marker file written by the model download tooling next to the weights.
const REVISION_FILE: &str = "REVISION.txt";

/// If `model_id` is a local directory carrying a revision marker, return its
/// first non-empty trimmed line. Every failure mode yields `None`; this
/// never surfaces an error.
pub fn resolve_model_version(model_id: &str) -> Option<String> {
    let dir = Path::new(model_id);
    if !dir.is_dir() {
        return None;
    }
    let contents = std::fs::read_to_string(dir.join(REVISION_FILE)).ok()?;
    let line = contents.lines().next()?.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}
