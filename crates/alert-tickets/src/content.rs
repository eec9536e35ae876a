//! Issue descriptions have two parts separated by [`BOUNDARY`]: a free-text
//! prefix which belongs to humans, and a generated suffix which is replaced
//! on every update.
//!
//! Edits made below the boundary are lost on the next update. That's a
//! known limitation, and the boundary text says as much.

/// Literal marker between the human-owned and generated parts of a description.
pub const BOUNDARY: &str = "_-- Alertmanager -- [only edit above]_";

/// Description of a newly created issue, which has no human-owned prefix.
pub fn creation_description(boundary: &str, suffix: &str) -> String {
    format!("{boundary}\n\n{suffix}")
}

/// Replace the generated suffix of `existing`, preserving everything before
/// the last occurrence of `boundary`.
///
/// If `existing` has no boundary at all, the whole of it is taken to be
/// generated content. If nothing but whitespace precedes the boundary, the
/// result has the same shape as a freshly created description.
pub fn merge_description(existing: &str, boundary: &str, suffix: &str) -> String {
    let prefix = match existing.rsplit_once(boundary) {
        Some((prefix, _generated)) => prefix.trim_end(),
        None => "",
    };

    if prefix.is_empty() {
        creation_description(boundary, suffix)
    } else {
        format!("{prefix}\n\n{boundary}\n{suffix}")
    }
}
