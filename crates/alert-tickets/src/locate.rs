use crate::{LogicalStateMap, Reference};

/// Label attached to every issue filed by this service.
pub const ALERT_LABEL: &str = "alert";

/// Build the JQL which locates the issue of `reference`.
///
/// Clause order matters for Jira's query performance: the label clause
/// narrows the candidates before the description text match, which relies
/// on the reference token in the description never being modified.
/// Unless `include_closed`, issues in a closed workflow state are excluded.
pub fn search_query(reference: &Reference, states: &LogicalStateMap, include_closed: bool) -> String {
    let mut query = format!(
        "labels = \"{ALERT_LABEL}\" and description ~ \"{}\"",
        reference.token()
    );

    if !include_closed {
        let closed = states
            .closed_names()
            .into_iter()
            .map(|name| format!("\"{}\"", escape(name)))
            .collect::<Vec<_>>()
            .join(", ");
        query.push_str(&format!(" and status not in ({closed})"));
    }
    query
}

// Escape a JQL string literal.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
