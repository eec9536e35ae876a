use crate::TransitionOption;
use std::collections::BTreeMap;

/// Workflow state names which are treated as closed when
/// `allow_reopen_of_other_closed_states` is set, regardless of the
/// configured closed state. Stored lowercase.
pub const LEGACY_CLOSED_STATES: [&str; 4] = ["resolved", "closed", "done", "complete"];

/// The two states of an issue which reconciliation cares about,
/// independent of the workflow vocabulary of a particular board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalState {
    Alerting,
    Resolved,
}

impl LogicalState {
    /// Name of the instrumented store action which moves an issue into this state.
    pub fn action(&self) -> &'static str {
        match self {
            LogicalState::Alerting => "reopen",
            LogicalState::Resolved => "close",
        }
    }
}

/// The observed state of an issue, prior to reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    Absent,
    OpenLike,
    ClosedLike,
}

/// Transitions currently offered by an issue, keyed by lowercased name.
/// Lookups are case-insensitive exact matches: no prefix or fuzzy matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transitions(BTreeMap<String, String>);

impl Transitions {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<TransitionOption> for Transitions {
    fn from_iter<I: IntoIterator<Item = TransitionOption>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|TransitionOption { id, name }| (name.to_lowercase(), id))
                .collect(),
        )
    }
}

/// LogicalStateMap ties logical states to the workflow names of a board.
/// Each name is used both to recognize the current state of an issue and
/// to select the transition which reaches that state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalStateMap {
    pub alerting: String,
    pub resolved: String,
    pub other_closed_states: bool,
}

impl LogicalStateMap {
    pub fn name_of(&self, state: LogicalState) -> &str {
        match state {
            LogicalState::Alerting => &self.alerting,
            LogicalState::Resolved => &self.resolved,
        }
    }

    pub fn observe(&self, workflow_state: Option<&str>) -> Observed {
        let Some(workflow_state) = workflow_state else {
            return Observed::Absent;
        };

        if self.is_closed(workflow_state) {
            Observed::ClosedLike
        } else {
            Observed::OpenLike
        }
    }

    pub fn is_closed(&self, workflow_state: &str) -> bool {
        let workflow_state = workflow_state.to_lowercase();

        workflow_state == self.resolved.to_lowercase()
            || (self.other_closed_states
                && LEGACY_CLOSED_STATES.contains(&workflow_state.as_str()))
    }

    /// All workflow state names which count as closed, for query building.
    pub fn closed_names(&self) -> Vec<&str> {
        let mut names = vec![self.resolved.as_str()];
        if self.other_closed_states {
            for legacy in LEGACY_CLOSED_STATES {
                if !legacy.eq_ignore_ascii_case(&self.resolved) {
                    names.push(legacy);
                }
            }
        }
        names
    }

    /// Resolve the transition id which reaches `state`, if the issue offers one.
    pub fn resolve<'t>(&self, state: LogicalState, transitions: &'t Transitions) -> Option<&'t str> {
        transitions.get(self.name_of(state))
    }
}
