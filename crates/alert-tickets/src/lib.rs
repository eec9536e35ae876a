//! alert-tickets bridges Alertmanager webhook notifications to Jira.
//!
//! Every alert group (identified by Alertmanager's stable `groupKey`) is
//! tracked by at most one Jira issue. The issue is located through a
//! [`Reference`] embedded in its description, and each notification drives a
//! single reconciliation pass which may create the issue, transition it
//! between its open and closed workflow states, and always refreshes its
//! generated content last.
//!
//! Modules, roughly leaves first:
//! - `reference`: derives the searchable reference from a group key.
//! - `content`: merges generated content into a description while keeping
//!   whatever a human wrote above the boundary marker.
//! - `workflow`: case-insensitive transition lookup and the logical-state map.
//! - `locate`: the search query which finds the issue of a reference.
//! - `reconcile`: the decision table and the ordered side effects of a pass.
//! - `store` / `jira`: the ticket-store capability and its REST implementation.
//! - `api`: the axum surface which receives webhooks.
mod content;
mod error;
mod locate;
mod notification;
mod reconcile;
mod reference;
mod render;
mod store;
mod workflow;

pub mod api;
pub mod jira;
pub mod metrics;

#[cfg(test)]
mod testing;

pub use content::{BOUNDARY, creation_description, merge_description};
pub use error::Error;
pub use locate::search_query;
pub use notification::{AlertGroupNotification, AlertInstance, Payload, Status, Version};
pub use reconcile::{Action, Engine, Outcome, Target, decide};
pub use reference::Reference;
pub use render::{Content, Renderer};
pub use store::{ContentFields, NewTicket, Ticket, TicketStore, TransitionOption};
pub use workflow::{LEGACY_CLOSED_STATES, LogicalState, LogicalStateMap, Observed, Transitions};

/// Settings are the per-deployment knobs of the reconciliation engine.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Issue type of newly created issues.
    pub issue_type: String,
    /// Workflow state (and transition) name of the alerting logical state.
    pub open_state_name: String,
    /// Workflow state (and transition) name of the resolved logical state.
    pub closed_state_name: String,
    /// Also treat the common closed vocabulary (resolved, closed, done,
    /// complete) as closed, so that issues parked there are reopened.
    pub allow_reopen_of_other_closed_states: bool,
    /// Whether closed issues are matched when locating an issue. If not,
    /// a recurring incident opens a fresh issue.
    pub include_closed_in_search: bool,
    /// Upper bound on each individual ticket-store call.
    pub call_timeout: std::time::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            issue_type: "Task".to_string(),
            open_state_name: "Open".to_string(),
            closed_state_name: "Closed".to_string(),
            allow_reopen_of_other_closed_states: false,
            include_closed_in_search: true,
            call_timeout: std::time::Duration::from_secs(10),
        }
    }
}

impl Settings {
    pub fn logical_states(&self) -> LogicalStateMap {
        LogicalStateMap {
            alerting: self.open_state_name.clone(),
            resolved: self.closed_state_name.clone(),
            other_closed_states: self.allow_reopen_of_other_closed_states,
        }
    }
}
