/// Ticket is an issue as read from the ticket store. Its workflow state is
/// read fresh on every reconciliation pass and never cached across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub description: String,
    /// Name of the issue's current workflow state, as named by its board.
    pub status: String,
    pub labels: Vec<String>,
    pub project: String,
}

/// A workflow transition which an issue currently offers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct TransitionOption {
    pub id: String,
    pub name: String,
}

/// Fields which are overwritten on every update.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContentFields {
    pub summary: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
    pub labels: Vec<String>,
}

/// TicketStore is the capability set reconciliation requires of an issue
/// tracker. Implementations perform exactly one bounded request per call
/// and never retry.
pub trait TicketStore: std::fmt::Debug + Send + Sync + 'static {
    /// Search for issues matching `query`, in the store's default order.
    fn search<'s>(
        &'s self,
        query: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<Ticket>>> + Send + 's;

    fn list_transitions<'s>(
        &'s self,
        ticket_id: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<TransitionOption>>> + Send + 's;

    fn apply_transition<'s>(
        &'s self,
        ticket_id: &'s str,
        transition_id: &'s str,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;

    fn update_fields<'s>(
        &'s self,
        ticket_id: &'s str,
        fields: &'s ContentFields,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send + 's;

    fn create<'s>(
        &'s self,
        ticket: &'s NewTicket,
    ) -> impl std::future::Future<Output = anyhow::Result<Ticket>> + Send + 's;
}
