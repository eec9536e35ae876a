use crate::{
    AlertGroupNotification, BOUNDARY, Content, ContentFields, Error, LogicalState,
    LogicalStateMap, NewTicket, Observed, Reference, Renderer, Settings, Status, Ticket,
    TicketStore, Transitions, creation_description, locate, merge_description, metrics,
};

/// Action is the decision taken for one notification, given the observed
/// state of its issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// File a new issue in the board's initial state.
    Create,
    /// Nothing to do: the incident resolved without ever being filed.
    Skip,
    /// Refresh generated content only.
    Update,
    /// Move the issue into a logical state, then refresh its content.
    TransitionThenUpdate(LogicalState),
}

/// Decide what to do about an issue which is `observed`, for an alert group
/// which is now `status`. Re-delivering the same notification after its
/// effects have been applied always yields `Update`.
pub fn decide(observed: Observed, status: Status) -> Action {
    match (observed, status) {
        (Observed::Absent, Status::Firing) => Action::Create,
        (Observed::Absent, Status::Resolved) => Action::Skip,
        (Observed::OpenLike, Status::Firing) => Action::Update,
        (Observed::OpenLike, Status::Resolved) => {
            Action::TransitionThenUpdate(LogicalState::Resolved)
        }
        (Observed::ClosedLike, Status::Firing) => {
            Action::TransitionThenUpdate(LogicalState::Alerting)
        }
        (Observed::ClosedLike, Status::Resolved) => Action::Update,
    }
}

/// Where new issues of a notification are filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub project: String,
    pub team: String,
}

/// Outcome of a successful reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { key: String },
    Skipped,
    Updated {
        key: String,
        /// Logical state the issue was transitioned into, if any.
        transitioned: Option<LogicalState>,
    },
}

impl Outcome {
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Created { .. } => "created",
            Outcome::Skipped => "skipped",
            Outcome::Updated {
                transitioned: None, ..
            } => "updated",
            Outcome::Updated {
                transitioned: Some(LogicalState::Resolved),
                ..
            } => "closed",
            Outcome::Updated {
                transitioned: Some(LogicalState::Alerting),
                ..
            } => "reopened",
        }
    }
}

/// Engine runs reconciliation passes against a ticket store.
///
/// Passes for different alert groups may run concurrently. Nothing here
/// serializes passes of the same group: concurrent deliveries of one group
/// can race, and we rely on the webhook sender rarely doing that.
#[derive(Debug)]
pub struct Engine<S> {
    store: S,
    settings: Settings,
    states: LogicalStateMap,
    renderer: Renderer,
}

impl<S: TicketStore> Engine<S> {
    pub fn new(store: S, settings: Settings) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            states: settings.logical_states(),
            settings,
            renderer: Renderer::try_new()?,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one reconciliation pass for `notification`.
    ///
    /// Side effects are ordered: a transition always precedes the content
    /// update, and any failure aborts the rest of the pass without undoing
    /// what was already applied.
    #[tracing::instrument(
        skip_all,
        fields(
            project = %target.project,
            team = %target.team,
            group_key = %notification.group_key,
            status = ?notification.status,
            reference = tracing::field::Empty,
        )
    )]
    pub async fn reconcile(
        &self,
        target: &Target,
        notification: &AlertGroupNotification,
    ) -> Result<Outcome, Error> {
        let reference = Reference::encode(&notification.group_key);
        tracing::Span::current().record("reference", reference.as_str());

        let content = self.renderer.render(notification, &reference)?;
        let ticket = self.locate(&reference).await?;

        let observed = self
            .states
            .observe(ticket.as_ref().map(|t| t.status.as_str()));
        let action = decide(observed, notification.status);
        tracing::debug!(?observed, ?action, "decided reconciliation action");

        let (ticket, state) = match (action, ticket) {
            (Action::Skip, _) => {
                tracing::info!("alert group resolved without an issue, nothing to do");
                return Ok(Outcome::Skipped);
            }
            (Action::Create, _) | (_, None) => return self.create(target, content).await,
            (Action::Update, Some(ticket)) => (ticket, None),
            (Action::TransitionThenUpdate(state), Some(ticket)) => (ticket, Some(state)),
        };

        let transitioned = match state {
            Some(state) => self.transition(&ticket, state).await?,
            None => None,
        };
        self.update(&ticket, content).await?;

        Ok(Outcome::Updated {
            key: ticket.key,
            transitioned,
        })
    }

    /// Locate the issue of `reference`, if there is one.
    async fn locate(&self, reference: &Reference) -> Result<Option<Ticket>, Error> {
        let query = locate::search_query(
            reference,
            &self.states,
            self.settings.include_closed_in_search,
        );
        let tickets = self.query("search", self.store.search(&query)).await?;

        if tickets.len() > 1 {
            // Not expected, but not fatal either: take the store's first.
            tracing::warn!(
                matches = tickets.len(),
                keys = ?tickets.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
                "multiple issues match the alert group reference, using the first"
            );
        }
        Ok(tickets.into_iter().next())
    }

    // Attempt to move `ticket` into `state`, returning whether it was moved.
    // A board which doesn't offer the transition is not an error.
    async fn transition(
        &self,
        ticket: &Ticket,
        state: LogicalState,
    ) -> Result<Option<LogicalState>, Error> {
        tracing::info!(key = %ticket.key, "requesting a list of transitions");
        let transitions: Transitions = self
            .query("transitions", self.store.list_transitions(&ticket.id))
            .await?
            .into_iter()
            .collect();

        let name = self.states.name_of(state);
        let Some(transition_id) = self.states.resolve(state, &transitions) else {
            tracing::warn!(
                key = %ticket.key,
                current = %ticket.status,
                transition = %name,
                available = ?transitions.names().collect::<Vec<_>>(),
                "issue doesn't offer the configured transition, updating content only"
            );
            return Ok(None);
        };

        tracing::info!(key = %ticket.key, %transition_id, transition = %name, "transitioning issue");
        self.mutate(
            state.action(),
            self.store.apply_transition(&ticket.id, transition_id),
        )
        .await?;

        Ok(Some(state))
    }

    async fn update(&self, ticket: &Ticket, content: Content) -> Result<(), Error> {
        tracing::info!(key = %ticket.key, "issue was found, updating");

        let Content {
            summary,
            description,
        } = content;
        let fields = ContentFields {
            summary,
            description: merge_description(&ticket.description, BOUNDARY, &description),
        };
        self.mutate("update", self.store.update_fields(&ticket.id, &fields))
            .await
    }

    async fn create(&self, target: &Target, content: Content) -> Result<Outcome, Error> {
        tracing::info!(
            issue_type = %self.settings.issue_type,
            "no issue found, creating one"
        );

        let Content {
            summary,
            description,
        } = content;
        let new = NewTicket {
            project: target.project.clone(),
            issue_type: self.settings.issue_type.clone(),
            summary,
            description: creation_description(BOUNDARY, &description),
            labels: vec![locate::ALERT_LABEL.to_string(), target.team.clone()],
        };
        let created = self.mutate("create", self.store.create(&new)).await?;

        tracing::info!(key = %created.key, "created issue");
        Ok(Outcome::Created { key: created.key })
    }

    async fn query<T>(
        &self,
        action: &'static str,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<T, Error> {
        self.bounded(action, fut)
            .await?
            .map_err(|source| Error::StoreQuery { action, source })
    }

    async fn mutate<T>(
        &self,
        action: &'static str,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<T, Error> {
        self.bounded(action, fut)
            .await?
            .map_err(|source| Error::StoreMutation { action, source })
    }

    // Run an instrumented store call under the per-call timeout.
    // Expiry is a query error whatever the kind of call.
    async fn bounded<T>(
        &self,
        action: &'static str,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<anyhow::Result<T>, Error> {
        let timeout = self.settings.call_timeout;

        metrics::timed(action, tokio::time::timeout(timeout, fut))
            .await
            .map_err(|_elapsed| Error::StoreQuery {
                action,
                source: anyhow::anyhow!(
                    "ticket store call timed out after {}",
                    humantime::format_duration(timeout)
                ),
            })
    }
}
