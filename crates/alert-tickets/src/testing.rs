//! In-memory ticket store which records every call, simulates a simple
//! workflow, and can be told to fail or hang on particular calls.
use crate::{
    AlertGroupNotification, BOUNDARY, ContentFields, NewTicket, Payload, Reference, Status,
    Ticket, TicketStore, TransitionOption, creation_description,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search(String),
    ListTransitions(String),
    ApplyTransition(String, String),
    Update(String, ContentFields),
    Create(NewTicket),
}

#[derive(Debug)]
struct Edge {
    from: String,
    id: String,
    name: String,
    to: String,
}

#[derive(Debug, Default)]
struct Inner {
    tickets: Vec<Ticket>,
    edges: Vec<Edge>,
    calls: Vec<Call>,
    failing: Vec<&'static str>,
    hanging: Vec<&'static str>,
    next_id: u32,
}

/// Clones share the same state, so tests can keep a handle on a store
/// which was moved into an engine.
#[derive(Debug, Default, Clone)]
pub struct FakeStore {
    inner: Arc<Mutex<Inner>>,
}

/// Build a validated notification of `group_key`.
pub fn notification(group_key: &str, status: Status) -> AlertGroupNotification {
    let status = match status {
        Status::Firing => "firing",
        Status::Resolved => "resolved",
    };
    let payload: Payload = serde_json::from_value(serde_json::json!({
        "version": "4",
        "groupKey": group_key,
        "status": status,
        "groupLabels": {"alertname": "DiskFull"},
        "commonAnnotations": {"summary": format!("Disk is full on {group_key}")},
        "alerts": [{
            "status": status,
            "labels": {"alertname": "DiskFull", "instance": "db-1"},
            "annotations": {},
            "generatorURL": "http://prometheus/graph",
        }],
    }))
    .unwrap();

    AlertGroupNotification::parse(payload).unwrap()
}

impl FakeStore {
    /// Insert an issue for `group_key`, with an optional human-written prefix.
    pub fn insert(&self, group_key: &str, status: &str, human: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let n = inner.next_id;

        let generated = creation_description(
            BOUNDARY,
            &format!("\n\n{}\n", Reference::encode(group_key).token()),
        );
        let description = if human.is_empty() {
            generated
        } else {
            format!("{human}\n\n{generated}")
        };

        inner.tickets.push(Ticket {
            id: format!("{}", 10000 + n),
            key: format!("OPS-{n}"),
            summary: "old summary".to_string(),
            description,
            status: status.to_string(),
            labels: vec!["alert".to_string(), "storage".to_string()],
            project: "OPS".to_string(),
        });
    }

    /// Offer a transition named `name` from workflow state `from` into `to`.
    pub fn offer(&self, from: &str, id: &str, name: &str, to: &str) {
        self.inner.lock().unwrap().edges.push(Edge {
            from: from.to_string(),
            id: id.to_string(),
            name: name.to_string(),
            to: to.to_string(),
        });
    }

    pub fn fail_on(&self, method: &'static str) {
        self.inner.lock().unwrap().failing.push(method);
    }

    pub fn hang_on(&self, method: &'static str) {
        self.inner.lock().unwrap().hanging.push(method);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.inner.lock().unwrap().calls)
    }

    /// Workflow state of the first issue of `group_key`.
    pub fn status_of(&self, group_key: &str) -> Option<String> {
        let token = Reference::encode(group_key).token();
        self.inner
            .lock()
            .unwrap()
            .tickets
            .iter()
            .find(|t| t.description.contains(&token))
            .map(|t| t.status.clone())
    }

    // Record `call`, returning whether `method` should hang or fail.
    fn enter(&self, method: &'static str, call: Call) -> (bool, bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        (
            inner.hanging.contains(&method),
            inner.failing.contains(&method),
        )
    }

    async fn gate(&self, method: &'static str, call: Call) -> anyhow::Result<()> {
        let (hang, fail) = self.enter(method, call);
        if hang {
            std::future::pending::<()>().await;
        }
        if fail {
            anyhow::bail!("injected {method} failure");
        }
        Ok(())
    }
}

impl TicketStore for FakeStore {
    async fn search<'s>(&'s self, query: &'s str) -> anyhow::Result<Vec<Ticket>> {
        self.gate("search", Call::Search(query.to_string())).await?;

        let token = query
            .split_once(Reference::LABEL)
            .and_then(|(_, rest)| rest.split_once('"'))
            .map(|(reference, _)| format!("{}{reference}", Reference::LABEL))
            .ok_or_else(|| anyhow::anyhow!("query has no reference: {query}"))?;
        let excluded = query
            .split_once(" and status not in (")
            .map(|(_, rest)| rest.to_string());

        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.description.contains(&token))
            .filter(|t| match &excluded {
                Some(excluded) => !excluded.contains(&format!("\"{}\"", t.status)),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn list_transitions<'s>(
        &'s self,
        ticket_id: &'s str,
    ) -> anyhow::Result<Vec<TransitionOption>> {
        self.gate("list_transitions", Call::ListTransitions(ticket_id.to_string()))
            .await?;

        let inner = self.inner.lock().unwrap();
        let ticket = inner
            .tickets
            .iter()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| anyhow::anyhow!("no issue {ticket_id}"))?;

        Ok(inner
            .edges
            .iter()
            .filter(|e| e.from == ticket.status)
            .map(|e| TransitionOption {
                id: e.id.clone(),
                name: e.name.clone(),
            })
            .collect())
    }

    async fn apply_transition<'s>(
        &'s self,
        ticket_id: &'s str,
        transition_id: &'s str,
    ) -> anyhow::Result<()> {
        self.gate(
            "apply_transition",
            Call::ApplyTransition(ticket_id.to_string(), transition_id.to_string()),
        )
        .await?;

        let mut inner = self.inner.lock().unwrap();
        let Inner { tickets, edges, .. } = &mut *inner;

        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| anyhow::anyhow!("no issue {ticket_id}"))?;
        let edge = edges
            .iter()
            .find(|e| e.from == ticket.status && e.id == transition_id)
            .ok_or_else(|| anyhow::anyhow!("transition {transition_id} is not valid"))?;

        ticket.status = edge.to.clone();
        Ok(())
    }

    async fn update_fields<'s>(
        &'s self,
        ticket_id: &'s str,
        fields: &'s ContentFields,
    ) -> anyhow::Result<()> {
        self.gate(
            "update",
            Call::Update(ticket_id.to_string(), fields.clone()),
        )
        .await?;

        let mut inner = self.inner.lock().unwrap();
        let ticket = inner
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| anyhow::anyhow!("no issue {ticket_id}"))?;

        ticket.summary = fields.summary.clone();
        ticket.description = fields.description.clone();
        Ok(())
    }

    async fn create<'s>(&'s self, new: &'s NewTicket) -> anyhow::Result<Ticket> {
        self.gate("create", Call::Create(new.clone())).await?;

        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let n = inner.next_id;

        let ticket = Ticket {
            id: format!("{}", 10000 + n),
            key: format!("{}-{n}", new.project),
            summary: new.summary.clone(),
            description: new.description.clone(),
            status: "Open".to_string(),
            labels: new.labels.clone(),
            project: new.project.clone(),
        };
        inner.tickets.push(ticket.clone());
        Ok(ticket)
    }
}
