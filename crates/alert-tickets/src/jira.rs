use crate::{ContentFields, NewTicket, Ticket, TicketStore, TransitionOption};
use anyhow::Context;
use derivative::Derivative;

// Issue fields read by reconciliation.
const FIELDS: [&str; 5] = ["summary", "description", "status", "labels", "project"];

// Only the first match is used, but a few more let us log duplicates.
const MAX_RESULTS: u32 = 10;

/// JiraClient is a [`TicketStore`] backed by the Jira REST API (v2).
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct JiraClient {
    base_url: url::Url,
    username: String,
    #[derivative(Debug = "ignore")]
    password: String,
    #[derivative(Debug = "ignore")]
    http_client: reqwest::Client,
}

impl JiraClient {
    /// Build a client of the Jira server at `base_url`, using basic auth.
    /// Every request is bounded by `timeout`.
    pub fn new(
        mut base_url: url::Url,
        username: String,
        password: String,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;

        // API paths are joined relative to the base, which may have a context path.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            username,
            password,
            http_client,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<url::Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("joining {path} onto {}", self.base_url))
    }

    async fn execute(&self, builder: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let request = builder
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self
            .http_client
            .execute(request)
            .await
            .with_context(|| format!("{method} {url}"))?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{method} {url}: {status}: {body}");
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: &'a str,
    start_at: u32,
    max_results: u32,
    fields: &'a [&'a str],
}

#[derive(serde::Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(serde::Deserialize)]
struct Issue {
    id: String,
    key: String,
    fields: IssueFields,
}

#[derive(serde::Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<Named>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    project: Option<ProjectRef>,
}

#[derive(serde::Deserialize)]
struct Named {
    name: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ProjectRef {
    key: String,
}

impl From<Issue> for Ticket {
    fn from(issue: Issue) -> Self {
        let Issue {
            id,
            key,
            fields:
                IssueFields {
                    summary,
                    description,
                    status,
                    labels,
                    project,
                },
        } = issue;

        Ticket {
            id,
            key,
            summary: summary.unwrap_or_default(),
            description: description.unwrap_or_default(),
            status: status.map(|s| s.name).unwrap_or_default(),
            labels,
            project: project.map(|p| p.key).unwrap_or_default(),
        }
    }
}

#[derive(serde::Deserialize)]
struct TransitionsResponse {
    transitions: Vec<TransitionOption>,
}

#[derive(serde::Serialize)]
struct TransitionRequest<'a> {
    transition: IdRef<'a>,
}

#[derive(serde::Serialize)]
struct IdRef<'a> {
    id: &'a str,
}

#[derive(serde::Serialize)]
struct UpdateRequest<'a> {
    fields: &'a ContentFields,
}

#[derive(serde::Serialize)]
struct CreateRequest<'a> {
    fields: CreateFields<'a>,
}

#[derive(serde::Serialize)]
struct CreateFields<'a> {
    project: ProjectRef,
    summary: &'a str,
    description: &'a str,
    issuetype: IssueTypeRef<'a>,
    labels: &'a [String],
}

#[derive(serde::Serialize)]
struct IssueTypeRef<'a> {
    name: &'a str,
}

#[derive(serde::Deserialize)]
struct Created {
    id: String,
    key: String,
}

fn create_request(new: &NewTicket) -> CreateRequest<'_> {
    CreateRequest {
        fields: CreateFields {
            project: ProjectRef {
                key: new.project.clone(),
            },
            summary: &new.summary,
            description: &new.description,
            issuetype: IssueTypeRef {
                name: &new.issue_type,
            },
            labels: &new.labels,
        },
    }
}

impl TicketStore for JiraClient {
    async fn search<'s>(&'s self, query: &'s str) -> anyhow::Result<Vec<Ticket>> {
        let request = SearchRequest {
            jql: query,
            start_at: 0,
            max_results: MAX_RESULTS,
            fields: &FIELDS,
        };
        let SearchResponse { issues } = self
            .execute(
                self.http_client
                    .post(self.url("rest/api/2/search")?)
                    .json(&request),
            )
            .await?
            .json()
            .await
            .context("decoding search response")?;

        tracing::debug!(matches = issues.len(), "searched for issues");
        Ok(issues.into_iter().map(Into::into).collect())
    }

    async fn list_transitions<'s>(
        &'s self,
        ticket_id: &'s str,
    ) -> anyhow::Result<Vec<TransitionOption>> {
        let TransitionsResponse { transitions } = self
            .execute(
                self.http_client
                    .get(self.url(&format!("rest/api/2/issue/{ticket_id}/transitions"))?),
            )
            .await?
            .json()
            .await
            .context("decoding transitions response")?;

        Ok(transitions)
    }

    async fn apply_transition<'s>(
        &'s self,
        ticket_id: &'s str,
        transition_id: &'s str,
    ) -> anyhow::Result<()> {
        let request = TransitionRequest {
            transition: IdRef { id: transition_id },
        };
        self.execute(
            self.http_client
                .post(self.url(&format!("rest/api/2/issue/{ticket_id}/transitions"))?)
                .json(&request),
        )
        .await?;

        Ok(())
    }

    async fn update_fields<'s>(
        &'s self,
        ticket_id: &'s str,
        fields: &'s ContentFields,
    ) -> anyhow::Result<()> {
        self.execute(
            self.http_client
                .put(self.url(&format!("rest/api/2/issue/{ticket_id}"))?)
                .json(&UpdateRequest { fields }),
        )
        .await?;

        Ok(())
    }

    async fn create<'s>(&'s self, new: &'s NewTicket) -> anyhow::Result<Ticket> {
        let Created { id, key } = self
            .execute(
                self.http_client
                    .post(self.url("rest/api/2/issue")?)
                    .json(&create_request(new)),
            )
            .await?
            .json()
            .await
            .context("decoding create response")?;

        Ok(Ticket {
            id,
            key,
            summary: new.summary.clone(),
            description: new.description.clone(),
            status: String::new(),
            labels: new.labels.clone(),
            project: new.project.clone(),
        })
    }
}
