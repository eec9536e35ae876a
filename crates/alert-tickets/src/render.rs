use crate::{AlertGroupNotification, Error, Reference};
use anyhow::Context;

const SUMMARY: &str = "summary";
const DESCRIPTION: &str = "description";

// Jira rejects summaries longer than this many characters.
const MAX_SUMMARY_CHARS: usize = 255;

const SUMMARY_TEMPLATE: &str = r#"{{#if commonAnnotations.summary}}{{commonAnnotations.summary}}{{else}}{{#each groupLabels}}{{@key}}="{{this}}" {{/each}}{{/if}}"#;

// Jira wiki markup. The trailing `alert_group_key` and `jira_reference`
// lines are durable: issues are located by searching for the latter.
const DESCRIPTION_TEMPLATE: &str = r#"

This issue tracks an Alertmanager alert group. Annotations shared by the whole
group come first, followed by each alert which is still firing. See
[grouping|https://prometheus.io/docs/alerting/latest/alertmanager/#grouping].

h2. Common annotations

{{#each commonAnnotations}}* *{{@key}}*: {{this}}
{{/each}}

h2. Firing alerts

{{#each alerts}}{{#if (eq status "firing")}}_Annotations_:
{{#each annotations}}* {{@key}} = {{this}}
{{/each}}_Labels_:
{{#each labels}}* {{@key}} = {{this}}
{{/each}}[Source|{{generatorURL}}]
----
{{/if}}{{/each}}


alert_group_key={{groupKey}}
jira_reference={{jiraReference}}
"#;

/// Generated content of an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub summary: String,
    /// Generated description suffix, placed below the boundary marker.
    pub description: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateData<'a> {
    #[serde(flatten)]
    notification: &'a AlertGroupNotification,
    jira_reference: &'a Reference,
}

/// Renderer turns notifications into issue summaries and descriptions.
#[derive(Debug)]
pub struct Renderer {
    reg: handlebars::Handlebars<'static>,
}

impl Renderer {
    pub fn try_new() -> anyhow::Result<Self> {
        let mut reg = handlebars::Handlebars::new();
        // Output is Jira markup, not HTML.
        reg.register_escape_fn(handlebars::no_escape);

        reg.register_template_string(SUMMARY, SUMMARY_TEMPLATE)
            .context("registering summary template")?;
        reg.register_template_string(DESCRIPTION, DESCRIPTION_TEMPLATE)
            .context("registering description template")?;

        Ok(Self { reg })
    }

    pub fn render(
        &self,
        notification: &AlertGroupNotification,
        reference: &Reference,
    ) -> Result<Content, Error> {
        let data = TemplateData {
            notification,
            jira_reference: reference,
        };

        let summary = self.reg.render(SUMMARY, &data)?;
        let summary = summary.trim_end().chars().take(MAX_SUMMARY_CHARS).collect();
        let description = self.reg.render(DESCRIPTION, &data)?;

        Ok(Content {
            summary,
            description,
        })
    }
}
