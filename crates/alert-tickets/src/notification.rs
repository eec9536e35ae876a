use crate::Error;
use indexmap::IndexMap;

/// Payload is the JSON body of an Alertmanager generic webhook.
/// Its `version` is checked by [`AlertGroupNotification::parse`] and
/// [`AlertGroupNotification::from_value`].
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub version: String,
    pub group_key: String,
    pub status: Status,
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub common_annotations: IndexMap<String, String>,
    #[serde(default)]
    pub common_labels: IndexMap<String, String>,
    #[serde(default)]
    pub group_labels: IndexMap<String, String>,
    #[serde(default, rename = "externalURL")]
    pub external_url: String,
    #[serde(default)]
    pub alerts: Vec<AlertInstance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Firing,
    Resolved,
}

/// Webhook payload versions we understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V3,
    V4,
}

impl std::str::FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3" => Ok(Version::V3),
            "4" => Ok(Version::V4),
            other => Err(Error::UnsupportedVersion(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInstance {
    pub status: Status,
    #[serde(default)]
    pub annotations: IndexMap<String, String>,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
}

/// AlertGroupNotification is a validated notification about one alert group.
/// It serializes in the webhook's own field naming, which is what the
/// content templates are written against.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertGroupNotification {
    #[serde(skip)]
    pub version: Version,
    pub group_key: String,
    pub status: Status,
    pub receiver: String,
    pub common_annotations: IndexMap<String, String>,
    pub common_labels: IndexMap<String, String>,
    pub group_labels: IndexMap<String, String>,
    #[serde(rename = "externalURL")]
    pub external_url: String,
    pub alerts: Vec<AlertInstance>,
}

impl AlertGroupNotification {
    pub fn parse(payload: Payload) -> Result<Self, Error> {
        let Payload {
            version,
            group_key,
            status,
            receiver,
            common_annotations,
            common_labels,
            group_labels,
            external_url,
            alerts,
        } = payload;

        Ok(Self {
            version: version.parse()?,
            group_key,
            status,
            receiver,
            common_annotations,
            common_labels,
            group_labels,
            external_url,
            alerts,
        })
    }

    /// Parse a webhook body. Its `version` is checked before any other field,
    /// so a body of an unsupported version is rejected as such even when it
    /// doesn't otherwise match [`Payload`].
    pub fn from_value(body: serde_json::Value) -> Result<Self, Error> {
        let version = body
            .get("version")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let _: Version = version.parse()?;

        let payload: Payload = serde_json::from_value(body).map_err(Error::MalformedPayload)?;
        Self::parse(payload)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn payload(version: &str) -> Payload {
        serde_json::from_value(payload_json(version)).unwrap()
    }

    fn payload_json(version: &str) -> serde_json::Value {
        json!({
            "version": version,
            "groupKey": "{}:{alertname=\"DiskFull\"}",
            "status": "firing",
            "receiver": "jira",
            "groupLabels": {"alertname": "DiskFull"},
            "commonAnnotations": {"summary": "Disk is full", "runbook": "https://runbooks/disk"},
            "alerts": [{
                "status": "firing",
                "labels": {"instance": "db-1", "alertname": "DiskFull"},
                "annotations": {"description": "95% used"},
                "generatorURL": "http://prometheus/graph?g0.expr=disk",
                "startsAt": "2024-01-01T00:00:00Z",
            }],
        })
    }

    #[test]
    fn test_parse_accepts_supported_versions() {
        let v3 = AlertGroupNotification::parse(payload("3")).unwrap();
        assert_eq!(v3.version, Version::V3);
        let v4 = AlertGroupNotification::parse(payload("4")).unwrap();
        assert_eq!(v4.version, Version::V4);

        assert_eq!(v4.status, Status::Firing);
        assert_eq!(v4.alerts[0].generator_url, "http://prometheus/graph?g0.expr=disk");
        assert_eq!(v4.common_labels.len(), 0);
    }

    #[test]
    fn test_parse_rejects_other_versions() {
        for version in ["2", "5", "", "v4"] {
            let err = AlertGroupNotification::parse(payload(version)).unwrap_err();
            assert!(
                matches!(&err, Error::UnsupportedVersion(v) if v == version),
                "{err:?}"
            );
        }
    }

    #[test]
    fn test_version_is_checked_before_the_body() {
        let err = AlertGroupNotification::from_value(
            json!({"version": "2", "status": "firing", "alerts": []}),
        )
        .unwrap_err();
        assert!(matches!(&err, Error::UnsupportedVersion(v) if v == "2"), "{err:?}");

        let err = AlertGroupNotification::from_value(json!({"status": "bogus"})).unwrap_err();
        assert!(matches!(&err, Error::UnsupportedVersion(v) if v.is_empty()), "{err:?}");

        let err = AlertGroupNotification::from_value(json!({"version": "4", "status": "firing"}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)), "{err:?}");

        let parsed = AlertGroupNotification::from_value(payload_json("3")).unwrap();
        assert_eq!(parsed.version, Version::V3);
    }

    #[test]
    fn test_maps_keep_document_order() {
        let payload: Payload = serde_json::from_str(
            r#"{
                "version": "4",
                "groupKey": "{}",
                "status": "firing",
                "commonAnnotations": {"summary": "Disk is full", "runbook": "https://runbooks/disk"},
                "alerts": [{
                    "status": "firing",
                    "labels": {"instance": "db-1", "alertname": "DiskFull"}
                }]
            }"#,
        )
        .unwrap();
        let parsed = AlertGroupNotification::parse(payload).unwrap();

        let keys: Vec<_> = parsed.common_annotations.keys().collect();
        assert_eq!(keys, vec!["summary", "runbook"]);

        let keys: Vec<_> = parsed.alerts[0].labels.keys().collect();
        assert_eq!(keys, vec!["instance", "alertname"]);
    }

    #[test]
    fn test_serializes_with_webhook_names() {
        let parsed = AlertGroupNotification::parse(payload("4")).unwrap();
        let value = serde_json::to_value(&parsed).unwrap();

        assert_eq!(value["groupKey"], "{}:{alertname=\"DiskFull\"}");
        assert_eq!(value["groupLabels"]["alertname"], "DiskFull");
        assert_eq!(value["alerts"][0]["generatorURL"], "http://prometheus/graph?g0.expr=disk");
        assert_eq!(value["alerts"][0]["status"], "firing");
        assert!(value.get("version").is_none());
    }
}
