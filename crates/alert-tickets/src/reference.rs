/// Reference is the opaque, searchable token which links an issue back to
/// its alert group. It's the standard base64 encoding of the group key:
/// stable across restarts, injective, and free of JQL string metacharacters
/// such as quotes and backslashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Label which prefixes the reference within an issue description.
    pub const LABEL: &'static str = "jira_reference=";

    pub fn encode(group_key: &str) -> Self {
        Self(base64::encode(group_key.as_bytes()))
    }

    /// Recover the group key of this reference.
    pub fn decode(&self) -> anyhow::Result<String> {
        let bytes = base64::decode(&self.0)?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The literal token embedded in (and searched for within) descriptions.
    pub fn token(&self) -> String {
        format!("{}{}", Self::LABEL, self.0)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
