use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ArtifactContractsMap = BTreeMap<String, ArtifactContract>;
pub type CommandContractsMap = BTreeMap<String, CommandContract>;
pub type WorkflowContractsMap = BTreeMap<String, WorkflowContract>;
pub type RestRouteContractsMap = BTreeMap<String, RestRouteContract>;

/// Aggregate root of a plugin's declared surface.
///
/// Built once when the plugin is defined and never mutated afterwards. Hosts
/// receive a shared reference after discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginContracts {
    /// Version of the contracts document format, not of the plugin.
    pub schema: String,
    pub plugin_id: String,
    pub contracts_version: String,
    pub artifacts: ArtifactContractsMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<CommandContractsMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflows: Option<WorkflowContractsMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiContract>,
}

/// Closed set of artifact payload families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Json,
    Log,
    Binary,
    Text,
    Markdown,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Json,
        ArtifactKind::Log,
        ArtifactKind::Binary,
        ArtifactKind::Text,
        ArtifactKind::Markdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Json => "json",
            ArtifactKind::Log => "log",
            ArtifactKind::Binary => "binary",
            ArtifactKind::Text => "text",
            ArtifactKind::Markdown => "markdown",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Whether an example payload has the shape this kind of artifact carries.
    /// JSON artifacts hold documents; every other kind is textual (binary
    /// examples are base64 or a placeholder string).
    pub fn accepts_payload(&self, payload: &Value) -> bool {
        match self {
            ArtifactKind::Json => payload.is_object() || payload.is_array(),
            ArtifactKind::Log
            | ArtifactKind::Binary
            | ArtifactKind::Text
            | ArtifactKind::Markdown => payload.is_string(),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactContract {
    pub id: String,
    pub kind: ArtifactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<ArtifactExample>,
}

/// Documentation-only sample of an artifact payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub payload: Value,
}

/// Pointer to a schema held outside the manifest, e.g. a JSON Schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    #[serde(rename = "ref")]
    pub reference: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandContract {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<SchemaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<SchemaReference>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContract {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    pub steps: Vec<WorkflowStepContract>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepContract {
    pub id: String,
    pub command_id: String,
    #[serde(default)]
    pub produces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiContract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<RestApiContract>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiContract {
    pub base_path: String,
    pub routes: RestRouteContractsMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == tag)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestRouteContract {
    pub id: String,
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<SchemaReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<SchemaReference>,
    #[serde(default)]
    pub produces: Vec<String>,
}

impl RestRouteContract {
    /// Route path joined onto the api base path.
    pub fn full_path(&self, base_path: &str) -> String {
        format!("{}{}", base_path.trim_end_matches('/'), self.path)
    }
}
