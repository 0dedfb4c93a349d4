use std::fmt;

use thiserror::Error;

/// Machine-readable category of a single validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    /// A required field is absent.
    MissingField,
    /// A field holds the wrong JSON type.
    InvalidType,
    /// A string field that must carry text is empty.
    EmptyValue,
    /// `schema` names a contracts format this crate does not understand.
    UnsupportedSchema,
    /// `contractsVersion` is not a semantic version.
    InvalidVersion,
    /// An enumerated tag (artifact kind, http method) is not recognised.
    UnknownVariant,
    /// A map key differs from the `id` of the entry stored under it.
    KeyMismatch,
    /// An identifier reference points at nothing declared in the manifest.
    DanglingReference,
    /// The same identifier appears twice where it must be unique.
    Duplicate,
    /// A workflow step produces an artifact its command never declares.
    NotProducedByCommand,
    /// A workflow's aggregate `produces` differs from the union of its steps.
    AggregateMismatch,
    /// A workflow declares no steps.
    EmptySteps,
    /// A route or base path does not start with `/`.
    InvalidPath,
    /// An example payload does not fit the artifact kind.
    PayloadMismatch,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingField => "missing_field",
            IssueCode::InvalidType => "invalid_type",
            IssueCode::EmptyValue => "empty_value",
            IssueCode::UnsupportedSchema => "unsupported_schema",
            IssueCode::InvalidVersion => "invalid_version",
            IssueCode::UnknownVariant => "unknown_variant",
            IssueCode::KeyMismatch => "key_mismatch",
            IssueCode::DanglingReference => "dangling_reference",
            IssueCode::Duplicate => "duplicate",
            IssueCode::NotProducedByCommand => "not_produced_by_command",
            IssueCode::AggregateMismatch => "aggregate_mismatch",
            IssueCode::EmptySteps => "empty_steps",
            IssueCode::InvalidPath => "invalid_path",
            IssueCode::PayloadMismatch => "payload_mismatch",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated rule, located by a dotted path such as
/// `commands.template:hello.produces[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.message, self.code)
    }
}

/// Every rule a candidate manifest broke, gathered in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any issue is reported at exactly `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin contracts are invalid ({} issue(s)):", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Identifier namespaces a manifest declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Artifact,
    Command,
    Workflow,
    Route,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Artifact => "artifact",
            Namespace::Command => "command",
            Namespace::Workflow => "workflow",
            Namespace::Route => "route",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when code asks for a checked identifier the manifest never declares.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{namespace} `{id}` is not declared in the plugin contracts")]
pub struct LookupError {
    pub namespace: Namespace,
    pub id: String,
}
