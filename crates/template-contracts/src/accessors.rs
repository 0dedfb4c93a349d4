//! Identifier lookups over a validated manifest.

use std::{fmt, marker::PhantomData};

use serde::{Serialize, Serializer};

use crate::{
    error::{LookupError, Namespace},
    types::{
        ArtifactContract, CommandContract, PluginContracts, RestRouteContract, WorkflowContract,
    },
};

/// Marker for an identifier namespace.
pub trait IdNamespace {
    const NAMESPACE: Namespace;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Artifacts {}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Commands {}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Workflows {}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Routes {}

impl IdNamespace for Artifacts {
    const NAMESPACE: Namespace = Namespace::Artifact;
}

impl IdNamespace for Commands {
    const NAMESPACE: Namespace = Namespace::Command;
}

impl IdNamespace for Workflows {
    const NAMESPACE: Namespace = Namespace::Workflow;
}

impl IdNamespace for Routes {
    const NAMESPACE: Namespace = Namespace::Route;
}

/// An identifier confirmed to be declared in the manifest it was resolved
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckedId<N> {
    id: String,
    _namespace: PhantomData<N>,
}

pub type ArtifactId = CheckedId<Artifacts>;
pub type CommandId = CheckedId<Commands>;
pub type WorkflowId = CheckedId<Workflows>;
pub type RouteId = CheckedId<Routes>;

impl<N: IdNamespace> CheckedId<N> {
    fn resolved(id: &str) -> Self {
        Self {
            id: id.to_string(),
            _namespace: PhantomData,
        }
    }

    fn lookup(id: &str, declared: bool) -> Result<Self, LookupError> {
        if declared {
            Ok(Self::resolved(id))
        } else {
            Err(LookupError {
                namespace: N::NAMESPACE,
                id: id.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> Namespace {
        N::NAMESPACE
    }
}

impl<N> AsRef<str> for CheckedId<N> {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

impl<N> fmt::Display for CheckedId<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl<N> PartialEq<str> for CheckedId<N> {
    fn eq(&self, other: &str) -> bool {
        self.id == other
    }
}

impl<N> PartialEq<&str> for CheckedId<N> {
    fn eq(&self, other: &&str) -> bool {
        self.id == *other
    }
}

impl<N> Serialize for CheckedId<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

impl PluginContracts {
    pub fn artifact(&self, id: &str) -> Option<&ArtifactContract> {
        self.artifacts.get(id)
    }

    pub fn has_artifact(&self, id: &str) -> bool {
        self.artifact(id).is_some()
    }

    pub fn artifact_id(&self, id: &str) -> Result<ArtifactId, LookupError> {
        CheckedId::lookup(id, self.has_artifact(id))
    }

    /// Declared output location of an artifact.
    pub fn artifact_path(&self, id: &str) -> Option<&str> {
        self.artifact(id).map(|artifact| artifact.path_pattern.as_str())
    }

    pub fn command(&self, id: &str) -> Option<&CommandContract> {
        self.commands.as_ref()?.get(id)
    }

    pub fn has_command(&self, id: &str) -> bool {
        self.command(id).is_some()
    }

    pub fn command_id(&self, id: &str) -> Result<CommandId, LookupError> {
        CheckedId::lookup(id, self.has_command(id))
    }

    pub fn workflow(&self, id: &str) -> Option<&WorkflowContract> {
        self.workflows.as_ref()?.get(id)
    }

    pub fn has_workflow(&self, id: &str) -> bool {
        self.workflow(id).is_some()
    }

    pub fn workflow_id(&self, id: &str) -> Result<WorkflowId, LookupError> {
        CheckedId::lookup(id, self.has_workflow(id))
    }

    pub fn route(&self, id: &str) -> Option<&RestRouteContract> {
        self.api.as_ref()?.rest.as_ref()?.routes.get(id)
    }

    pub fn has_route(&self, id: &str) -> bool {
        self.route(id).is_some()
    }

    pub fn route_id(&self, id: &str) -> Result<RouteId, LookupError> {
        CheckedId::lookup(id, self.has_route(id))
    }

    /// REST base path, when the plugin exposes a REST api.
    pub fn rest_base_path(&self) -> Option<&str> {
        Some(self.api.as_ref()?.rest.as_ref()?.base_path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::template_contracts;

    #[test]
    fn checked_ids_echo_the_declared_id() {
        let contracts = template_contracts();
        let id = contracts.command_id("template:hello").unwrap();
        assert_eq!(id.as_str(), "template:hello");
        assert_eq!(id.namespace(), Namespace::Command);
        assert_eq!(serde_json::to_value(&id).unwrap(), "template:hello");
    }

    #[test]
    fn undeclared_route_fails_loudly() {
        let contracts = template_contracts();
        let err = contracts.route_id("template.rest.missing").unwrap_err();
        assert_eq!(err.namespace, Namespace::Route);
        assert_eq!(err.id, "template.rest.missing");
    }

    #[test]
    fn workflow_ids_resolve_in_their_own_namespace() {
        let contracts = template_contracts();
        let id = contracts.workflow_id("template.workflow.hello").unwrap();
        assert_eq!(id.namespace(), Namespace::Workflow);

        let err = contracts.workflow_id("template:hello").unwrap_err();
        assert_eq!(err.namespace, Namespace::Workflow);
        assert_eq!(
            err.to_string(),
            "workflow `template:hello` is not declared in the plugin contracts"
        );
    }

    #[test]
    fn lookups_without_optional_sections_are_absent() {
        let mut contracts = template_contracts();
        contracts.commands = None;
        contracts.api = None;
        assert!(contracts.command("template:hello").is_none());
        assert!(!contracts.has_route("template.rest.hello"));
        assert!(contracts.rest_base_path().is_none());
    }

    #[test]
    fn artifact_path_returns_pattern() {
        let contracts = template_contracts();
        assert_eq!(
            contracts.artifact_path("template.hello.log"),
            Some("logs/template/hello/run.log")
        );
        assert_eq!(contracts.artifact_path("nope"), None);
    }
}
