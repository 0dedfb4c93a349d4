pub mod accessors;
pub mod error;
pub mod manifest;
pub mod types;
pub mod validate;

pub use accessors::{ArtifactId, CheckedId, CommandId, RouteId, WorkflowId};
pub use error::{IssueCode, LookupError, Namespace, ValidationFailure, ValidationIssue};
pub use manifest::{template_contracts, CONTRACTS_SCHEMA_ID, CONTRACTS_VERSION, PLUGIN_ID};
pub use types::{
    ApiContract, ArtifactContract, ArtifactExample, ArtifactKind, CommandContract, HttpMethod,
    PluginContracts, RestApiContract, RestRouteContract, SchemaReference, WorkflowContract,
    WorkflowStepContract,
};
pub use validate::{parse_contracts, parse_contracts_str};
