use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::types::{
    ApiContract, ArtifactContract, ArtifactExample, ArtifactKind, CommandContract, HttpMethod,
    PluginContracts, RestApiContract, RestRouteContract, SchemaReference, WorkflowContract,
    WorkflowStepContract,
};

/// Contracts document format understood by this crate.
pub const CONTRACTS_SCHEMA_ID: &str = "kb.contracts/1";
/// Version of the template plugin's contract surface.
pub const CONTRACTS_VERSION: &str = "0.1.0";
pub const PLUGIN_ID: &str = "plugin-template";

const SCHEMA_DOC: &str = "plugin-template-contracts/schema";

/// Builds the template plugin's manifest.
///
/// The value is constructed once by whoever wires the plugin (the CLI entry
/// point, a host loader) and shared read-only from then on.
pub fn template_contracts() -> PluginContracts {
    let greeting = ArtifactContract::new(
        "template.hello.greeting",
        ArtifactKind::Json,
        "artifacts/template/hello/greeting.json",
    )
    .describe("Machine-readable greeting payload returned by the hello surfaces.")
    .media_type("application/json")
    .schema_ref(format!("{SCHEMA_DOC}#HelloGreeting"))
    .example(
        "Greeting payload for anonymous user",
        json!({ "message": "Hello, World!", "target": "World" }),
    );

    let log = ArtifactContract::new(
        "template.hello.log",
        ArtifactKind::Log,
        "logs/template/hello/run.log",
    )
    .describe("Execution log for hello command/workflow.")
    .media_type("text/plain");

    let produced = vec![greeting.id.clone(), log.id.clone()];

    let hello = CommandContract {
        id: "template:hello".into(),
        description: Some(
            "Produce a greeting message optionally targeting a provided name.".into(),
        ),
        input: Some(SchemaReference::json_schema(format!("{SCHEMA_DOC}#HelloCommandInput"))),
        output: Some(SchemaReference::json_schema(format!("{SCHEMA_DOC}#HelloCommandOutput"))),
        produces: produced.clone(),
        consumes: None,
        examples: vec![
            "plugin-template hello".into(),
            "plugin-template hello --name Dev".into(),
            "plugin-template hello --json".into(),
        ],
    };

    let workflow = WorkflowContract {
        id: "template.workflow.hello".into(),
        description: Some(
            "Single-step workflow executing the hello command and emitting greeting artifacts."
                .into(),
        ),
        produces: produced.clone(),
        steps: vec![WorkflowStepContract {
            id: "template.workflow.hello.step.run-command".into(),
            command_id: hello.id.clone(),
            produces: produced,
        }],
    };

    let route = RestRouteContract {
        id: "template.rest.hello".into(),
        method: HttpMethod::Get,
        path: "/hello".into(),
        description: Some("Return a greeting payload from the REST surface.".into()),
        input: Some(SchemaReference::json_schema(format!("{SCHEMA_DOC}#HelloRequest"))),
        output: Some(SchemaReference::json_schema(format!("{SCHEMA_DOC}#HelloCommandOutput"))),
        produces: vec![greeting.id.clone()],
    };

    PluginContracts {
        schema: CONTRACTS_SCHEMA_ID.into(),
        plugin_id: PLUGIN_ID.into(),
        contracts_version: CONTRACTS_VERSION.into(),
        artifacts: keyed([greeting, log], |a| &a.id),
        commands: Some(keyed([hello], |c| &c.id)),
        workflows: Some(keyed([workflow], |w| &w.id)),
        api: Some(ApiContract {
            rest: Some(RestApiContract {
                base_path: "/v1/plugins/template".into(),
                routes: keyed([route], |r| &r.id),
            }),
        }),
    }
}

fn keyed<T, const N: usize>(items: [T; N], id: impl Fn(&T) -> &String) -> BTreeMap<String, T> {
    items
        .into_iter()
        .map(|item| (id(&item).clone(), item))
        .collect()
}

impl ArtifactContract {
    pub fn new(id: impl Into<String>, kind: ArtifactKind, path_pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            description: None,
            path_pattern: path_pattern.into(),
            media_type: None,
            schema_ref: None,
            example: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn schema_ref(mut self, schema_ref: impl Into<String>) -> Self {
        self.schema_ref = Some(schema_ref.into());
        self
    }

    pub fn example(mut self, summary: impl Into<String>, payload: Value) -> Self {
        self.example = Some(ArtifactExample {
            summary: Some(summary.into()),
            payload,
        });
        self
    }
}

impl SchemaReference {
    pub fn json_schema(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            format: "json-schema".into(),
        }
    }
}
