use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use template_contracts::{
    parse_contracts, template_contracts, IssueCode, Namespace, PluginContracts,
};

fn minimal() -> Value {
    json!({
        "schema": "kb.contracts/1",
        "pluginId": "p",
        "contractsVersion": "0.1.0",
        "artifacts": {
            "a.b": { "id": "a.b", "kind": "json", "pathPattern": "x" }
        },
        "commands": {
            "c:d": { "id": "c:d", "produces": ["a.b"] }
        }
    })
}

fn reparse(contracts: &PluginContracts) -> PluginContracts {
    let value = serde_json::to_value(contracts).unwrap();
    parse_contracts(&value).unwrap()
}

#[test]
fn shipped_manifest_is_valid() {
    let value = serde_json::to_value(template_contracts()).unwrap();
    let parsed = parse_contracts(&value).unwrap();
    assert_eq!(parsed, template_contracts());
}

#[test]
fn validation_is_idempotent_across_serialization() {
    let first = parse_contracts(&minimal()).unwrap();
    assert_eq!(reparse(&first), first);

    let shipped = template_contracts();
    assert_eq!(reparse(&reparse(&shipped)), shipped);
}

#[test]
fn dangling_command_output_is_located() {
    let mut doc = minimal();
    doc["commands"]["c:d"]["produces"] = json!(["a.missing"]);
    let failure = parse_contracts(&doc).unwrap_err();
    assert_eq!(failure.len(), 1);
    let issue = &failure.issues[0];
    assert_eq!(issue.code, IssueCode::DanglingReference);
    assert_eq!(issue.path, "commands.c:d.produces[0]");
}

#[test]
fn dangling_consumes_is_never_dropped() {
    let mut doc = minimal();
    doc["commands"]["c:d"]["consumes"] = json!(["a.b", "a.input"]);
    let failure = parse_contracts(&doc).unwrap_err();
    assert!(failure.has_path("commands.c:d.consumes[1]"));
}

#[test]
fn mismatched_keys_are_rejected() {
    let mut doc = minimal();
    doc["artifacts"]["a.b"]["id"] = json!("a.c");
    doc["commands"]["c:d"]["id"] = json!("c:e");
    doc["workflows"] = json!({
        "w": {
            "id": "w.other",
            "produces": ["a.b"],
            "steps": [ { "id": "s", "commandId": "c:d", "produces": ["a.b"] } ]
        }
    });
    doc["api"] = json!({
        "rest": {
            "basePath": "/v1/plugins/p",
            "routes": {
                "r": { "id": "r.other", "method": "GET", "path": "/r" }
            }
        }
    });
    let failure = parse_contracts(&doc).unwrap_err();
    let mismatches: Vec<_> = failure
        .issues
        .iter()
        .filter(|issue| issue.code == IssueCode::KeyMismatch)
        .map(|issue| issue.path.as_str())
        .collect();
    assert_eq!(
        mismatches,
        vec![
            "artifacts.a.b.id",
            "commands.c:d.id",
            "workflows.w.id",
            "api.rest.routes.r.id",
        ]
    );
    assert_eq!(failure.len(), 4);
}

#[test]
fn every_violation_is_accumulated() {
    let mut doc = minimal();
    doc.as_object_mut().unwrap().remove("pluginId");
    doc["commands"]["c:d"]["produces"] = json!(["a.gone", "a.lost"]);
    let failure = parse_contracts(&doc).unwrap_err();
    let paths: Vec<_> = failure.issues.iter().map(|issue| issue.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["pluginId", "commands.c:d.produces[0]", "commands.c:d.produces[1]"]
    );
}

#[test]
fn has_and_get_agree_for_every_id() {
    let contracts = template_contracts();
    let probes = [
        "template.hello.greeting",
        "template.hello.log",
        "template:hello",
        "template.rest.hello",
        "template.workflow.hello",
        "",
        "nonexistent:id",
    ];
    for id in probes {
        assert_eq!(contracts.has_artifact(id), contracts.artifact(id).is_some(), "{id}");
        assert_eq!(contracts.has_command(id), contracts.command(id).is_some(), "{id}");
        assert_eq!(contracts.has_route(id), contracts.route(id).is_some(), "{id}");
        assert_eq!(contracts.has_workflow(id), contracts.workflow(id).is_some(), "{id}");
    }
}

#[test]
fn command_id_resolves_or_fails() {
    let contracts = template_contracts();
    let err = contracts.command_id("nonexistent:id").unwrap_err();
    assert_eq!(err.namespace, Namespace::Command);
    assert_eq!(err.id, "nonexistent:id");

    let id = contracts.command_id("template:hello").unwrap();
    assert_eq!(id.as_str(), "template:hello");
}

#[test]
fn artifact_id_requires_declaration() {
    let contracts = parse_contracts(&minimal()).unwrap();
    assert_eq!(contracts.artifact_id("a.b").unwrap().as_str(), "a.b");
    assert!(contracts.artifact_id("a.c").is_err());
    assert!(contracts.route_id("anything").is_err());
}
