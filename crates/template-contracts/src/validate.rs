//! Single-pass validation of untyped contracts documents.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde_json::{Map, Value};

use crate::{
    error::{IssueCode, ValidationFailure, ValidationIssue},
    manifest::CONTRACTS_SCHEMA_ID,
    types::{ArtifactKind, HttpMethod, PluginContracts},
};

type Object = Map<String, Value>;

/// Validates `candidate` and returns the typed manifest, or every violation
/// found in it.
pub fn parse_contracts(candidate: &Value) -> Result<PluginContracts, ValidationFailure> {
    let Some(root) = candidate.as_object() else {
        return Err(single_issue(
            IssueCode::InvalidType,
            "contracts document must be a JSON object",
        ));
    };

    let mut validator = Validator::default();
    validator.check_header(root);
    let artifacts = validator.check_artifacts(root.get("artifacts"));
    let commands = validator.check_commands(root.get("commands"), &artifacts);
    validator.check_workflows(root.get("workflows"), &artifacts, &commands);
    validator.check_api(root.get("api"), &artifacts);

    if !validator.issues.is_empty() {
        return Err(ValidationFailure {
            issues: validator.issues,
        });
    }
    serde_json::from_value(candidate.clone())
        .map_err(|err| single_issue(IssueCode::InvalidType, err.to_string()))
}

/// Parses JSON text and validates it with [`parse_contracts`].
pub fn parse_contracts_str(raw: &str) -> Result<PluginContracts, ValidationFailure> {
    let value: Value = serde_json::from_str(raw).map_err(|err| {
        single_issue(
            IssueCode::InvalidType,
            format!("contracts document is not valid JSON: {err}"),
        )
    })?;
    parse_contracts(&value)
}

fn single_issue(code: IssueCode, message: impl Into<String>) -> ValidationFailure {
    ValidationFailure {
        issues: vec![ValidationIssue::new(code, "$", message)],
    }
}

fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn index(parent: &str, idx: usize) -> String {
    format!("{parent}[{idx}]")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    fn push(&mut self, code: IssueCode, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(code, path, message));
    }

    fn invalid_type(&mut self, path: String, expected: &str, found: &Value) {
        self.push(
            IssueCode::InvalidType,
            path,
            format!("expected {expected}, found {}", type_name(found)),
        );
    }

    fn required_str<'v>(&mut self, obj: &'v Object, key: &str, parent: &str) -> Option<&'v str> {
        let path = child(parent, key);
        match obj.get(key) {
            None => {
                self.push(IssueCode::MissingField, path, "field is required");
                None
            }
            Some(Value::String(value)) => Some(value.as_str()),
            Some(other) => {
                self.invalid_type(path, "string", other);
                None
            }
        }
    }

    fn non_empty_str<'v>(&mut self, obj: &'v Object, key: &str, parent: &str) -> Option<&'v str> {
        let value = self.required_str(obj, key, parent)?;
        if value.trim().is_empty() {
            self.push(IssueCode::EmptyValue, child(parent, key), "must not be empty");
            return None;
        }
        Some(value)
    }

    fn optional_str(&mut self, obj: &Object, key: &str, parent: &str) {
        match obj.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => self.invalid_type(child(parent, key), "string", other),
        }
    }

    /// Object-valued field that may be absent or null.
    fn optional_object<'v>(&mut self, value: Option<&'v Value>, path: &str) -> Option<&'v Object> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::Object(obj)) => Some(obj),
            Some(other) => {
                self.invalid_type(path.to_string(), "object", other);
                None
            }
        }
    }

    fn entry_object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Object> {
        match value {
            Value::Object(obj) => Some(obj),
            other => {
                self.invalid_type(path.to_string(), "object", other);
                None
            }
        }
    }

    /// Checks that the entry stored under `key` declares the same `id`.
    fn entry_id(&mut self, key: &str, obj: &Object, path: &str) {
        if let Some(id) = self.required_str(obj, "id", path) {
            if id != key {
                self.push(
                    IssueCode::KeyMismatch,
                    child(path, "id"),
                    format!("id `{id}` does not match its key `{key}`"),
                );
            }
        }
    }

    /// Array of identifier strings. Non-string items and repeats are reported;
    /// the remaining ids come back with their positions.
    fn id_list(&mut self, value: Option<&Value>, path: &str) -> Vec<(usize, String)> {
        let items = match value {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.invalid_type(path.to_string(), "array of identifiers", other);
                return Vec::new();
            }
        };
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match item {
                Value::String(id) => {
                    if !seen.insert(id.as_str()) {
                        self.push(
                            IssueCode::Duplicate,
                            index(path, idx),
                            format!("`{id}` is listed more than once"),
                        );
                        continue;
                    }
                    ids.push((idx, id.clone()));
                }
                other => self.invalid_type(index(path, idx), "string", other),
            }
        }
        ids
    }

    fn artifact_refs(
        &mut self,
        ids: &[(usize, String)],
        path: &str,
        artifacts: &BTreeSet<String>,
    ) {
        for (idx, id) in ids {
            if !artifacts.contains(id) {
                self.push(
                    IssueCode::DanglingReference,
                    index(path, *idx),
                    format!("artifact `{id}` is not declared"),
                );
            }
        }
    }

    fn string_list(&mut self, value: Option<&Value>, path: &str) {
        match value {
            None => {}
            Some(Value::Array(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        self.invalid_type(index(path, idx), "string", item);
                    }
                }
            }
            Some(other) => self.invalid_type(path.to_string(), "array of strings", other),
        }
    }

    fn schema_reference(&mut self, value: Option<&Value>, path: &str) {
        if let Some(obj) = self.optional_object(value, path) {
            self.non_empty_str(obj, "ref", path);
            self.non_empty_str(obj, "format", path);
        }
    }

    fn check_header(&mut self, root: &Object) {
        if let Some(schema) = self.required_str(root, "schema", "") {
            if schema != CONTRACTS_SCHEMA_ID {
                self.push(
                    IssueCode::UnsupportedSchema,
                    "schema",
                    format!("unsupported contracts schema `{schema}`, expected `{CONTRACTS_SCHEMA_ID}`"),
                );
            }
        }
        self.non_empty_str(root, "pluginId", "");
        if let Some(version) = self.required_str(root, "contractsVersion", "") {
            if let Err(err) = semver::Version::parse(version) {
                self.push(
                    IssueCode::InvalidVersion,
                    "contractsVersion",
                    format!("`{version}` is not a semantic version: {err}"),
                );
            }
        }
    }

    /// Returns the declared artifact ids (map keys) for reference checks.
    fn check_artifacts(&mut self, value: Option<&Value>) -> BTreeSet<String> {
        let mut declared = BTreeSet::new();
        let Some(value) = value else {
            self.push(IssueCode::MissingField, "artifacts", "field is required");
            return declared;
        };
        let Some(artifacts) = self.entry_object(value, "artifacts") else {
            return declared;
        };

        for (key, entry) in artifacts {
            declared.insert(key.clone());
            let path = child("artifacts", key);
            let Some(obj) = self.entry_object(entry, &path) else {
                continue;
            };
            self.entry_id(key, obj, &path);
            let kind = self.artifact_kind(obj, &path);
            self.non_empty_str(obj, "pathPattern", &path);
            self.optional_str(obj, "description", &path);
            self.optional_str(obj, "mediaType", &path);
            self.optional_str(obj, "schemaRef", &path);
            self.artifact_example(obj.get("example"), kind, &child(&path, "example"));
        }
        declared
    }

    fn artifact_kind(&mut self, obj: &Object, path: &str) -> Option<ArtifactKind> {
        let tag = self.non_empty_str(obj, "kind", path)?;
        let kind = ArtifactKind::from_tag(tag);
        if kind.is_none() {
            let known: Vec<_> = ArtifactKind::ALL.iter().map(ArtifactKind::as_str).collect();
            self.push(
                IssueCode::UnknownVariant,
                child(path, "kind"),
                format!("unknown artifact kind `{tag}`, expected one of {}", known.join(", ")),
            );
        }
        kind
    }

    fn artifact_example(&mut self, value: Option<&Value>, kind: Option<ArtifactKind>, path: &str) {
        let Some(example) = self.optional_object(value, path) else {
            return;
        };
        self.optional_str(example, "summary", path);
        match (example.get("payload"), kind) {
            (None, _) => {
                self.push(IssueCode::MissingField, child(path, "payload"), "field is required")
            }
            (Some(payload), Some(kind)) if !kind.accepts_payload(payload) => self.push(
                IssueCode::PayloadMismatch,
                child(path, "payload"),
                format!("{} payload does not fit a `{kind}` artifact", type_name(payload)),
            ),
            _ => {}
        }
    }

    /// Returns each declared command's `produces` set, keyed by map key.
    fn check_commands(
        &mut self,
        value: Option<&Value>,
        artifacts: &BTreeSet<String>,
    ) -> BTreeMap<String, BTreeSet<String>> {
        let mut declared = BTreeMap::new();
        let Some(commands) = self.optional_object(value, "commands") else {
            return declared;
        };

        for (key, entry) in commands {
            let path = child("commands", key);
            let Some(obj) = self.entry_object(entry, &path) else {
                declared.insert(key.clone(), BTreeSet::new());
                continue;
            };
            self.entry_id(key, obj, &path);
            self.optional_str(obj, "description", &path);
            self.schema_reference(obj.get("input"), &child(&path, "input"));
            self.schema_reference(obj.get("output"), &child(&path, "output"));

            let produces_path = child(&path, "produces");
            let produces = self.id_list(obj.get("produces"), &produces_path);
            self.artifact_refs(&produces, &produces_path, artifacts);

            let consumes_path = child(&path, "consumes");
            let consumes =
                self.id_list(obj.get("consumes").filter(|v| !v.is_null()), &consumes_path);
            self.artifact_refs(&consumes, &consumes_path, artifacts);

            self.string_list(obj.get("examples"), &child(&path, "examples"));
            declared.insert(key.clone(), produces.into_iter().map(|(_, id)| id).collect());
        }
        declared
    }

    fn check_workflows(
        &mut self,
        value: Option<&Value>,
        artifacts: &BTreeSet<String>,
        commands: &BTreeMap<String, BTreeSet<String>>,
    ) {
        let Some(workflows) = self.optional_object(value, "workflows") else {
            return;
        };

        for (key, entry) in workflows {
            let path = child("workflows", key);
            let Some(obj) = self.entry_object(entry, &path) else {
                continue;
            };
            self.entry_id(key, obj, &path);
            self.optional_str(obj, "description", &path);

            let produces_path = child(&path, "produces");
            let produces = self.id_list(obj.get("produces"), &produces_path);
            self.artifact_refs(&produces, &produces_path, artifacts);

            let Some(step_union) = self.workflow_steps(obj.get("steps"), &path, artifacts, commands)
            else {
                continue;
            };
            let aggregate: BTreeSet<String> = produces.into_iter().map(|(_, id)| id).collect();
            if aggregate != step_union {
                let expected: Vec<_> = step_union.iter().map(String::as_str).collect();
                self.push(
                    IssueCode::AggregateMismatch,
                    produces_path,
                    format!("must equal the union of step outputs [{}]", expected.join(", ")),
                );
            }
        }
    }

    /// Validates the step list and returns the union of step outputs, or
    /// `None` when the list itself is unusable.
    fn workflow_steps(
        &mut self,
        value: Option<&Value>,
        workflow_path: &str,
        artifacts: &BTreeSet<String>,
        commands: &BTreeMap<String, BTreeSet<String>>,
    ) -> Option<BTreeSet<String>> {
        let path = child(workflow_path, "steps");
        let steps = match value {
            None => {
                self.push(IssueCode::MissingField, path, "field is required");
                return None;
            }
            Some(Value::Array(steps)) => steps,
            Some(other) => {
                self.invalid_type(path, "array of steps", other);
                return None;
            }
        };
        if steps.is_empty() {
            self.push(IssueCode::EmptySteps, path, "workflow must declare at least one step");
            return None;
        }

        let mut step_ids = HashSet::new();
        let mut union = BTreeSet::new();
        for (idx, step) in steps.iter().enumerate() {
            let step_path = index(&path, idx);
            let Some(obj) = self.entry_object(step, &step_path) else {
                continue;
            };
            if let Some(id) = self.non_empty_str(obj, "id", &step_path) {
                if !step_ids.insert(id) {
                    self.push(
                        IssueCode::Duplicate,
                        child(&step_path, "id"),
                        format!("step id `{id}` is used more than once"),
                    );
                }
            }

            let command = self.required_str(obj, "commandId", &step_path).and_then(|command_id| {
                let found = commands.get(command_id);
                if found.is_none() {
                    self.push(
                        IssueCode::DanglingReference,
                        child(&step_path, "commandId"),
                        format!("command `{command_id}` is not declared"),
                    );
                }
                found.map(|produces| (command_id, produces))
            });

            let produces_path = child(&step_path, "produces");
            for (pos, id) in self.id_list(obj.get("produces"), &produces_path) {
                if !artifacts.contains(&id) {
                    self.push(
                        IssueCode::DanglingReference,
                        index(&produces_path, pos),
                        format!("artifact `{id}` is not declared"),
                    );
                } else if let Some((command_id, command_produces)) = command {
                    if !command_produces.contains(&id) {
                        self.push(
                            IssueCode::NotProducedByCommand,
                            index(&produces_path, pos),
                            format!("command `{command_id}` does not produce `{id}`"),
                        );
                    }
                }
                union.insert(id);
            }
        }
        Some(union)
    }

    fn check_api(&mut self, value: Option<&Value>, artifacts: &BTreeSet<String>) {
        let Some(api) = self.optional_object(value, "api") else {
            return;
        };
        let Some(rest) = self.optional_object(api.get("rest"), "api.rest") else {
            return;
        };
        if let Some(base_path) = self.required_str(rest, "basePath", "api.rest") {
            if !base_path.starts_with('/') {
                self.push(IssueCode::InvalidPath, "api.rest.basePath", "must start with `/`");
            }
        }
        let Some(routes_value) = rest.get("routes") else {
            self.push(IssueCode::MissingField, "api.rest.routes", "field is required");
            return;
        };
        let Some(routes) = self.entry_object(routes_value, "api.rest.routes") else {
            return;
        };

        let mut endpoints: HashSet<(&str, &str)> = HashSet::new();
        for (key, entry) in routes {
            let path = child("api.rest.routes", key);
            let Some(obj) = self.entry_object(entry, &path) else {
                continue;
            };
            self.entry_id(key, obj, &path);
            self.optional_str(obj, "description", &path);
            self.schema_reference(obj.get("input"), &child(&path, "input"));
            self.schema_reference(obj.get("output"), &child(&path, "output"));

            let method = self.required_str(obj, "method", &path).filter(|tag| {
                let known = HttpMethod::from_tag(tag).is_some();
                if !known {
                    self.push(
                        IssueCode::UnknownVariant,
                        child(&path, "method"),
                        format!("unknown http method `{tag}`"),
                    );
                }
                known
            });
            let route_path = self.non_empty_str(obj, "path", &path).filter(|route_path| {
                let rooted = route_path.starts_with('/');
                if !rooted {
                    self.push(IssueCode::InvalidPath, child(&path, "path"), "must start with `/`");
                }
                rooted
            });
            if let (Some(method), Some(route_path)) = (method, route_path) {
                if !endpoints.insert((method, route_path)) {
                    self.push(
                        IssueCode::Duplicate,
                        path.clone(),
                        format!("`{method} {route_path}` is declared by more than one route"),
                    );
                }
            }

            let produces_path = child(&path, "produces");
            let produces = self.id_list(obj.get("produces"), &produces_path);
            self.artifact_refs(&produces, &produces_path, artifacts);
        }
    }
}
