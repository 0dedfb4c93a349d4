//! Setup hook: seeds `.kb/template` and describes host-applied config.

use std::{
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    cli::HELLO_COMMAND,
    config::PluginConfig,
    plugin::{LogLevel, PluginContext},
};

pub const TEMPLATE_DIR: &str = ".kb/template";
pub const CONFIG_SECTION: &str = "plugins.template";
const UPDATED_AT_KEY: &str = "updatedAt";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render setup payload")]
    Render(#[from] serde_json::Error),
    #[error("failed to format setup timestamp")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupInput {
    /// Overwrite files whose content differs from the plan.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SetupOperation {
    EnsureFile {
        path: String,
        contents: String,
        description: String,
        /// Top-level JSON key set to the write time when the file is written.
        /// Ignored when comparing against what is already on disk.
        #[serde(skip_serializing_if = "Option::is_none")]
        stamp: Option<String>,
    },
    EnsureConfigSection {
        pointer: String,
        value: Value,
    },
    SuggestScript {
        name: String,
        command: String,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPlan {
    pub message: String,
    pub force: bool,
    pub operations: Vec<SetupOperation>,
    pub config_defaults: Value,
    pub gitignore: Vec<String>,
    pub notes: Vec<String>,
}

pub fn plan(input: SetupInput, config: &PluginConfig) -> Result<SetupPlan, SetupError> {
    let hello_config = json!({
        "greeting": "Welcome to your plugin workspace!",
        "hint": "Edit this file to customise messages produced by template surfaces.",
    });
    let readme = [
        "# Template plugin workspace files",
        "",
        "- `hello-config.json`: example configuration read by the CLI and REST surfaces.",
        "- Extend this folder with rules, profiles, or other assets required by your plugin.",
        "",
        "Re-run `plugin-template setup --force` whenever you want to regenerate defaults.",
        "",
    ]
    .join("\n");

    let mut section = serde_json::to_value(config)?;
    if let Value::Object(map) = &mut section {
        map.insert("enabled".into(), Value::Bool(true));
    }

    let operations = vec![
        SetupOperation::EnsureFile {
            path: format!("{TEMPLATE_DIR}/hello-config.json"),
            contents: format!("{}\n", serde_json::to_string_pretty(&hello_config)?),
            description: "Seed hello-config.json with defaults".into(),
            stamp: Some(UPDATED_AT_KEY.into()),
        },
        SetupOperation::EnsureFile {
            path: format!("{TEMPLATE_DIR}/README.md"),
            contents: readme,
            description: "Explain the files kept under .kb/template".into(),
            stamp: None,
        },
        SetupOperation::EnsureConfigSection {
            pointer: CONFIG_SECTION.into(),
            value: section.clone(),
        },
        SetupOperation::SuggestScript {
            name: HELLO_COMMAND.into(),
            command: "plugin-template hello".into(),
            description: "Say hello from the template plugin".into(),
        },
    ];

    Ok(SetupPlan {
        message: "Template setup completed. Try `plugin-template hello` to see it in action!"
            .into(),
        force: input.force,
        operations,
        config_defaults: section,
        gitignore: vec![
            format!("{}/", config.output.directory.trim_end_matches('/')),
            format!("{TEMPLATE_DIR}/cache/"),
        ],
        notes: vec![
            "Adjust hello-config.json to plug into your own CLI/REST logic.".into(),
        ],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
    /// Existing content differs and `force` was not set.
    Kept,
    /// Dry run: the file would have been written.
    WouldWrite,
    /// Left for the host setup engine.
    Deferred,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Created => "created",
            ApplyOutcome::Updated => "updated",
            ApplyOutcome::Unchanged => "unchanged",
            ApplyOutcome::Kept => "kept",
            ApplyOutcome::WouldWrite => "would-write",
            ApplyOutcome::Deferred => "deferred",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedOperation {
    pub target: String,
    pub outcome: ApplyOutcome,
}

/// Applies the plan's file operations below `root`.
pub async fn apply(
    plan: &SetupPlan,
    root: &Path,
    dry_run: bool,
    ctx: &impl PluginContext,
) -> Result<Vec<AppliedOperation>, SetupError> {
    let mut applied = Vec::with_capacity(plan.operations.len());
    for operation in &plan.operations {
        let (target, outcome) = match operation {
            SetupOperation::EnsureFile {
                path,
                contents,
                stamp,
                ..
            } => {
                let target = root.join(path);
                let outcome =
                    ensure_file(&target, contents, stamp.as_deref(), plan.force, dry_run).await?;
                (path.clone(), outcome)
            }
            SetupOperation::EnsureConfigSection { pointer, .. } => {
                (pointer.clone(), ApplyOutcome::Deferred)
            }
            SetupOperation::SuggestScript { name, .. } => (name.clone(), ApplyOutcome::Deferred),
        };
        ctx.log(
            LogLevel::Debug,
            "setup operation processed",
            &json!({ "target": target, "outcome": outcome }),
        );
        applied.push(AppliedOperation { target, outcome });
    }

    if applied.iter().any(|op| op.outcome == ApplyOutcome::Kept) {
        ctx.log(
            LogLevel::Warn,
            "some files differ from template defaults; re-run with --force to overwrite",
            &Value::Null,
        );
    }
    ctx.log(
        LogLevel::Info,
        "template setup populated .kb/template assets",
        &json!({ "dryRun": dry_run, "force": plan.force }),
    );
    Ok(applied)
}

async fn ensure_file(
    path: &Path,
    contents: &str,
    stamp: Option<&str>,
    force: bool,
    dry_run: bool,
) -> Result<ApplyOutcome, SetupError> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(existing) => Some(existing),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(SetupError::Io {
                action: "read",
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let outcome = match existing.as_deref() {
        Some(current) if same_contents(current, contents, stamp) => {
            return Ok(ApplyOutcome::Unchanged)
        }
        Some(_) if !force => return Ok(ApplyOutcome::Kept),
        Some(_) => ApplyOutcome::Updated,
        None => ApplyOutcome::Created,
    };
    if dry_run {
        return Ok(ApplyOutcome::WouldWrite);
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SetupError::Io {
                action: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
    }
    let rendered = match stamp {
        Some(key) => stamped(contents, key)?,
        None => contents.to_owned(),
    };
    tokio::fs::write(path, rendered)
        .await
        .map_err(|source| SetupError::Io {
            action: "write",
            path: path.to_path_buf(),
            source,
        })?;
    Ok(outcome)
}

fn same_contents(current: &str, planned: &str, stamp: Option<&str>) -> bool {
    let Some(key) = stamp else {
        return current == planned;
    };
    let (Ok(mut current), Ok(planned)) = (
        serde_json::from_str::<Value>(current),
        serde_json::from_str::<Value>(planned),
    ) else {
        return false;
    };
    if let Value::Object(map) = &mut current {
        map.remove(key);
    }
    current == planned
}

fn stamped(contents: &str, key: &str) -> Result<String, SetupError> {
    let mut value: Value = serde_json::from_str(contents)?;
    if let Value::Object(map) = &mut value {
        let now = OffsetDateTime::now_utc().format(&Rfc3339)?;
        map.insert(key.to_owned(), Value::String(now));
    }
    Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::plugin::testing::RecordingContext;

    fn outcomes(applied: &[AppliedOperation]) -> Vec<ApplyOutcome> {
        applied.iter().map(|op| op.outcome).collect()
    }

    #[test]
    fn plan_seeds_files_section_and_script() {
        let plan = plan(SetupInput::default(), &PluginConfig::default()).unwrap();
        let value = serde_json::to_value(&plan.operations).unwrap();
        assert_eq!(value[0]["kind"], "ensure-file");
        assert_eq!(value[0]["path"], ".kb/template/hello-config.json");
        assert_eq!(value[0]["stamp"], "updatedAt");
        assert!(value[1].get("stamp").is_none());
        assert_eq!(value[2]["kind"], "ensure-config-section");
        assert_eq!(value[2]["value"]["enabled"], true);
        assert_eq!(value[2]["value"]["output"]["directory"], ".kb/template/output");
        assert_eq!(value[3]["name"], "template:hello");
        assert_eq!(plan.gitignore[0], ".kb/template/output/");
    }

    #[tokio::test]
    async fn apply_is_idempotent_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RecordingContext::default();

        let first_plan = plan(SetupInput::default(), &PluginConfig::default()).unwrap();
        let first = apply(&first_plan, dir.path(), false, &ctx).await.unwrap();
        assert_eq!(
            outcomes(&first),
            vec![
                ApplyOutcome::Created,
                ApplyOutcome::Created,
                ApplyOutcome::Deferred,
                ApplyOutcome::Deferred,
            ]
        );
        assert!(dir.path().join(".kb/template/README.md").exists());
        let written = std::fs::read_to_string(dir.path().join(".kb/template/hello-config.json"))
            .unwrap();
        let written: Value = serde_json::from_str(&written).unwrap();
        assert!(written["updatedAt"].is_string());

        // A later run stamps a different time; the file must still match.
        std::thread::sleep(std::time::Duration::from_millis(1100));
        ctx.logs.borrow_mut().clear();
        let second_plan = plan(SetupInput::default(), &PluginConfig::default()).unwrap();
        let second = apply(&second_plan, dir.path(), false, &ctx).await.unwrap();
        assert_eq!(
            &outcomes(&second)[..2],
            &[ApplyOutcome::Unchanged, ApplyOutcome::Unchanged]
        );
        assert!(ctx
            .logs
            .borrow()
            .iter()
            .all(|(level, _, _)| *level != LogLevel::Warn));
    }

    #[tokio::test]
    async fn forced_run_leaves_matching_stamped_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RecordingContext::default();
        let config_file = dir.path().join(".kb/template/hello-config.json");

        let first = plan(SetupInput { force: true }, &PluginConfig::default()).unwrap();
        apply(&first, dir.path(), false, &ctx).await.unwrap();
        let before = std::fs::read_to_string(&config_file).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = plan(SetupInput { force: true }, &PluginConfig::default()).unwrap();
        let applied = apply(&second, dir.path(), false, &ctx).await.unwrap();
        assert_eq!(applied[0].outcome, ApplyOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(&config_file).unwrap(), before);
    }

    #[test]
    fn edited_stamped_file_differs() {
        let planned = "{\n  \"greeting\": \"hi\"\n}\n";
        let on_disk = "{\"greeting\": \"hi\", \"updatedAt\": \"2024-01-01T00:00:00Z\"}";
        assert!(same_contents(on_disk, planned, Some("updatedAt")));
        assert!(!same_contents(on_disk, planned, None));

        let edited = "{\"greeting\": \"hey\", \"updatedAt\": \"2024-01-01T00:00:00Z\"}";
        assert!(!same_contents(edited, planned, Some("updatedAt")));
        assert!(!same_contents("not json", planned, Some("updatedAt")));
    }

    #[tokio::test]
    async fn differing_files_need_force() {
        let dir = tempfile::tempdir().unwrap();
        let readme = dir.path().join(".kb/template/README.md");
        std::fs::create_dir_all(readme.parent().unwrap()).unwrap();
        std::fs::write(&readme, "custom notes\n").unwrap();
        let ctx = RecordingContext::default();

        let kept = plan(SetupInput::default(), &PluginConfig::default()).unwrap();
        let applied = apply(&kept, dir.path(), false, &ctx).await.unwrap();
        assert_eq!(applied[1].outcome, ApplyOutcome::Kept);
        assert_eq!(std::fs::read_to_string(&readme).unwrap(), "custom notes\n");

        let forced = plan(SetupInput { force: true }, &PluginConfig::default()).unwrap();
        let applied = apply(&forced, dir.path(), false, &ctx).await.unwrap();
        assert_eq!(applied[1].outcome, ApplyOutcome::Updated);
        assert!(std::fs::read_to_string(&readme)
            .unwrap()
            .starts_with("# Template plugin workspace files"));
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RecordingContext::default();
        let plan = plan(SetupInput::default(), &PluginConfig::default()).unwrap();

        let applied = apply(&plan, dir.path(), true, &ctx).await.unwrap();
        assert_eq!(applied[0].outcome, ApplyOutcome::WouldWrite);
        assert!(!dir.path().join(TEMPLATE_DIR).exists());
    }
}
