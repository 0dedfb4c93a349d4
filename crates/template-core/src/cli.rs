use std::{io::Write, time::Instant};

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use template_contracts::{ArtifactId, CommandId, LookupError, PluginContracts};

use crate::{
    greeting::{create_greeting_use_case, GreetingInput, GreetingPayload},
    plugin::{LogLevel, PluginContext},
};

pub const HELLO_COMMAND: &str = "template:hello";
pub const HELLO_GREETING_ARTIFACT: &str = "template.hello.greeting";
pub const HELLO_LOG_ARTIFACT: &str = "template.hello.log";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloFlags {
    pub name: Option<String>,
    pub message: Option<String>,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HelloCommandResult {
    pub ok: bool,
    pub result: GreetingPayload,
    pub produces: Vec<ArtifactId>,
}

/// CLI surface for `template:hello`.
///
/// Identifiers are checked against the manifest when the command is built, so
/// a typo fails before anything runs.
#[derive(Debug, Clone)]
pub struct HelloCommand {
    command_id: CommandId,
    produces: Vec<ArtifactId>,
}

impl HelloCommand {
    pub fn new(contracts: &PluginContracts) -> Result<Self, LookupError> {
        Ok(Self {
            command_id: contracts.command_id(HELLO_COMMAND)?,
            produces: vec![
                contracts.artifact_id(HELLO_GREETING_ARTIFACT)?,
                contracts.artifact_id(HELLO_LOG_ARTIFACT)?,
            ],
        })
    }

    pub fn id(&self) -> &CommandId {
        &self.command_id
    }

    pub fn run(
        &self,
        ctx: &mut impl PluginContext,
        flags: &HelloFlags,
    ) -> Result<HelloCommandResult> {
        metrics::counter!("template_hello_total", "surface" => "cli", "outcome" => "started")
            .increment(1);
        let outcome = self.execute(ctx, flags);
        let label = if outcome.is_ok() { "completed" } else { "failed" };
        metrics::counter!("template_hello_total", "surface" => "cli", "outcome" => label)
            .increment(1);
        if let Err(err) = &outcome {
            ctx.log(
                LogLevel::Error,
                "hello command failed",
                &json!({ "command": self.command_id, "error": err.to_string() }),
            );
        }
        outcome
    }

    fn execute(
        &self,
        ctx: &mut impl PluginContext,
        flags: &HelloFlags,
    ) -> Result<HelloCommandResult> {
        let started = Instant::now();
        let greeting = create_greeting_use_case(GreetingInput {
            name: flags.name.clone(),
            message: flags.message.clone(),
        });
        let payload = greeting.payload();

        let out = ctx.output();
        if flags.json {
            serde_json::to_writer_pretty(&mut *out, &payload)?;
            writeln!(out)?;
        } else {
            let elapsed_ms = started.elapsed().as_millis();
            out.write_all(render_box(&payload, &greeting.timestamp()?, elapsed_ms).as_bytes())?;
        }

        ctx.log(
            LogLevel::Info,
            "hello command executed",
            &json!({
                "command": self.command_id,
                "target": payload.target,
                "produces": self.produces,
            }),
        );
        Ok(HelloCommandResult {
            ok: true,
            result: payload,
            produces: self.produces.clone(),
        })
    }
}

fn render_box(payload: &GreetingPayload, created_at: &str, elapsed_ms: u128) -> String {
    let mut text = String::new();
    text.push_str("┌ Hello\n");
    text.push_str(&format!("│ {}\n", payload.message));
    text.push_str("│\n");
    text.push_str("│ Details\n");
    text.push_str(&format!("│   Target:  {}\n", payload.target));
    text.push_str(&format!("│   Created: {created_at}\n"));
    text.push_str(&format!("└ success · {elapsed_ms}ms\n"));
    text
}
