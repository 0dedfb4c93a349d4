use serde::{Deserialize, Serialize};
use serde_json::json;
use template_contracts::{
    ArtifactId, HttpMethod, LookupError, Namespace, PluginContracts, RouteId,
};
use thiserror::Error;

use crate::{
    cli::HELLO_GREETING_ARTIFACT,
    greeting::{create_greeting_use_case, GreetingInput, GreetingPayload},
    plugin::{LogLevel, PluginContext},
};

pub const HELLO_ROUTE: &str = "template.rest.hello";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

pub type HelloResponse = GreetingPayload;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelloRequestError {
    #[error("name cannot be empty")]
    EmptyName,
}

impl HelloRequest {
    /// An absent name is fine; a present one must carry at least one character.
    pub fn validate(&self) -> Result<(), HelloRequestError> {
        match self.name.as_deref() {
            Some("") => Err(HelloRequestError::EmptyName),
            _ => Ok(()),
        }
    }
}

/// REST surface bound to the `template.rest.hello` route contract.
#[derive(Debug, Clone)]
pub struct HelloRoute {
    route_id: RouteId,
    method: HttpMethod,
    path: String,
    greeting_artifact: ArtifactId,
}

impl HelloRoute {
    pub fn new(contracts: &PluginContracts) -> Result<Self, LookupError> {
        let route_id = contracts.route_id(HELLO_ROUTE)?;
        let greeting_artifact = contracts.artifact_id(HELLO_GREETING_ARTIFACT)?;
        let base_path = contracts.rest_base_path().unwrap_or_default();
        let route = contracts
            .route(route_id.as_str())
            .ok_or_else(|| LookupError {
                namespace: Namespace::Route,
                id: route_id.to_string(),
            })?;
        Ok(Self {
            method: route.method,
            path: route.full_path(base_path),
            route_id,
            greeting_artifact,
        })
    }

    pub fn id(&self) -> &RouteId {
        &self.route_id
    }

    /// Method and full path (base path included) the host should bind.
    pub fn endpoint(&self) -> (HttpMethod, &str) {
        (self.method, &self.path)
    }

    pub fn handle(
        &self,
        ctx: &impl PluginContext,
        request: HelloRequest,
    ) -> Result<HelloResponse, HelloRequestError> {
        if let Err(err) = request.validate() {
            metrics::counter!("template_hello_total", "surface" => "rest", "outcome" => "rejected")
                .increment(1);
            ctx.log(
                LogLevel::Warn,
                "hello request rejected",
                &json!({
                    "route": self.route_id,
                    "requestId": ctx.request_id(),
                    "error": err.to_string(),
                }),
            );
            return Err(err);
        }

        let greeting = create_greeting_use_case(GreetingInput {
            name: request.name,
            message: None,
        });
        ctx.log(
            LogLevel::Info,
            "Hello REST endpoint executed",
            &json!({
                "route": self.route_id,
                "requestId": ctx.request_id(),
                "target": greeting.target,
                "produces": [self.greeting_artifact],
            }),
        );
        metrics::counter!("template_hello_total", "surface" => "rest", "outcome" => "completed")
            .increment(1);
        Ok(greeting.payload())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use template_contracts::template_contracts;

    use super::*;
    use crate::plugin::testing::RecordingContext;

    fn route() -> HelloRoute {
        HelloRoute::new(&template_contracts()).unwrap()
    }

    #[test]
    fn endpoint_joins_base_path() {
        let route = route();
        assert_eq!(route.endpoint(), (HttpMethod::Get, "/v1/plugins/template/hello"));
        assert_eq!(route.id().as_str(), HELLO_ROUTE);
    }

    #[test]
    fn missing_name_defaults_to_world() {
        let ctx = RecordingContext::default();
        let response = route().handle(&ctx, HelloRequest::default()).unwrap();
        assert_eq!(
            response,
            HelloResponse {
                message: "Hello, World!".into(),
                target: "World".into(),
            }
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let ctx = RecordingContext::default();
        let err = route()
            .handle(&ctx, HelloRequest { name: Some(String::new()) })
            .unwrap_err();
        assert_eq!(err, HelloRequestError::EmptyName);
        assert_eq!(ctx.logs.borrow()[0].0, LogLevel::Warn);
    }

    #[test]
    fn log_tags_request_and_artifact() {
        let ctx = RecordingContext {
            request_id: Some("req-42".into()),
            ..RecordingContext::default()
        };
        route()
            .handle(&ctx, HelloRequest { name: Some("Dev".into()) })
            .unwrap();

        let logs = ctx.logs.borrow();
        let metadata = &logs[0].2;
        assert_eq!(metadata["requestId"], "req-42");
        assert_eq!(metadata["target"], "Dev");
        assert_eq!(metadata["produces"], json!(["template.hello.greeting"]));
    }

    #[test]
    fn request_deserializes_without_name() {
        let request: HelloRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.name, None);
    }
}
