use std::collections::HashMap;

use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::{Deleted, OpenAiClient},
    ApiResponseOrError, OpenAiError,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: u64,
    /// The name of the assistant. The maximum length is 256 characters.
    pub name: Option<String>,
    /// The description of the assistant. The maximum length is 512 characters.
    #[serde(default)]
    pub description: Option<String>,
    /// ID of the model to use.
    pub model: String,
    /// The system instructions that the assistant uses.
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// A set of resources that are used by the assistant's tools. The resources are specific to the type of tool. For example, the code_interpreter tool requires a list of file IDs, while the file_search tool requires a list of vector store IDs.
    #[serde(default)]
    pub tool_resources: Option<ToolResources>,
    /// Set of 16 key-value pairs that can be attached to an object.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub response_format: Option<Value>,
}

/// A capability attached to an assistant or a run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    /// Hosted code execution, run entirely on the server.
    CodeInterpreter,
    FileSearch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_search: Option<FileSearch>,
    },
    /// A function executed by the caller when the run requires action.
    Function { function: FunctionDefinition },
    /// A custom tool from the Bee tool registry, executed on the server.
    User { user: UserTool },
    /// Any tool kind this client does not model (Bee system tools, for one).
    #[serde(other)]
    Unknown,
}

impl Tool {
    pub fn file_search() -> Self {
        Tool::FileSearch { file_search: None }
    }

    pub fn function(function: FunctionDefinition) -> Self {
        Tool::Function { function }
    }

    /// Reference to a tool previously created through the tool registry.
    pub fn user(tool_id: impl Into<String>) -> Self {
        Tool::User {
            user: UserTool {
                tool: ToolReference { id: tool_id.into() },
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserTool {
    pub tool: ToolReference,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolReference {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_num_results: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionDefinition {
    /// The name of the function to be called. Must be a-z, A-Z, 0-9, or contain underscores and dashes, with a maximum length of 64.
    pub name: String,
    /// A description of what the function does, used by the model to choose when and how to call the function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The parameters the function accepts, described as a JSON Schema object.
    #[serde(default)]
    pub parameters: Value,
}

impl FunctionDefinition {
    /// Declares a function whose parameters are the fields of `T`.
    ///
    /// The description is the first paragraph of `T`'s doc comment and the
    /// parameter schema is generated from `T`, field docs included.
    pub fn from_schema<T: JsonSchema>(name: impl Into<String>) -> Self {
        let (parameters, description) = parameters_schema::<T>();
        FunctionDefinition {
            name: name.into(),
            description: description
                .as_deref()
                .and_then(|description| description.lines().next())
                .map(str::to_string),
            parameters,
        }
    }
}

fn parameters_schema<T: JsonSchema>() -> (Value, Option<String>) {
    let mut settings = schemars::r#gen::SchemaSettings::draft07();
    settings.inline_subschemas = true;
    settings.meta_schema = None;
    let mut generator = settings.into_generator();
    let mut schema = T::json_schema(&mut generator).into_object();
    let description = schema.metadata().description.clone();
    // Title and description belong to the function, not to its parameters.
    schema.metadata = None;
    let schema = serde_json::to_value(schema).unwrap_or(Value::Null);
    (schema, description)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ToolResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_interpreter: Option<CodeInterpreterResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_search: Option<FileSearchResources>,
}

impl ToolResources {
    pub fn file_search(vector_store_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ToolResources {
            code_interpreter: None,
            file_search: Some(FileSearchResources {
                vector_store_ids: vector_store_ids.into_iter().map(Into::into).collect(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CodeInterpreterResources {
    /// A list of file IDs made available to the `code_interpreter` tool.
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct FileSearchResources {
    /// The IDs of the vector stores searched by the `file_search` tool.
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

#[derive(Serialize, Builder, Default, Debug, Clone)]
#[builder(pattern = "owned")]
#[builder(name = "CreateAssistantBuilder")]
#[builder(setter(strip_option, into))]
#[builder(build_fn(error = "OpenAiError"))]
pub struct CreateAssistantRequest {
    /// ID of the model to use.
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub instructions: Option<String>,
    /// A set of tools that the assistant can use.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub tool_resources: Option<ToolResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CreateAssistantRequest {
    pub fn builder(model: impl Into<String>) -> CreateAssistantBuilder {
        CreateAssistantBuilder::create_empty().model(model)
    }
}

impl OpenAiClient {
    pub async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> ApiResponseOrError<Assistant> {
        self.post("assistants", &request).await
    }

    pub async fn get_assistant(&self, assistant_id: &str) -> ApiResponseOrError<Assistant> {
        self.get(format!("assistants/{assistant_id}")).await
    }

    pub async fn update_assistant(
        &self,
        assistant_id: &str,
        request: CreateAssistantRequest,
    ) -> ApiResponseOrError<Assistant> {
        self.post(format!("assistants/{assistant_id}"), &request)
            .await
    }

    pub async fn delete_assistant(&self, assistant_id: &str) -> ApiResponseOrError<Deleted> {
        self.delete(format!("assistants/{assistant_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Look up the weather.
    ///
    /// Only cities are supported.
    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct WeatherArgs {
        /// City name, e.g. Prague
        city: String,
        days: Option<u8>,
    }

    #[test]
    fn function_definition_from_schema() {
        let function = FunctionDefinition::from_schema::<WeatherArgs>("weather");
        assert_eq!(function.name, "weather");
        assert_eq!(function.description.as_deref(), Some("Look up the weather."));
        assert_eq!(function.parameters["type"], "object");
        assert_eq!(
            function.parameters["properties"]["city"]["description"],
            "City name, e.g. Prague"
        );
        assert_eq!(function.parameters["required"], json!(["city"]));
        assert!(function.parameters.get("title").is_none());
    }

    #[test]
    fn tool_wire_format() {
        assert_eq!(
            serde_json::to_value(Tool::CodeInterpreter).unwrap(),
            json!({ "type": "code_interpreter" })
        );
        assert_eq!(
            serde_json::to_value(Tool::file_search()).unwrap(),
            json!({ "type": "file_search" })
        );
        assert_eq!(
            serde_json::to_value(Tool::user("tool_123")).unwrap(),
            json!({ "type": "user", "user": { "tool": { "id": "tool_123" } } })
        );
        let system: Tool =
            serde_json::from_value(json!({ "type": "system", "system": { "id": "web_search" } }))
                .unwrap();
        assert_eq!(system, Tool::Unknown);
    }

    #[tokio::test]
    async fn create_assistant_without_tools() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/assistants"))
            .and(body_json(json!({ "model": "meta-llama/llama-3-1-70b-instruct" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "asst_1",
                "object": "assistant",
                "created_at": 1720000000,
                "name": null,
                "model": "meta-llama/llama-3-1-70b-instruct",
                "instructions": null,
                "tools": [],
                "metadata": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let request = CreateAssistantRequest::builder("meta-llama/llama-3-1-70b-instruct")
            .build()
            .unwrap();
        let assistant = client.create_assistant(request).await.unwrap();
        assert_eq!(assistant.id, "asst_1");
        assert!(assistant.tools.is_empty());
    }

    #[tokio::test]
    async fn create_assistant_with_file_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/assistants"))
            .and(body_json(json!({
                "model": "meta-llama/llama-3-1-70b-instruct",
                "tools": [{ "type": "file_search" }],
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_1"] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "asst_2",
                "model": "meta-llama/llama-3-1-70b-instruct",
                "name": null,
                "instructions": null,
                "tools": [{ "type": "file_search" }],
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_1"] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let request = CreateAssistantRequest::builder("meta-llama/llama-3-1-70b-instruct")
            .tools(vec![Tool::file_search()])
            .tool_resources(ToolResources::file_search(["vs_1"]))
            .build()
            .unwrap();
        let assistant = client.create_assistant(request).await.unwrap();
        assert_eq!(assistant.tools, vec![Tool::file_search()]);
        assert_eq!(
            assistant.tool_resources.unwrap().file_search.unwrap().vector_store_ids,
            ["vs_1"]
        );
    }

    #[tokio::test]
    async fn get_and_update_assistant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/assistants/asst_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "asst_1",
                "model": "meta-llama/llama-3-1-70b-instruct",
                "name": null,
                "instructions": null,
                "tools": [{ "type": "user", "user": { "tool": { "id": "tool_1" } } }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/assistants/asst_1"))
            .and(body_json(json!({
                "model": "meta-llama/llama-3-1-70b-instruct",
                "instructions": "You are IP address analytic."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "asst_1",
                "model": "meta-llama/llama-3-1-70b-instruct",
                "name": null,
                "instructions": "You are IP address analytic."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let assistant = client.get_assistant("asst_1").await.unwrap();
        assert_eq!(assistant.tools, vec![Tool::user("tool_1")]);

        let request = CreateAssistantRequest::builder(assistant.model)
            .instructions("You are IP address analytic.")
            .build()
            .unwrap();
        let updated = client.update_assistant("asst_1", request).await.unwrap();
        assert_eq!(
            updated.instructions.as_deref(),
            Some("You are IP address analytic.")
        );
    }
}
