//! Bee custom tool registry.
//!
//! Tools are created from source code which the server runs in its hosted
//! sandbox. Name, description and parameter schema are derived by the server
//! from the function definition in the source unless given explicitly.
//! Assistants reference a registered tool with [`Tool::user`](crate::assistants::Tool::user).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::{Deleted, List, ListQuery, OpenAiClient},
    ApiResponseOrError,
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SourceCodeTool {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(rename = "type", default = "source_code")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_code: Option<String>,
    #[serde(default)]
    pub json_schema: Option<Value>,
    #[serde(default)]
    pub created_at: u64,
}

fn source_code() -> String {
    "source_code".to_string()
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct CreateToolRequest {
    pub source_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
}

impl CreateToolRequest {
    pub fn from_source(source_code: impl Into<String>) -> Self {
        CreateToolRequest {
            source_code: source_code.into(),
            ..Default::default()
        }
    }
}

impl OpenAiClient {
    pub async fn list_tools(&self, query: &ListQuery) -> ApiResponseOrError<List<SourceCodeTool>> {
        self.list("tools", query).await
    }

    pub async fn create_tool(&self, request: CreateToolRequest) -> ApiResponseOrError<SourceCodeTool> {
        self.post("tools", &request).await
    }

    pub async fn delete_tool(&self, tool_id: &str) -> ApiResponseOrError<Deleted> {
        self.delete(format!("tools/{tool_id}")).await
    }

    /// Deletes every registered tool called `name`, returning how many went away.
    pub async fn delete_tools_named(&self, name: &str) -> ApiResponseOrError<usize> {
        let tools: Vec<SourceCodeTool> = self.list_all("tools").await?;
        let mut deleted = 0;
        for tool in tools.iter().filter(|tool| tool.name == name) {
            log::info!("Deleting existing tool {} ({})", tool.name, tool.id);
            self.delete_tool(&tool.id).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Registers a tool under `name`, removing older tools with that name first.
    pub async fn replace_tool(
        &self,
        name: &str,
        request: CreateToolRequest,
    ) -> ApiResponseOrError<SourceCodeTool> {
        self.delete_tools_named(name).await?;
        self.create_tool(request).await
    }

    /// Deletes the tool, treating an already missing tool as done.
    pub async fn delete_tool_best_effort(&self, tool_id: &str) -> ApiResponseOrError<()> {
        match self.delete_tool(tool_id).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                log::warn!("Tool {tool_id} was already deleted: {err}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
