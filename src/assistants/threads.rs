use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    assistants::ToolResources,
    client::{Deleted, OpenAiClient},
    ApiResponseOrError, OpenAiError,
};

use super::messages::{Attachment, Role};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: u64,
    /// A set of resources that are used by the assistant's tools. The resources are specific to the type of tool. For example, the code_interpreter tool requires a list of file IDs, while the file_search tool requires a list of vector store IDs.
    #[serde(default)]
    pub tool_resources: Option<ToolResources>,
    /// Set of 16 key-value pairs that can be attached to an object. This can be useful for storing additional information about the object in a structured format. Keys can be a maximum of 64 characters long and values can be a maximum of 512 characters long.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Serialize, Builder, Debug, Clone, Default)]
#[builder(pattern = "owned")]
#[builder(name = "CreateThreadBuilder")]
#[builder(setter(strip_option, into))]
#[builder(build_fn(error = "OpenAiError"))]
pub struct CreateThreadRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub messages: Vec<CreateMessageRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub tool_resources: Option<ToolResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CreateThreadRequest {
    pub fn builder() -> CreateThreadBuilder {
        CreateThreadBuilder::create_empty()
    }

    /// A thread opened with a single user message.
    pub fn with_user_message(content: impl Into<String>) -> Self {
        CreateThreadRequest {
            messages: vec![CreateMessageRequest::user(content)],
            ..Default::default()
        }
    }
}

#[derive(Serialize, Builder, Debug, Clone)]
#[builder(pattern = "owned")]
#[builder(name = "CreateMessageBuilder")]
#[builder(setter(strip_option, into))]
#[builder(build_fn(error = "OpenAiError"))]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CreateMessageRequest {
    pub fn builder(role: Role, content: impl Into<String>) -> CreateMessageBuilder {
        CreateMessageBuilder::create_empty()
            .role(role)
            .content(content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        CreateMessageRequest {
            role: Role::User,
            content: content.into(),
            attachments: None,
            metadata: None,
        }
    }
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct UpdateThreadRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl OpenAiClient {
    pub async fn create_thread(&self, request: CreateThreadRequest) -> ApiResponseOrError<Thread> {
        self.post("threads", &request).await
    }

    pub async fn get_thread(&self, thread_id: &str) -> ApiResponseOrError<Thread> {
        self.get(format!("threads/{thread_id}")).await
    }

    pub async fn update_thread(
        &self,
        thread_id: &str,
        request: UpdateThreadRequest,
    ) -> ApiResponseOrError<Thread> {
        self.patch(format!("threads/{thread_id}"), &request).await
    }

    pub async fn delete_thread(&self, thread_id: &str) -> ApiResponseOrError<Deleted> {
        self.delete(format!("threads/{thread_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_thread_with_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/threads"))
            .and(body_json(json!({
                "messages": [{ "role": "user", "content": "What is the opposite color of blue" }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "thread_1", "object": "thread", "created_at": 1 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let thread = client
            .create_thread(CreateThreadRequest::with_user_message(
                "What is the opposite color of blue",
            ))
            .await
            .unwrap();
        assert_eq!(thread.id, "thread_1");
        assert!(thread.tool_resources.is_none());
    }

    #[tokio::test]
    async fn update_thread_attaches_vector_store() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/threads/thread_1"))
            .and(body_json(json!({
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_2"] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "thread_1",
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_2"] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let thread = client
            .update_thread(
                "thread_1",
                UpdateThreadRequest {
                    tool_resources: Some(ToolResources::file_search(["vs_2"])),
                    metadata: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            thread.tool_resources,
            Some(ToolResources::file_search(["vs_2"]))
        );
    }

    #[tokio::test]
    async fn get_thread_keeps_tool_resources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/threads/thread_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "thread_1",
                "object": "thread",
                "created_at": 1,
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_1", "vs_2"] } },
                "metadata": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let thread = client.get_thread("thread_1").await.unwrap();
        assert_eq!(
            thread.tool_resources,
            Some(ToolResources::file_search(["vs_1", "vs_2"]))
        );
    }

    #[test]
    fn message_builder_sets_role() {
        let message = CreateMessageRequest::builder(Role::User, "And who is the antagonist?")
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(message).unwrap(),
            json!({ "role": "user", "content": "And who is the antagonist?" })
        );
    }
}
