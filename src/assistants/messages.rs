use crate::{
    assistants::Tool,
    client::{List, ListQuery, OpenAiClient},
    ApiResponseOrError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::threads::CreateMessageRequest;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: u64,
    /// The thread ID that this message belongs to.
    pub thread_id: String,
    /// The status of the message, which can be either in_progress, incomplete, or completed.
    #[serde(default)]
    pub status: Option<String>,
    /// The entity that produced the message. One of user or assistant
    pub role: Role,
    /// The content of the message.
    #[serde(default)]
    pub content: Vec<Content>,
    /// The assistant that produced the message.
    #[serde(default)]
    pub assistant_id: Option<String>,
    /// The ID of the run associated with the creation of this message. Value is null when messages are created manually using the create message or create thread endpoints.
    #[serde(default)]
    pub run_id: Option<String>,
    /// A list of files attached to the message.
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl Message {
    /// Text of the first content part, when that part is text.
    pub fn text(&self) -> Option<&str> {
        match self.content.first() {
            Some(Content::Text { text }) => Some(text.value.as_str()),
            _ => None,
        }
    }
}

impl List<Message> {
    /// The answer: text of the first message of a newest-first listing.
    pub fn first_text(&self) -> Option<&str> {
        self.data.first().and_then(Message::text)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: Text },
    ImageFile { image_file: ImageFile },
    ImageUrl { image_url: ImageUrl },
    Refusal { refusal: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Text {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageFile {
    pub file_id: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Attachment {
    pub file_id: String,
    pub tools: Vec<Tool>,
}

impl OpenAiClient {
    pub async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> ApiResponseOrError<Message> {
        self.post(format!("threads/{thread_id}/messages"), &request)
            .await
    }

    /// One page of the thread's messages, newest first unless `query` says otherwise.
    pub async fn list_messages(
        &self,
        thread_id: &str,
        query: &ListQuery,
    ) -> ApiResponseOrError<List<Message>> {
        self.list(format!("threads/{thread_id}/messages"), query)
            .await
    }
}
