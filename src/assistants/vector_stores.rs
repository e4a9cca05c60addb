use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    client::{Deleted, OpenAiClient},
    ApiResponseOrError,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub usage_bytes: u64,
    #[serde(default)]
    pub file_counts: FileCounts,
    #[serde(default)]
    pub status: Option<VectorStoreStatus>,
    #[serde(default)]
    pub expires_after: Option<ExpiresAfter>,
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub last_active_at: Option<u64>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FileCounts {
    pub in_progress: u32,
    pub completed: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub total: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreStatus {
    Expired,
    InProgress,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExpiresAfter {
    pub anchor: String,
    pub days: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CreateVectorStoreRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<ExpiresAfter>,
}

impl CreateVectorStoreRequest {
    pub fn named(name: impl Into<String>) -> Self {
        CreateVectorStoreRequest {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VectorStoreFile {
    /// Same as the id of the attached file.
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: u64,
    pub vector_store_id: String,
    #[serde(default)]
    pub usage_bytes: u64,
    pub status: VectorStoreFileStatus,
    #[serde(default)]
    pub last_error: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreFileStatus {
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl OpenAiClient {
    pub async fn create_vector_store(
        &self,
        request: CreateVectorStoreRequest,
    ) -> ApiResponseOrError<VectorStore> {
        self.post("vector_stores", &request).await
    }

    pub async fn get_vector_store(&self, vector_store_id: &str) -> ApiResponseOrError<VectorStore> {
        self.get(format!("vector_stores/{vector_store_id}")).await
    }

    pub async fn delete_vector_store(&self, vector_store_id: &str) -> ApiResponseOrError<Deleted> {
        self.delete(format!("vector_stores/{vector_store_id}"))
            .await
    }

    pub async fn attach_file_to_vector_store(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> ApiResponseOrError<VectorStoreFile> {
        self.post(
            format!("vector_stores/{vector_store_id}/files"),
            &json!({ "file_id": file_id }),
        )
        .await
    }

    pub async fn get_vector_store_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> ApiResponseOrError<VectorStoreFile> {
        self.get(format!("vector_stores/{vector_store_id}/files/{file_id}"))
            .await
    }

    /// Attaches the file and waits until it is no longer being processed.
    pub async fn create_vector_store_file_and_poll(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> ApiResponseOrError<VectorStoreFile> {
        let mut file = self
            .attach_file_to_vector_store(vector_store_id, file_id)
            .await?;
        while file.status == VectorStoreFileStatus::InProgress {
            tokio::time::sleep(self.poll_interval()).await;
            file = self.get_vector_store_file(vector_store_id, file_id).await?;
            log::debug!("Vector store file {} is {}", file.id, file.status);
        }
        if file.status != VectorStoreFileStatus::Completed {
            log::warn!(
                "File {} ended {} in vector store {vector_store_id}",
                file.id,
                file.status
            );
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_client;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_file(status: &str) -> Value {
        json!({
            "id": "file_1",
            "object": "vector_store.file",
            "created_at": 1,
            "vector_store_id": "vs_1",
            "usage_bytes": 0,
            "status": status,
            "last_error": null
        })
    }

    #[tokio::test]
    async fn create_named_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/vector_stores"))
            .and(body_json(json!({ "name": "Bedtime story" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "vs_1",
                "object": "vector_store",
                "name": "Bedtime story",
                "status": "completed",
                "file_counts": { "in_progress": 0, "completed": 0, "failed": 0, "cancelled": 0, "total": 0 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let store = client
            .create_vector_store(CreateVectorStoreRequest::named("Bedtime story"))
            .await
            .unwrap();
        assert_eq!(store.name.as_deref(), Some("Bedtime story"));
        assert_eq!(store.status, Some(VectorStoreStatus::Completed));
    }

    #[tokio::test]
    async fn get_store_reports_file_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vector_stores/vs_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "vs_1",
                "name": "Bedtime story",
                "status": "in_progress",
                "file_counts": { "in_progress": 1, "completed": 2, "total": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let store = client.get_vector_store("vs_1").await.unwrap();
        assert_eq!(store.status, Some(VectorStoreStatus::InProgress));
        assert_eq!(store.file_counts.total, 3);
        assert_eq!(store.file_counts.failed, 0);
    }

    #[tokio::test]
    async fn attach_and_poll_until_processed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/vector_stores/vs_1/files"))
            .and(body_json(json!({ "file_id": "file_1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(store_file("in_progress")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/vector_stores/vs_1/files/file_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(store_file("in_progress")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/vector_stores/vs_1/files/file_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(store_file("completed")))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let file = client
            .create_vector_store_file_and_poll("vs_1", "file_1")
            .await
            .unwrap();
        assert_eq!(file.status, VectorStoreFileStatus::Completed);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_file_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/vector_stores/vs_1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "file_1",
                "vector_store_id": "vs_1",
                "status": "failed",
                "last_error": { "code": "invalid_file", "message": "empty file" }
            })))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let file = client
            .create_vector_store_file_and_poll("vs_1", "file_1")
            .await
            .unwrap();
        assert_eq!(file.status, VectorStoreFileStatus::Failed);
        assert_eq!(file.last_error.unwrap()["code"], "invalid_file");
    }
}
