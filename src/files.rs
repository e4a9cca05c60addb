use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::{
    client::{Deleted, List, ListQuery, OpenAiClient},
    ApiResponseOrError,
};

const FILE_URN_PREFIX: &str = "urn:bee:file:";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct File {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: u64,
    pub filename: String,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FilePurpose {
    Assistants,
    AssistantsOutput,
}

impl OpenAiClient {
    /// Uploads `content` as a multipart form with `file` and `purpose` fields.
    pub async fn upload_file(
        &self,
        filename: impl Into<String>,
        mime_type: &str,
        content: impl Into<Vec<u8>>,
        purpose: FilePurpose,
    ) -> ApiResponseOrError<File> {
        let part = Part::bytes(content.into())
            .file_name(filename.into())
            .mime_str(mime_type)?;
        let form = Form::new()
            .part("file", part)
            .text("purpose", purpose.to_string());
        self.post_multipart("files", form).await
    }

    pub async fn get_file(&self, file_id: &str) -> ApiResponseOrError<File> {
        self.get(format!("files/{file_id}")).await
    }

    /// Raw bytes of the file.
    pub async fn file_content(&self, file_id: &str) -> ApiResponseOrError<Vec<u8>> {
        self.get_bytes(format!("files/{file_id}/content")).await
    }

    pub async fn list_files(&self, query: &ListQuery) -> ApiResponseOrError<List<File>> {
        self.list("files", query).await
    }

    pub async fn delete_file(&self, file_id: &str) -> ApiResponseOrError<Deleted> {
        self.delete(format!("files/{file_id}")).await
    }
}

/// Id of the last `urn:bee:file:<id>` reference in `text`.
///
/// Answers link input files before the file they produced, so the last
/// reference wins. Links are usually markdown, so the id ends at the first
/// whitespace or closing bracket.
pub fn file_id_from_urn(text: &str) -> Option<&str> {
    let start = text.rfind(FILE_URN_PREFIX)? + FILE_URN_PREFIX.len();
    let rest = &text[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || matches!(c, ')' | ']' | '"' | '\''))
        .unwrap_or(rest.len());
    let id = rest[..end].trim_end_matches(['.', ',']);
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_client;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn file_urn_in_markdown_link() {
        let answer = "Here it is: [fibonacci.txt](urn:bee:file:3f2c-91ab). Enjoy!";
        assert_eq!(file_id_from_urn(answer), Some("3f2c-91ab"));
    }

    #[test]
    fn file_urn_at_end_of_sentence() {
        assert_eq!(
            file_id_from_urn("Saved as urn:bee:file:abc123."),
            Some("abc123")
        );
    }

    #[test]
    fn generated_file_is_the_last_reference() {
        let answer = "Input [data](urn:bee:file:input1) produced [fib](urn:bee:file:out2)";
        assert_eq!(file_id_from_urn(answer), Some("out2"));
        assert_eq!(file_id_from_urn("urn:bee:file:abc urn:bee:file:def"), Some("def"));
    }

    #[test]
    fn missing_file_urn() {
        assert_eq!(file_id_from_urn("I could not create the file."), None);
        assert_eq!(file_id_from_urn("urn:bee:file: nothing"), None);
    }

    #[test]
    fn purpose_wire_name() {
        assert_eq!(FilePurpose::Assistants.to_string(), "assistants");
        assert_eq!(
            serde_json::to_value(FilePurpose::AssistantsOutput).unwrap(),
            json!("assistants_output")
        );
    }

    #[tokio::test]
    async fn upload_then_download() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/files"))
            .and(header_exists("content-type"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "file_1",
                "object": "file",
                "bytes": 32,
                "created_at": 1,
                "filename": "story.txt",
                "purpose": "assistants"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/files/file_1/content"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("Main character name is: The Bee!", "text/plain"),
            )
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let file = client
            .upload_file(
                "story.txt",
                "text/plain",
                "Main character name is: The Bee!",
                FilePurpose::Assistants,
            )
            .await
            .unwrap();
        assert_eq!(file.filename, "story.txt");

        let content = client.file_content(&file.id).await.unwrap();
        assert_eq!(content, b"Main character name is: The Bee!");

        let requests = server.received_requests().await.unwrap();
        let upload = String::from_utf8_lossy(&requests[0].body);
        assert!(upload.contains("name=\"purpose\""));
        assert!(upload.contains("filename=\"story.txt\""));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/file_404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "message": "File not found", "type": "not_found", "code": "not_found" }
            })))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let error = client.get_file("file_404").await.unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn list_files_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    { "id": "file_1", "filename": "story.txt", "purpose": "assistants" },
                    { "id": "file_2", "filename": "fibonacci.txt", "purpose": "assistants_output" }
                ],
                "first_id": "file_1",
                "last_id": "file_2",
                "has_more": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let files = client
            .list_files(&ListQuery {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = files.data.iter().map(|file| file.filename.as_str()).collect();
        assert_eq!(names, ["story.txt", "fibonacci.txt"]);
        assert!(files.has_more);
        assert_eq!(files.last_id.as_deref(), Some("file_2"));
    }
}
