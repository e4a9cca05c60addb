use std::time::Duration;

use crate::{ApiResponseOrError, Credentials, OpenAiError};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    multipart::Form,
    Client, Method, RequestBuilder, Response,
};
use reqwest_eventsource::{EventSource, RequestBuilderExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Delay between two status checks while polling runs or vector store files.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Clone)]
pub struct OpenAiClient {
    credentials: Credentials,
    client: Client,
    poll_interval: Duration,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenAiClient({})", self.credentials.base_url())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiErrorWrapper {
    error: OpenAiError,
}

/// Body returned by the delete endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Deleted {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub first_id: Option<String>,
    #[serde(default)]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Asc,
    Desc,
}

/// Cursor parameters accepted by the list endpoints.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

impl OpenAiClient {
    /// Client for the assistant API using `BEE_API` and `BEE_API_KEY`.
    pub fn from_env() -> ApiResponseOrError<Self> {
        Self::new(Credentials::from_env()?)
    }

    pub fn new(credentials: Credentials) -> ApiResponseOrError<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", credentials.api_key()))?,
        );
        headers.insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static("assistants=v2"),
        );
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            credentials,
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url(&self, route: &str) -> String {
        format!(
            "{}{}",
            self.credentials.base_url(),
            route.trim_start_matches('/')
        )
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        request: RequestBuilder,
    ) -> ApiResponseOrError<Response> {
        log::debug!("OpenAI Request[{method}] {url}");
        let response = request.send().await?;
        log::debug!(
            "OpenAI Response[{method}] {} {url}",
            response.status().as_str()
        );
        Ok(response)
    }

    async fn decode<T>(response: Response) -> ApiResponseOrError<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        // DELETE endpoints may answer with an empty body.
        let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
        Ok(serde_json::from_slice(body)?)
    }

    pub async fn request<S, R, T>(
        &self,
        method: Method,
        route: R,
        body: Option<&S>,
    ) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(route.as_ref());
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.send(method, url, request).await?;
        Self::decode(response).await
    }

    pub async fn get<R, T>(&self, route: R) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        T: DeserializeOwned,
    {
        self.request::<(), R, T>(Method::GET, route, None).await
    }

    pub async fn get_with_query<R, Q, T>(&self, route: R, query: &Q) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(route.as_ref());
        let request = self.client.get(&url).query(query);
        let response = self.send(Method::GET, url, request).await?;
        Self::decode(response).await
    }

    pub async fn post<S, R, T>(&self, route: R, body: &S) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, route, Some(body)).await
    }

    pub async fn patch<S, R, T>(&self, route: R, body: &S) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, route, Some(body)).await
    }

    pub async fn delete<R>(&self, route: R) -> ApiResponseOrError<Deleted>
    where
        R: AsRef<str>,
    {
        self.request::<(), R, Deleted>(Method::DELETE, route, None)
            .await
    }

    pub async fn post_multipart<R, T>(&self, route: R, form: Form) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        T: DeserializeOwned,
    {
        let url = self.url(route.as_ref());
        let request = self.client.post(&url).multipart(form);
        let response = self.send(Method::POST, url, request).await?;
        Self::decode(response).await
    }

    /// Raw response body, for endpoints that do not answer with JSON.
    pub async fn get_bytes<R>(&self, route: R) -> ApiResponseOrError<Vec<u8>>
    where
        R: AsRef<str>,
    {
        let url = self.url(route.as_ref());
        let request = self.client.get(&url);
        let response = self.send(Method::GET, url, request).await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(body.to_vec())
    }

    /// A single page of a list endpoint.
    pub async fn list<R, T>(&self, route: R, query: &ListQuery) -> ApiResponseOrError<List<T>>
    where
        R: AsRef<str>,
        T: DeserializeOwned,
    {
        self.get_with_query(route, query).await
    }

    /// Every item of a list endpoint, oldest first, following the `after` cursor.
    pub async fn list_all<R, T>(&self, route: R) -> ApiResponseOrError<Vec<T>>
    where
        R: AsRef<str>,
        T: DeserializeOwned,
    {
        let mut query = ListQuery {
            order: Some(Order::Asc),
            ..Default::default()
        };
        let mut data = Vec::new();

        loop {
            let page: List<T> = self.list(route.as_ref(), &query).await?;
            data.extend(page.data);
            match page.last_id {
                Some(last_id) if page.has_more => query.after = Some(last_id),
                _ => break,
            }
        }

        Ok(data)
    }

    /// Opens a server-sent event stream for a POST with a JSON body.
    pub fn post_stream<R, S>(&self, route: R, body: &S) -> ApiResponseOrError<EventSource>
    where
        R: AsRef<str>,
        S: Serialize + ?Sized,
    {
        let url = self.url(route.as_ref());
        log::debug!("OpenAI Stream[POST] {url}");
        Ok(self.client.post(&url).json(body).eventsource()?)
    }
}

fn api_error(status: u16, body: &[u8]) -> OpenAiError {
    let error = match serde_json::from_slice::<OpenAiErrorWrapper>(body) {
        Ok(wrapper) => wrapper.error,
        Err(_) => {
            let message = String::from_utf8_lossy(body).trim().to_string();
            let message = if message.is_empty() {
                format!("request failed with status {status}")
            } else {
                message
            };
            OpenAiError::new(message, "unknown".to_string())
        }
    };
    error.with_status(status)
}
