//! Run traces from the observe API.
//!
//! The trace id is looked up on the assistant API; the trace itself lives
//! under a different root (`{server}/observe`) and is fetched with an
//! [`ObserveClient`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{client::OpenAiClient, ApiResponseOrError};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TraceInfo {
    pub id: String,
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceQuery {
    pub include_tree: bool,
    pub include_mlflow: bool,
}

impl TraceQuery {
    pub fn full() -> Self {
        TraceQuery {
            include_tree: true,
            include_mlflow: true,
        }
    }
}

/// Client for the observe API, sharing the key of the client it came from.
#[derive(Debug, Clone)]
pub struct ObserveClient {
    inner: OpenAiClient,
}

impl ObserveClient {
    pub async fn get_trace(&self, trace_id: &str, query: &TraceQuery) -> ApiResponseOrError<Value> {
        self.inner
            .get_with_query(format!("trace/{trace_id}"), query)
            .await
    }
}

impl OpenAiClient {
    pub fn observe(&self) -> ApiResponseOrError<ObserveClient> {
        let inner = OpenAiClient::new(self.credentials().observe())?
            .with_poll_interval(self.poll_interval());
        Ok(ObserveClient { inner })
    }

    pub async fn get_run_trace_info(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> ApiResponseOrError<TraceInfo> {
        self.get(format!("threads/{thread_id}/runs/{run_id}/trace"))
            .await
    }
}
