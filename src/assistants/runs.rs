use derive_builder::Builder;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{collections::HashMap, future::Future};

use crate::{assistants::Tool, client::OpenAiClient, ApiResponseOrError, OpenAiError};

use super::threads::CreateMessageRequest;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: u64,
    /// The ID of the assistant used for this run.
    pub assistant_id: String,
    /// The ID of the thread associated with this run.
    pub thread_id: String,
    /// The status of the run.
    pub status: Status,
    /// Details on the action required to continue the run. Will be null if no action is required.
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    /// The last error that occurred during this run.
    #[serde(default)]
    pub last_error: Option<LastError>,

    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub completed_at: Option<u64>,
    #[serde(default)]
    pub cancelled_at: Option<u64>,
    #[serde(default)]
    pub failed_at: Option<u64>,
    #[serde(default)]
    pub incomplete_details: Option<Value>,

    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl Status {
    /// The run is over and will not change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Completed
                | Status::Failed
                | Status::Cancelled
                | Status::Expired
                | Status::Incomplete
        )
    }

    /// The server is still working; `requires_action` waits on the caller instead.
    pub fn needs_polling(&self) -> bool {
        matches!(self, Status::Queued | Status::InProgress | Status::Cancelling)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolOutputs {
        submit_tool_outputs: SubmitToolOutputs,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// The ID of the tool call, echoed back with its output.
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON encoded arguments, as generated by the model. Not guaranteed to be valid.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LastError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Run {
    /// Tool calls the run is waiting on, empty unless it requires action.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match &self.required_action {
            Some(RequiredAction::SubmitToolOutputs {
                submit_tool_outputs,
            }) => &submit_tool_outputs.tool_calls,
            None => &[],
        }
    }

    /// Fails unless the run reached `completed`.
    pub fn ensure_completed(self) -> Result<Run, UnexpectedRunStatus> {
        if self.status == Status::Completed {
            Ok(self)
        } else {
            Err(UnexpectedRunStatus {
                status: self.status,
                last_error: self.last_error,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnexpectedRunStatus {
    pub status: Status,
    pub last_error: Option<LastError>,
}

impl std::fmt::Display for UnexpectedRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Run is in an unexpected state: {}\nError: ", self.status)?;
        match &self.last_error {
            Some(error) => write!(f, "{error}"),
            None => f.write_str("None"),
        }
    }
}

impl std::error::Error for UnexpectedRunStatus {}

#[derive(Serialize, Builder, Debug, Clone, Default)]
#[builder(pattern = "owned")]
#[builder(name = "CreateRunBuilder")]
#[builder(setter(strip_option, into))]
#[builder(build_fn(error = "OpenAiError"))]
pub struct CreateRunRequest {
    /// ID of the assistant to use.
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub additional_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub additional_messages: Option<Vec<CreateMessageRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
    /// Set by the streaming helpers.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub stream: Option<bool>,
}

impl CreateRunRequest {
    pub fn builder(assistant_id: impl Into<String>) -> CreateRunBuilder {
        CreateRunBuilder::create_empty().assistant_id(assistant_id)
    }

    pub fn new(assistant_id: impl Into<String>) -> Self {
        CreateRunRequest {
            assistant_id: assistant_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolOutput>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

pub type FunctionHandler =
    Box<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Local functions the assistant may call, keyed by the name they were declared with.
#[derive(Default)]
pub struct FunctionRegistry {
    handlers: HashMap<String, FunctionHandler>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.handlers
            .insert(name.into(), Box::new(move |arguments| Box::pin(handler(arguments))));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Runs the handler for one call. Failures are reported to the model as an
    /// `{"error": ...}` output so every call still gets answered.
    pub async fn call(&self, tool_call: &ToolCall) -> ToolOutput {
        let name = &tool_call.function.name;
        let output = match self.handlers.get(name) {
            None => {
                log::warn!("Assistant called unknown function `{name}`");
                json!({ "error": format!("unknown function `{name}`") })
            }
            Some(handler) => match parse_arguments(&tool_call.function.arguments) {
                Err(err) => json!({ "error": format!("invalid arguments: {err}") }),
                Ok(arguments) => match handler(arguments).await {
                    Ok(output) => output,
                    Err(err) => {
                        log::warn!("Function `{name}` failed: {err:#}");
                        json!({ "error": err.to_string() })
                    }
                },
            },
        };

        ToolOutput {
            tool_call_id: tool_call.id.clone(),
            output: output.to_string(),
        }
    }

    /// One output per call, in call order.
    pub async fn outputs_for(&self, tool_calls: &[ToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(tool_calls.len());
        for tool_call in tool_calls {
            outputs.push(self.call(tool_call).await);
        }
        outputs
    }
}

fn parse_arguments(arguments: &str) -> serde_json::Result<Value> {
    if arguments.trim().is_empty() {
        Ok(json!({}))
    } else {
        serde_json::from_str(arguments)
    }
}

impl OpenAiClient {
    pub async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        self.post(format!("threads/{thread_id}/runs"), &request)
            .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run> {
        self.get(format!("threads/{thread_id}/runs/{run_id}")).await
    }

    /// Re-fetches the run until it is terminal or waits on tool outputs.
    pub async fn poll_run(&self, mut run: Run) -> ApiResponseOrError<Run> {
        while run.status.needs_polling() {
            tokio::time::sleep(self.poll_interval()).await;
            let (thread_id, run_id) = (run.thread_id.clone(), run.id.clone());
            run = self.get_run(&thread_id, &run_id).await?;
            log::debug!("Run {} is {}", run.id, run.status);
        }
        Ok(run)
    }

    pub async fn create_and_poll(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        let run = self.create_run(thread_id, request).await?;
        self.poll_run(run).await
    }

    pub async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: Vec<ToolOutput>,
    ) -> ApiResponseOrError<Run> {
        self.post(
            format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &SubmitToolOutputsRequest { tool_outputs },
        )
        .await
    }

    pub async fn submit_tool_outputs_and_poll(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: Vec<ToolOutput>,
    ) -> ApiResponseOrError<Run> {
        let run = self
            .submit_tool_outputs(thread_id, run_id, tool_outputs)
            .await?;
        self.poll_run(run).await
    }

    /// Answers every `requires_action` round with `functions` until the run
    /// no longer waits on the caller.
    pub async fn drive_run(
        &self,
        mut run: Run,
        functions: &FunctionRegistry,
    ) -> ApiResponseOrError<Run> {
        while run.status == Status::RequiresAction {
            if run.tool_calls().is_empty() {
                log::warn!("Run {} requires action without tool calls", run.id);
                break;
            }
            let tool_outputs = functions.outputs_for(run.tool_calls()).await;
            let (thread_id, run_id) = (run.thread_id.clone(), run.id.clone());
            run = self
                .submit_tool_outputs_and_poll(&thread_id, &run_id, tool_outputs)
                .await?;
        }
        Ok(run)
    }
}
