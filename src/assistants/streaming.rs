//! Server-sent events of a streamed run.
//!
//! A [`RunStream`] is consumed on the calling task, one event at a time.
//! [`RunStream::until_done`] expands every raw event into [`HandlerEvent`]s and
//! hands them to a single callback, which can ignore the variants it does not
//! care about.

use std::collections::HashSet;

use futures_util::StreamExt;
use reqwest_eventsource::{retry::Never, Event, EventSource};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{client::OpenAiClient, ApiResponseOrError, OpenAiError};

use super::runs::{CreateRunRequest, Run};

/// One raw event: the SSE event name and its JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantStreamEvent {
    pub event: String,
    pub data: Value,
}

impl AssistantStreamEvent {
    pub fn is_done(&self) -> bool {
        self.event == "done"
    }

    /// Events carrying a full run object (`thread.run.*`, steps excluded).
    fn is_run_snapshot(&self) -> bool {
        self.event.starts_with("thread.run.") && !self.event.starts_with("thread.run.step.")
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunStepDelta {
    pub id: String,
    pub delta: RunStepDeltaBody,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunStepDeltaBody {
    #[serde(default)]
    pub step_details: Option<StepDetails>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StepDetails {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StepDetails {
    /// The payload stored under the key named by `kind`, e.g. `message_creation`.
    pub fn details(&self) -> Option<&Value> {
        self.fields.get(&self.kind)
    }

    pub fn is_tool_calls(&self) -> bool {
        self.kind == "tool_calls"
    }

    fn tool_calls(&self) -> &[Value] {
        match self.fields.get("tool_calls") {
            Some(Value::Array(tool_calls)) => tool_calls,
            _ => &[],
        }
    }
}

/// What a stream handler gets to see.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent<'a> {
    /// Every raw event, before any of the derived variants.
    Event(&'a AssistantStreamEvent),
    TextDelta(String),
    RunStepDelta(RunStepDelta),
    ToolCallCreated(Value),
    ToolCallDone(Value),
}

/// Derives [`HandlerEvent`]s from raw events, remembering which tool calls were
/// already announced.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    announced_tool_calls: HashSet<(String, u64)>,
}

impl EventDispatcher {
    pub fn expand<'a>(&mut self, event: &'a AssistantStreamEvent) -> Vec<HandlerEvent<'a>> {
        let mut events = vec![HandlerEvent::Event(event)];

        match event.event.as_str() {
            "thread.message.delta" => {
                let parts = event.data["delta"]["content"].as_array();
                for part in parts.into_iter().flatten() {
                    if part["type"] == "text" {
                        if let Some(value) = part["text"]["value"].as_str() {
                            events.push(HandlerEvent::TextDelta(value.to_string()));
                        }
                    }
                }
            }
            "thread.run.step.delta" => {
                match serde_json::from_value::<RunStepDelta>(event.data.clone()) {
                    Ok(delta) => {
                        let created = self.newly_created_tool_calls(&delta);
                        events.push(HandlerEvent::RunStepDelta(delta));
                        events.extend(created.into_iter().map(HandlerEvent::ToolCallCreated));
                    }
                    Err(err) => log::warn!("Ignoring malformed run step delta: {err}"),
                }
            }
            "thread.run.step.completed" => {
                if let Ok(details) =
                    serde_json::from_value::<StepDetails>(event.data["step_details"].clone())
                {
                    if details.is_tool_calls() {
                        events.extend(
                            details
                                .tool_calls()
                                .iter()
                                .cloned()
                                .map(HandlerEvent::ToolCallDone),
                        );
                    }
                }
            }
            _ => {}
        }

        events
    }

    fn newly_created_tool_calls(&mut self, delta: &RunStepDelta) -> Vec<Value> {
        let Some(details) = delta.delta.step_details.as_ref() else {
            return Vec::new();
        };
        if !details.is_tool_calls() {
            return Vec::new();
        }
        details
            .tool_calls()
            .iter()
            .enumerate()
            .filter(|(position, tool_call)| {
                let index = tool_call["index"].as_u64().unwrap_or(*position as u64);
                self.announced_tool_calls.insert((delta.id.clone(), index))
            })
            .map(|(_, tool_call)| tool_call.clone())
            .collect()
    }
}

pub struct RunStream {
    source: EventSource,
    dispatcher: EventDispatcher,
    run: Option<Run>,
    finished: bool,
}

impl std::fmt::Debug for RunStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStream")
            .field("finished", &self.finished)
            .finish()
    }
}

impl RunStream {
    fn new(mut source: EventSource) -> Self {
        source.set_retry_policy(Box::new(Never));
        RunStream {
            source,
            dispatcher: EventDispatcher::default(),
            run: None,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.source.close();
    }

    /// Latest run snapshot seen on the stream.
    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    /// Next raw event; `None` once the `done` event was delivered or the server hung up.
    pub async fn next_event(&mut self) -> Option<ApiResponseOrError<AssistantStreamEvent>> {
        if self.finished {
            return None;
        }

        while let Some(event) = self.source.next().await {
            let message = match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => message,
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(err) => {
                    self.finish();
                    return Some(Err(err.into()));
                }
            };

            let data = if message.data == "[DONE]" {
                Value::Null
            } else {
                serde_json::from_str(&message.data).unwrap_or_else(|err| {
                    log::warn!("Event `{}` carries non-JSON data: {err}", message.event);
                    Value::String(message.data.clone())
                })
            };
            let event = AssistantStreamEvent {
                event: message.event,
                data,
            };

            if event.is_done() {
                self.finish();
            } else if event.event == "error" {
                self.finish();
                return Some(Err(stream_error(&event.data)));
            } else if event.is_run_snapshot() {
                match serde_json::from_value::<Run>(event.data.clone()) {
                    Ok(run) => self.run = Some(run),
                    Err(err) => log::warn!("Ignoring malformed `{}` run: {err}", event.event),
                }
            }
            return Some(Ok(event));
        }

        self.finish();
        None
    }

    /// Consumes the stream, calling `handler` for every derived event, and
    /// returns the last run snapshot.
    pub async fn until_done<F>(mut self, mut handler: F) -> ApiResponseOrError<Option<Run>>
    where
        F: FnMut(HandlerEvent<'_>),
    {
        while let Some(event) = self.next_event().await {
            let event = event?;
            for handler_event in self.dispatcher.expand(&event) {
                handler(handler_event);
            }
        }
        Ok(self.run)
    }
}

fn stream_error(data: &Value) -> OpenAiError {
    let error = data.get("error").unwrap_or(data);
    match serde_json::from_value::<OpenAiError>(error.clone()) {
        Ok(error) => error,
        Err(_) => OpenAiError::new(error.to_string(), "stream".to_string()),
    }
}

impl OpenAiClient {
    /// Creates a run with `stream: true`; events are read through the returned stream.
    pub fn stream_run(
        &self,
        thread_id: &str,
        mut request: CreateRunRequest,
    ) -> ApiResponseOrError<RunStream> {
        request.stream = Some(true);
        let source = self.post_stream(format!("threads/{thread_id}/runs"), &request)?;
        Ok(RunStream::new(source))
    }
}
