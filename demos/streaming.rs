//! Streams the events of a run as they happen.
//!
//! Tool call events are delivered but not acted upon.

use std::io::{stdout, Write};

use bee_openai::assistants::{
    runs::CreateRunRequest,
    streaming::HandlerEvent,
    threads::CreateThreadRequest,
    CreateAssistantRequest, Tool,
};

mod common;
use common::{heading, print_json, MODEL};

fn on_event(event: HandlerEvent<'_>) {
    match event {
        HandlerEvent::Event(event) => println!("event > {}", event.event),
        HandlerEvent::TextDelta(text) => {
            print!("{text}");
            stdout().flush().ok();
        }
        HandlerEvent::RunStepDelta(delta) => {
            if let Some(details) = delta.delta.step_details {
                if !details.is_tool_calls() {
                    let payload = details.details().cloned().unwrap_or_default();
                    println!("{} > {payload}", details.kind);
                }
            }
        }
        HandlerEvent::ToolCallCreated(_) | HandlerEvent::ToolCallDone(_) => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = common::setup()?;

    println!("{}", heading("Create assistant with code_interpreter tool enabled."));
    let assistant = client
        .create_assistant(
            CreateAssistantRequest::builder(MODEL)
                .tools(vec![Tool::CodeInterpreter])
                .build()?,
        )
        .await?;
    print_json("Assistant", &assistant);

    println!("{}", heading("Run model and get answer"));
    let thread = client
        .create_thread(CreateThreadRequest::with_user_message(
            "Generate first 10 fibonacci numbers using python",
        ))
        .await?;

    let stream = client.stream_run(&thread.id, CreateRunRequest::new(&assistant.id))?;
    if let Some(run) = stream.until_done(on_event).await? {
        log::info!("Run {} finished as {}", run.id, run.status);
    }

    client.delete_assistant(&assistant.id).await?;
    Ok(())
}
