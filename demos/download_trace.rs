//! Downloads the trace of a run from the observe API, which lives under
//! `{BEE_API}/observe` rather than `{BEE_API}/v1`.

use bee_openai::{
    assistants::{runs::CreateRunRequest, threads::CreateThreadRequest, CreateAssistantRequest},
    trace::TraceQuery,
};

mod common;
use common::{heading, print_json, MODEL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = common::setup()?;
    let observe = client.observe()?;

    println!("{}", heading("Create run"));
    let assistant = client
        .create_assistant(CreateAssistantRequest::builder(MODEL).build()?)
        .await?;
    let thread = client
        .create_thread(CreateThreadRequest::with_user_message(
            "What is the opposite color of blue",
        ))
        .await?;
    let run = client
        .create_and_poll(&thread.id, CreateRunRequest::new(&assistant.id))
        .await?
        .ensure_completed()?;
    print_json("Run", &run);

    println!("{}", heading("Download trace"));
    let trace_info = client.get_run_trace_info(&thread.id, &run.id).await?;
    let trace = observe.get_trace(&trace_info.id, &TraceQuery::full()).await?;
    print_json("Trace", &trace);

    client.delete_assistant(&assistant.id).await?;
    Ok(())
}
