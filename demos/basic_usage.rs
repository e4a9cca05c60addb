//! Basic conversation with an assistant.

use bee_openai::{
    assistants::{threads::CreateThreadRequest, runs::CreateRunRequest, CreateAssistantRequest, Tool},
    ListQuery,
};

mod common;
use common::{heading, print_json, MODEL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = common::setup()?;

    println!("{}", heading("Create assistant"));
    let assistant = client
        .create_assistant(
            CreateAssistantRequest::builder(MODEL)
                .tools(vec![Tool::CodeInterpreter])
                .build()?,
        )
        .await?;
    print_json("Assistant", &assistant);

    println!("{}", heading("Create a thread with user message"));
    let question = "What is the unicode character U+1F41D? Create a haiku about it.";
    let thread = client
        .create_thread(CreateThreadRequest::with_user_message(question))
        .await?;

    println!("{}", heading("Create a run and wait for completion"));
    let run = client
        .create_and_poll(&thread.id, CreateRunRequest::new(&assistant.id))
        .await?
        .ensure_completed()?;
    print_json("Run", &run);

    println!("{}", heading("Get an answer"));
    let messages = client.list_messages(&thread.id, &ListQuery::default()).await?;
    println!("Answer: {}", messages.first_text().unwrap_or_default());

    client.delete_assistant(&assistant.id).await?;
    Ok(())
}
