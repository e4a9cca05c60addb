//! Conversation with an assistant that generates a file, which is then downloaded.

use anyhow::Context;
use bee_openai::{
    assistants::{runs::CreateRunRequest, threads::CreateThreadRequest, CreateAssistantRequest, Tool},
    files::file_id_from_urn,
    ListQuery,
};

mod common;
use common::{heading, print_json, MODEL};

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
            "Generate first 10 fibonacci numbers and save them to fibonacci.txt",
        ))
        .await?;
    client
        .create_and_poll(&thread.id, CreateRunRequest::new(&assistant.id))
        .await?;
    let messages = client.list_messages(&thread.id, &ListQuery::default()).await?;
    let answer = messages.first_text().unwrap_or_default();
    println!("Answer: {answer}");

    let file_id = file_id_from_urn(answer).context("Assistant did not generate a file")?;

    println!("{}", heading("Download generated attachments"));
    let file = client.get_file(file_id).await?;
    let content = client.file_content(file_id).await?;
    print_json("File", &file);
    println!("File content:\n{}", String::from_utf8_lossy(&content));

    client.delete_thread(&thread.id).await?;
    client.delete_assistant(&assistant.id).await?;
    Ok(())
}
