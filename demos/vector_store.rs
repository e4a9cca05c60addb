//! File search over vector stores.
//!
//! Files are embedded one at a time; batch embedding and embedding of message
//! attachments are not available on the server.

use bee_openai::{
    assistants::{
        runs::CreateRunRequest,
        threads::{CreateMessageRequest, CreateThreadRequest, UpdateThreadRequest},
        vector_stores::CreateVectorStoreRequest,
        CreateAssistantRequest, Tool, ToolResources,
    },
    files::FilePurpose,
    ListQuery,
};

mod common;
use common::{heading, print_json, MODEL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = common::setup()?;

    println!("{}", heading("1. Upload a demo file"));
    let file = client
        .upload_file(
            "story.txt",
            "text/plain",
            "Main character name is: The Bee!",
            FilePurpose::Assistants,
        )
        .await?;
    print_json("File", &file);

    println!("{}", heading("2. Create a vector store and add the file"));
    let vector_store = client
        .create_vector_store(CreateVectorStoreRequest::named("Bedtime story"))
        .await?;
    let vector_store_file = client
        .create_vector_store_file_and_poll(&vector_store.id, &file.id)
        .await?;
    print_json("Vector store file", &vector_store_file);

    println!("{}", heading("3. Create assistant with vector store attached"));
    let assistant = client
        .create_assistant(
            CreateAssistantRequest::builder(MODEL)
                .tools(vec![Tool::file_search()])
                .tool_resources(ToolResources::file_search([vector_store.id.as_str()]))
                .build()?,
        )
        .await?;
    print_json("Assistant", &assistant);

    println!("{}", heading("4. Create thread and run"));
    let thread = client
        .create_thread(CreateThreadRequest::with_user_message(
            "Who is the main character according to the files?",
        ))
        .await?;
    client
        .create_and_poll(&thread.id, CreateRunRequest::new(&assistant.id))
        .await?
        .ensure_completed()?;
    let messages = client.list_messages(&thread.id, &ListQuery::default()).await?;
    println!("Answer: {}", messages.first_text().unwrap_or_default());

    println!(
        "{}",
        heading("5. (Advanced): Create a second vector store for 'thread-local' files")
    );
    let file_2 = client
        .upload_file(
            "story2.txt",
            "text/plain",
            "Antagonist is: The Vasp!",
            FilePurpose::Assistants,
        )
        .await?;
    let thread_vector_store = client
        .create_vector_store(CreateVectorStoreRequest::named("Bedtime story chapter 2"))
        .await?;
    let vector_store_file = client
        .create_vector_store_file_and_poll(&thread_vector_store.id, &file_2.id)
        .await?;
    print_json("Vector store file", &vector_store_file);

    println!("{}", heading("6. (Advanced): Attach vector store to the thread"));
    let thread = client
        .update_thread(
            &thread.id,
            UpdateThreadRequest {
                tool_resources: Some(ToolResources::file_search([thread_vector_store.id.as_str()])),
                metadata: None,
            },
        )
        .await?;
    print_json("Thread", &thread);

    println!("{}", heading("7. (Advanced): Add message and create run"));
    // Once file_2 is embedded in the thread's store the assistant can read it,
    // so attaching it to the message is optional.
    client
        .create_message(&thread.id, CreateMessageRequest::user("And who is the antagonist?"))
        .await?;
    client
        .create_and_poll(&thread.id, CreateRunRequest::new(&assistant.id))
        .await?
        .ensure_completed()?;
    let messages = client.list_messages(&thread.id, &ListQuery::default()).await?;
    println!("Answer: {}", messages.first_text().unwrap_or_default());

    client.delete_file(&file.id).await?;
    client.delete_file(&file_2.id).await?;
    client.delete_thread(&thread.id).await?;
    client.delete_vector_store(&vector_store.id).await?;
    client.delete_vector_store(&thread_vector_store.id).await?;
    client.delete_assistant(&assistant.id).await?;
    Ok(())
}
