//! Custom tool hosted by Bee.
//!
//! The tool source is uploaded and executed in the server's Python sandbox,
//! so everything it imports must be available there.

use bee_openai::{
    assistants::{runs::CreateRunRequest, threads::CreateThreadRequest, CreateAssistantRequest, Tool},
    tools::CreateToolRequest,
    ListQuery,
};

mod common;
use common::{heading, print_json, MODEL};

const TOOL_NAME: &str = "ip_info";

// The docstring is required: the server derives the tool description and
// parameter schema from it.
const IP_INFO_SOURCE: &str = r#"def ip_info(ip: str) -> dict:
    """
    Get information about an IP address, such as location, company, and carrier name.

    :param ip: IP address in the 255.255.255.255 format
    :return: Information about the IP address
    """
    import requests

    response = requests.get(f"https://ipinfo.io/{ip}/geo")
    response.raise_for_status()
    return response.json()
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = common::setup()?;

    println!("{}", heading("Create custom source code tool"));
    let tool = client
        .replace_tool(TOOL_NAME, CreateToolRequest::from_source(IP_INFO_SOURCE))
        .await?;
    print_json("Tool", &tool);

    println!("{}", heading("Create assistant with the custom tool."));
    let assistant = client
        .create_assistant(
            CreateAssistantRequest::builder(MODEL)
                .instructions(
                    "You are IP address analytic. Use the provided tools to get info about IP address.",
                )
                .tools(vec![Tool::user(&tool.id)])
                .build()?,
        )
        .await?;
    print_json("Assistant", &assistant);

    println!("{}", heading("Run model and get answer"));
    let thread = client
        .create_thread(CreateThreadRequest::with_user_message("Who owns the IP 8.8.8.8?"))
        .await?;
    client
        .create_and_poll(&thread.id, CreateRunRequest::new(&assistant.id))
        .await?
        .ensure_completed()?;
    let messages = client.list_messages(&thread.id, &ListQuery::default()).await?;
    println!("Answer: {}", messages.first_text().unwrap_or_default());

    client.delete_thread(&thread.id).await?;
    client.delete_assistant(&assistant.id).await?;
    client.delete_tool_best_effort(&tool.id).await?;
    Ok(())
}
