//! Function calling: the assistant asks for `ip_info` and the function runs
//! locally, its result submitted back to the run.

use anyhow::Context;
use bee_openai::{
    assistants::{
        runs::{CreateRunRequest, FunctionRegistry},
        threads::CreateThreadRequest,
        CreateAssistantRequest, FunctionDefinition, Tool,
    },
    ListQuery,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

mod common;
use common::{heading, print_json, MODEL};

/// Get information about an IP address, such as location, company, and carrier name.
#[derive(Debug, Deserialize, JsonSchema)]
struct IpInfoArgs {
    /// IP address in the 255.255.255.255 format
    ip: String,
}

async fn ip_info(arguments: Value) -> anyhow::Result<Value> {
    let IpInfoArgs { ip } = serde_json::from_value(arguments)?;
    log::info!("Looking up {ip}");
    let info = reqwest::get(format!("https://ipinfo.io/{ip}/geo"))
        .await?
        .error_for_status()
        .with_context(|| format!("ipinfo.io rejected {ip}"))?
        .json()
        .await?;
    Ok(info)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = common::setup()?;

    let assistant = client
        .create_assistant(
            CreateAssistantRequest::builder(MODEL)
                .instructions(
                    "You are IP address analytic. Use the provided functions to get info about IP address.",
                )
                .tools(vec![Tool::function(FunctionDefinition::from_schema::<IpInfoArgs>(
                    "ip_info",
                ))])
                .build()?,
        )
        .await?;
    print_json("Assistant", &assistant);

    let thread = client
        .create_thread(CreateThreadRequest::with_user_message("Who owns the IP 8.8.8.8?"))
        .await?;

    println!("{}", heading("Run model and answer function calls"));
    let mut functions = FunctionRegistry::new();
    functions.register("ip_info", ip_info);

    let run = client
        .create_and_poll(&thread.id, CreateRunRequest::new(&assistant.id))
        .await?;
    client.drive_run(run, &functions).await?.ensure_completed()?;

    let messages = client.list_messages(&thread.id, &ListQuery::default()).await?;
    println!("Answer: {}", messages.first_text().unwrap_or_default());

    client.delete_thread(&thread.id).await?;
    client.delete_assistant(&assistant.id).await?;
    Ok(())
}
