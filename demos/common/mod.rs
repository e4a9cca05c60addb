//! Helpers shared by the demo programs.
#![allow(dead_code)]

use bee_openai::OpenAiClient;
use serde::Serialize;

pub const MODEL: &str = "meta-llama/llama-3-1-70b-instruct";

/// `text` centred in an 80 column line of `=`, surrounded by blank lines.
pub fn heading(text: &str) -> String {
    format!("\n{:=^80}\n", format!(" {text} "))
}

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

pub fn print_json<T: Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{label}:\n{json}"),
        Err(err) => log::warn!("Cannot print {label}: {err}"),
    }
}

/// Logging plus a client for `BEE_API` / `BEE_API_KEY` (a `.env` file is read too).
pub fn setup() -> anyhow::Result<OpenAiClient> {
    init_logging();
    Ok(OpenAiClient::from_env()?)
}
