//! Terminal chat against the configured model. Each line is sent as its own
//! prompt and the reply is printed chunk by chunk as it streams in.

use std::io::Write;

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use gemini_moderator_proxy::config::Config;
use gemini_moderator_proxy::llm::{GeminiClient, LanguageModel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let model = GeminiClient::new(&config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Ask me anything: ");
        std::io::stdout().flush()?;

        let Some(prompt) = lines.next_line().await? else {
            break;
        };
        let prompt = prompt.trim();
        if prompt == "exit" {
            break;
        }
        if prompt.is_empty() {
            continue;
        }

        let mut chunks = match model.stream(prompt).await {
            Ok(chunks) => chunks,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => {
                    println!("{}", text);
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    break;
                }
            }
        }
    }

    Ok(())
}
