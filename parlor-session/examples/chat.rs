//! Interactive streaming chat against a local model server.
//!
//! Make sure the server is running locally, then:
//!   cargo run --example chat -- llama3

use std::io::{BufRead, Write};

use futures::StreamExt;
use parlor_session::{CancellationToken, ChatConfig, ChatSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let model = std::env::args().nth(1).unwrap_or_else(|| "llama3".into());
    let mut session = ChatSession::connect_async(ChatConfig::new(model)).await?;
    println!(
        "Chatting with {} (installed: {:?}). /quit to exit.",
        session.model(),
        session.available_models()
    );

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt == "/quit" {
            break;
        }

        let mut stream = session
            .send_turn_streaming(prompt.to_string(), CancellationToken::new())
            .await?;
        while let Some(fragment) = stream.next().await {
            print!("{}", fragment?);
            std::io::stdout().flush()?;
        }
        println!();
    }

    Ok(())
}
