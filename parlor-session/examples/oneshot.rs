//! One-shot generation through a session, blocking.
//!
//!   cargo run --example oneshot -- llama3 "Why is the sky blue?"

use parlor_session::{ChatConfig, ChatSession};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| "llama3".into());
    let prompt = args.next().unwrap_or_else(|| "Who are you?".into());

    let session = ChatSession::connect(
        ChatConfig::new(model).system("Answer in one short paragraph."),
    )?;
    println!("{}", session.generate(&prompt)?);
    Ok(())
}
