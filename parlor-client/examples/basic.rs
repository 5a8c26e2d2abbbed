//! Basic usage of the async client.
//!
//! Make sure the model server is running locally and run:
//!   cargo run --example basic

use parlor_client::Client;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();

    let models = client.list_models().await?;
    println!("Installed models: {models:?}");

    let model = models.first().ok_or("no models installed")?;
    let reply = client
        .generate(model, "Say hello in one sentence.", None)
        .await?;
    println!("{}", reply.response);

    Ok(())
}
