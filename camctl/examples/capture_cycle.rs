//! Configure a camera and run a short capture

use std::time::Duration;

use tokio::time::sleep;

use camctl::{Client, Command};

#[tokio::main]
async fn main() -> camctl::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let host = std::env::var("CAMCTL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let mut client = Client::new(host, 5555);
    client.connect().await?;

    let Some(camera) = client.list().await?.into_iter().next() else {
        println!("No cameras");
        return client.disconnect().await;
    };

    // Frame sync on digital output line 0
    client.set(camera, Command::AdioBit, ["0"]).await?;

    let exposure = client.set(camera, Command::ExposureUs, ["2000"]).await?;
    println!("Exposure applied: {} us", exposure.concat());

    let size = client.set(camera, Command::ImageSize, ["1024", "768"]).await?;
    println!("Image size applied: {}", size.join(" x "));

    client.set_capture_limit(3000).await?;

    println!("Capturing...");
    client.start_capture(camera).await?;
    sleep(Duration::from_secs(1)).await;
    client.stop_capture(camera).await?;

    println!("Status: {:?}", client.status(camera).await?);

    client.disconnect().await?;
    Ok(())
}
