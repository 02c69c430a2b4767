//! List cameras and their status

use camctl::{Client, Command};

#[tokio::main]
async fn main() -> camctl::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let host = std::env::var("CAMCTL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

    let mut client = Client::new(host, 5555);
    client.connect().await?;

    for entry in client.status_all().await? {
        println!(
            "{} ({}): capturing={} {}={:.1}",
            entry.identity,
            entry.id,
            entry.status.capturing,
            entry.status.temperature_source,
            entry.status.temperature
        );

        let info = client.get(entry.identity, Command::CameraInfo).await?;
        print!("{}", info.concat());
    }

    println!("Capture ceiling: {} ms", client.capture_limit().await?);

    client.disconnect().await?;
    Ok(())
}
