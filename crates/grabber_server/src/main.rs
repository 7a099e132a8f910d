#[tokio::main]
async fn main() -> anyhow::Result<()> {
    grabber_server::run().await
}
