#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logbook_server::run().await
}
