#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog::run_server().await
}
