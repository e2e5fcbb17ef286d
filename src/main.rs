#[tokio::main]
async fn main() -> eyre::Result<()> {
    slackq::run().start().await
}
