#[tokio::main]
async fn main() -> anyhow::Result<()> {
    doc_analyzer_lib::run().await
}
