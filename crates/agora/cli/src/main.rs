//! `agora` binary entry point.

#[tokio::main]
async fn main() {
    if let Err(e) = agora_cli::run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
