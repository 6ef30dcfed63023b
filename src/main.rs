#[tokio::main]
async fn main() {
    if let Err(e) = listbuilder_lib::run().await {
        eprintln!("[STARTUP] {}", e);
        std::process::exit(1);
    }
}
