//! setupflow - command-line entry point

#[tokio::main]
async fn main() {
    if let Err(e) = setupflow::cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
