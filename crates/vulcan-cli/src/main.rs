//! `vulcanctl` entrypoint.

#[tokio::main]
async fn main() {
    std::process::exit(vulcan_cli::run().await);
}
