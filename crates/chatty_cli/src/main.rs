use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    chatty_cli::run().await
}
