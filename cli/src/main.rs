use azure_ha_cli::args::Args;
use azure_ha_cli::exit;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { exit::ARGS } else { exit::OK };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let code = azure_ha_cli::run(args).await;
    std::process::exit(code);
}
