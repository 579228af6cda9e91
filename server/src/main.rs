use clap::Parser;
use common::cli::parse_args_or_exit;
use common::{log, logger};
use tictactoe_server::listener::{bind_listener, run_listener};
use tictactoe_server::server_config::load_settings;

#[derive(Parser)]
#[command(name = "tictactoe_server", version, about = "Two-player tic-tac-toe over TCP, with a bot fallback")]
struct Args {
    /// Port to listen on
    port: u16,

    /// YAML settings file
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    use_log_prefix: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = parse_args_or_exit();

    let prefix = if args.use_log_prefix {
        Some("Server".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let settings = load_settings(args.config.as_deref())?;
    let listener = bind_listener(&settings.bind_host, args.port).await?;

    tokio::select! {
        _ = run_listener(listener, settings) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            log!("Shutdown signal received, stopping server");
        }
    }

    Ok(())
}
