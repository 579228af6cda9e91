mod game_loop;

use clap::Parser;
use common::cli::parse_args_or_exit;
use common::protocol::DEFAULT_GAME_PORT;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "tictactoe_client", version, about = "Plays tic-tac-toe against a tictactoe_server")]
struct Args {
    /// Server host name or address
    host: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = parse_args_or_exit();

    let stream = TcpStream::connect((args.host.as_str(), DEFAULT_GAME_PORT))
        .await
        .map_err(|e| format!("Failed to connect to {}:{}: {}", args.host, DEFAULT_GAME_PORT, e))?;
    println!("Connected to server. Starting the game...");

    let (reader, writer) = stream.into_split();
    let stdin = BufReader::new(tokio::io::stdin()).lines();

    match game_loop::play_game(reader, writer, stdin, &mut std::io::stdout()).await {
        Ok(game_loop::GameEnd::Finished) => {}
        Ok(game_loop::GameEnd::ServerClosed) => println!("Connection closed by server. Game ended."),
        Ok(game_loop::GameEnd::InputClosed) => println!("Input closed. Leaving the game."),
        Err(e) => eprintln!("Error during game play: {}", e),
    }

    Ok(())
}
