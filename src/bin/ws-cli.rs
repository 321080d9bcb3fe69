use clap::Parser;
use switchyard::websocket::Opcode;
use switchyard::WebSocketClient;

#[derive(Parser)]
#[command(name = "ws-cli")]
#[command(about = "Send one message to a switchyard WebSocket sub-path", long_about = None)]
struct Cli {
    /// Server address.
    #[arg(short, long, default_value = "127.0.0.1:8081")]
    addr: String,

    /// Sub-path the message is addressed to.
    #[arg(short, long, default_value = "/echo")]
    sub_path: String,

    /// Message body.
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut client = WebSocketClient::connect(cli.addr.as_str(), "/").await?;
    client.send(&cli.sub_path, cli.message.as_bytes()).await?;

    match client.recv().await? {
        Some(frame) if matches!(frame.opcode, Opcode::Text | Opcode::Binary) => {
            println!("{}", String::from_utf8_lossy(&frame.payload));
        }
        Some(frame) => eprintln!("Unexpected {:?} frame", frame.opcode),
        None => eprintln!("Server closed the connection"),
    }

    client.close().await?;
    Ok(())
}
