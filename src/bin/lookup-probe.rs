use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use lookup_gateway::transport::Framing;
use lookup_gateway::StreamProtocol;

const MAX_REPLY_LEN: usize = 1 << 20;

#[derive(Parser)]
#[command(name = "lookup-probe")]
#[command(about = "Send one lookup to a running gateway socket", long_about = None)]
struct Cli {
    /// Socket the gateway listens on.
    #[arg(short, long)]
    socket: PathBuf,

    /// Protocol spoken on the socket.
    #[arg(short, long, value_enum, default_value = "socketmap")]
    protocol: ProbeProtocol,

    /// Override the protocol's default framing.
    #[arg(short, long, value_enum)]
    framing: Option<ProbeFraming>,

    /// Seconds to wait for the reply.
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    /// Request payload, e.g. `virtual alias@example.org` or `Lshared/passdb/bob`.
    request: String,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ProbeProtocol {
    Socketmap,
    Dict,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ProbeFraming {
    Line,
    Netstring,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let protocol = match cli.protocol {
        ProbeProtocol::Socketmap => StreamProtocol::Socketmap,
        ProbeProtocol::Dict => StreamProtocol::Dict,
    };
    let framing = match cli.framing {
        Some(ProbeFraming::Line) => Framing::Line,
        Some(ProbeFraming::Netstring) => Framing::Netstring,
        None => protocol.default_framing(),
    };

    let stream = UnixStream::connect(&cli.socket).await?;
    let mut framed = Framed::new(stream, framing.codec(MAX_REPLY_LEN));
    framed.send(Bytes::from(cli.request)).await?;

    match tokio::time::timeout(Duration::from_secs(cli.timeout), framed.next()).await {
        Ok(Some(Ok(reply))) => {
            println!("{}", String::from_utf8_lossy(&reply));
        }
        Ok(Some(Err(e))) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Ok(None) => {
            eprintln!("Error: gateway closed the connection without replying");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("Error: no reply within {}s", cli.timeout);
            std::process::exit(1);
        }
    }

    Ok(())
}
