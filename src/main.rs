use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::info;
use size::Size;
use tokio::net::TcpStream;

use crate::client::Config;
use crate::message::Handshake;
use crate::peer::{Connection, Downloader};
use crate::torrent::Torrent;

mod bencoding;
mod client;
mod codec;
mod core;
mod error;
mod message;
mod peer;
mod torrent;
mod tracker;

#[derive(Parser)]
#[command(version, about = "Download single-file torrents from one peer")]
struct Cli {
    /// Port reported to the tracker
    #[arg(long, global = true, default_value_t = 6881)]
    port: u16,
    /// Block size in bytes, at most 16384
    #[arg(long, global = true, default_value_t = 16384)]
    block_size: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a bencoded value and print it as JSON
    Decode { value: String },
    /// Print the metainfo of a torrent file
    Info { torrent: PathBuf },
    /// Print the peers returned by the tracker
    Peers { torrent: PathBuf },
    /// Handshake with a peer and print its ID
    Handshake { torrent: PathBuf, peer: SocketAddr },
    /// Download and verify a single piece
    #[command(name = "download_piece")]
    DownloadPiece {
        #[arg(short, long)]
        output: PathBuf,
        torrent: PathBuf,
        piece: usize,
    },
    /// Download and verify the whole file
    Download {
        #[arg(short, long)]
        output: PathBuf,
        torrent: PathBuf,
    },
}

async fn load_torrent(path: &Path) -> anyhow::Result<Torrent> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;
    let torrent = Torrent::from_bytes(&data)?;
    info!(
        "loaded {} ({} pieces)",
        torrent.info.name.as_deref().unwrap_or("<unnamed>"),
        torrent.info.total_pieces()
    );
    Ok(torrent)
}

/// Connects to the first peer the tracker hands out.
async fn connect(torrent: &Torrent, config: &Config) -> anyhow::Result<Connection<TcpStream>> {
    let peers = tracker::announce(torrent, config).await?;
    let Some(peer) = peers.first() else {
        bail!("tracker returned no peers");
    };
    let handshake = Handshake::new(torrent.info.info_hash, config.client_id);
    let max_length = config.max_frame_length(torrent.info.total_pieces());
    let connection = Connection::open(peer.socket_addr(), &handshake, max_length).await?;
    Ok(connection)
}

/// Output of the `info` command.
fn describe(torrent: &Torrent) -> Vec<String> {
    let mut lines = vec![
        format!("Tracker URL: {}", torrent.announce),
        format!("Length: {}", torrent.info.length),
        format!("Info Hash: {}", torrent.info.info_hash),
        format!("Piece Length: {}", torrent.info.piece_length),
        "Pieces Hashes:".to_string(),
    ];
    lines.extend(torrent.info.pieces.iter().map(|hash| hash.to_string()));
    lines
}

async fn write_output(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("unable to write {}", path.display()))?;
    info!("wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::default()
        .with_port(cli.port)
        .with_block_size(Size::from_bytes(cli.block_size));
    match cli.command {
        Command::Decode { value } => {
            let value = bencoding::decode(value.as_bytes())?;
            println!("{}", serde_json::Value::from(&value));
        }
        Command::Info { torrent } => {
            let torrent = load_torrent(&torrent).await?;
            for line in describe(&torrent) {
                println!("{}", line);
            }
        }
        Command::Peers { torrent } => {
            let torrent = load_torrent(&torrent).await?;
            for peer in tracker::announce(&torrent, &config).await? {
                println!("{}", peer);
            }
        }
        Command::Handshake { torrent, peer } => {
            let torrent = load_torrent(&torrent).await?;
            let handshake = Handshake::new(torrent.info.info_hash, config.client_id);
            let max_length = config.max_frame_length(torrent.info.total_pieces());
            let connection = Connection::open(peer, &handshake, max_length).await?;
            println!("Peer ID: {}", connection.peer_id().to_hex());
            connection.close().await?;
        }
        Command::DownloadPiece {
            output,
            torrent,
            piece,
        } => {
            let torrent = load_torrent(&torrent).await?;
            let connection = connect(&torrent, &config).await?;
            let mut downloader = Downloader::start(connection, &torrent.info, &config).await?;
            let data = downloader.download_piece(piece).await?;
            downloader.finish().await?;
            write_output(&output, &data).await?;
            println!("Piece {} downloaded to {}.", piece, output.display());
        }
        Command::Download { output, torrent } => {
            let path = torrent;
            let torrent = load_torrent(&path).await?;
            let connection = connect(&torrent, &config).await?;
            let mut downloader = Downloader::start(connection, &torrent.info, &config).await?;
            let data = downloader.download_all().await?;
            downloader.finish().await?;
            write_output(&output, &data).await?;
            println!("Downloaded {} to {}.", path.display(), output.display());
        }
    }
    Ok(())
}
