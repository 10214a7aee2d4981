mod connection;
mod downloader;
mod piece;

pub use connection::Connection;
pub use downloader::Downloader;
