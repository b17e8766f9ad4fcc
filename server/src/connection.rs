use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use tictactoe_lib::packet::FRAME_LEN;

/// Maximum accepted line length, terminator included. Protects against
/// unbounded buffering when a peer never sends `\n`.
pub const MAX_LINE_BYTES: u64 = 256;

/// One player's TCP stream, split so the reader can buffer the
/// newline-terminated username line without swallowing frame bytes.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        let (read_half, write_half) = stream.into_split();
        Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub async fn write_frame(&mut self, frame: [u8; FRAME_LEN]) -> io::Result<()> {
        self.writer.write_all(&frame).await?;
        self.writer.flush().await
    }

    pub async fn read_frame(&mut self) -> io::Result<[u8; FRAME_LEN]> {
        let mut frame = [0u8; FRAME_LEN];
        self.reader.read_exact(&mut frame).await?;
        Ok(frame)
    }

    /// Reads one `\n`-terminated line, returned without the terminator.
    /// Errors if the peer closes the stream or overruns [`MAX_LINE_BYTES`]
    /// before terminating the line.
    pub async fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        let n = (&mut self.reader)
            .take(MAX_LINE_BYTES)
            .read_line(&mut line)
            .await?;
        // Ok(n) does not imply a terminator: read_line also returns at
        // EOF and when the cap cuts the read short.
        if !line.ends_with('\n') {
            if n as u64 == MAX_LINE_BYTES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line too long: no terminator within {MAX_LINE_BYTES} bytes"),
                ));
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before line terminator",
            ));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}
