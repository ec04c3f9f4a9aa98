//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! A TCP-backed record channel.

use super::Channel;
use crate::protocol::RpcError;
use crate::reactive::{Stream, StreamController};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;

/// A [`Channel`] over a TCP stream.
///
/// Each read from the socket is surfaced as one record and each
/// [`send`](Channel::send) is one write. TCP itself does not preserve
/// message boundaries, so this holds only when the peer's records arrive
/// one per read — small records on a local or low-latency link. Callers
/// needing boundary guarantees under arbitrary network conditions should
/// wrap the socket in an explicitly framed channel instead.
///
/// # Examples
///
/// ```rust
/// # async fn example() -> std::io::Result<()> {
/// use remstream::{Channel, SocketChannel};
///
/// let channel = SocketChannel::connect("127.0.0.1:4000").await?;
/// channel.incoming().listen(|record| println!("received: {record}"));
/// channel.send("hello");
/// # Ok(())
/// # }
/// ```
pub struct SocketChannel {
    incoming: Stream<String, RpcError>,
    tx: mpsc::UnboundedSender<String>,
}

impl SocketChannel {
    /// Wraps an established TCP stream.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        let (mut reader, mut writer) = stream.into_split();
        let controller = StreamController::new();
        let incoming = controller.stream();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => {
                        controller.close(RpcError::ConnectionClosed {
                            reason: "peer disconnected".to_string(),
                        });
                        return;
                    }
                    Ok(n) => {
                        controller.add(String::from_utf8_lossy(&buf[..n]).into_owned());
                    }
                    Err(error) => {
                        controller.close(RpcError::ConnectionClosed {
                            reason: error.to_string(),
                        });
                        return;
                    }
                }
            }
        });

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(error) = writer.write_all(record.as_bytes()).await {
                    tracing::warn!(%error, "socket write failed");
                    return;
                }
            }
        });

        Self { incoming, tx }
    }

    /// Connects to the given address and wraps the resulting stream.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the connection cannot be
    /// established.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        Ok(Self::new(TcpStream::connect(addr).await?))
    }
}

impl Channel for SocketChannel {
    fn incoming(&self) -> Stream<String, RpcError> {
        self.incoming.clone()
    }

    fn send(&self, record: &str) {
        // The reader task reports the disconnect; a failed enqueue is moot.
        let _ = self.tx.send(record.to_string());
    }
}
