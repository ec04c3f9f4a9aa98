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

//! Echo demo over TCP.
//!
//! Run the server, then the client, in separate terminals:
//!
//! ```text
//! cargo run --example echo -- server
//! cargo run --example echo -- client hello world
//! ```

use remstream::{Connection, Future, SocketChannel, Value};
use tokio::net::TcpListener;

const ADDR: &str = "127.0.0.1:4600";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("server") => serve().await,
        Some("client") => client(args.collect()).await,
        _ => {
            eprintln!("usage: echo <server|client> [words...]");
            Ok(())
        }
    }
}

async fn serve() -> std::io::Result<()> {
    let listener = TcpListener::bind(ADDR).await?;
    tracing::info!(%ADDR, "echo server listening");
    let mut connections = Vec::new();
    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::info!(%peer, "accepted");
        let connection = Connection::new(SocketChannel::new(socket));
        connection.register("echo", |mut args| {
            if args.is_empty() {
                Future::immediate(Value::Null)
            } else {
                Future::immediate(args.remove(0))
            }
        });
        connection.register("reverse", |args| {
            let text = args
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .chars()
                .rev()
                .collect::<String>();
            Future::immediate(Value::from(text))
        });
        // Keep the endpoint alive; dropping it would tear the session down.
        connections.push(connection);
    }
}

async fn client(words: Vec<String>) -> std::io::Result<()> {
    let connection = Connection::new(SocketChannel::connect(ADDR).await?);
    for word in words {
        let echoed = connection
            .call("echo", vec![Value::from(word.clone())])
            .wait()
            .await;
        let reversed = connection
            .call("reverse", vec![Value::from(word.clone())])
            .wait()
            .await;
        match (echoed, reversed) {
            (Ok(echoed), Ok(reversed)) => {
                println!(
                    "{word} -> {} / {}",
                    echoed.as_str().unwrap_or("?"),
                    reversed.as_str().unwrap_or("?"),
                );
            }
            (echoed, reversed) => {
                tracing::error!(?echoed, ?reversed, "call failed");
                break;
            }
        }
    }
    Ok(())
}
