//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use flight::config::{FlightConfig, Mode};
use flight::http::SharedStores;
use flight::store::MemoryStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a backend that answers every request with the request head it
/// received as a `text/plain` body.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    head.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(&head).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// In-process stores standing in for Redis.
pub fn memory_stores() -> SharedStores<tower_sessions::MemoryStore> {
    let memory = Arc::new(MemoryStore::new());
    SharedStores {
        counters: memory.clone(),
        responses: memory,
        sessions: tower_sessions::MemoryStore::default(),
    }
}

pub fn config(mode: Mode, app_home: &Path, dist: &Path) -> FlightConfig {
    let mut config = FlightConfig::default();
    config.mode = mode;
    config.app_home = app_home.to_path_buf();
    config.frontend.dist_path = dist.to_path_buf();
    config
}

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
