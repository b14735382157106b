//! TCP accept loop and connection handling

use crate::cmd;
use crate::session::Session;
use bytes::BytesMut;
use resp::{RespEncoder, RespParser, RespValue};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use store::Store;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

pub struct Server {
    store: Arc<Store>,
    addr: SocketAddr,
}

impl Server {
    pub fn new(store: Arc<Store>, addr: SocketAddr) -> Self {
        Self { store, addr }
    }

    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("listening on {}", self.addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let store = self.store.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, store).await {
                            warn!("client {} error: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    error!("accept failed: {}", e);
                }
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream, store: Arc<Store>) -> anyhow::Result<()> {
    let mut session = Session::new(store)?;
    let parser = RespParser::default();
    let encoder = RespEncoder::new();
    let mut read_buf = BytesMut::with_capacity(4 * 1024);
    let mut write_buf = BytesMut::with_capacity(4 * 1024);

    loop {
        let n = stream.read_buf(&mut read_buf).await?;
        if n == 0 {
            return Ok(());
        }

        // drain every complete pipelined frame before flushing replies
        loop {
            match parser.parse(&mut read_buf) {
                Ok(Some(frame)) => {
                    let reply = match frame.into_command() {
                        Some(args) if !args.is_empty() => cmd::dispatch(&mut session, &args),
                        _ => RespValue::error("ERR invalid request"),
                    };
                    encoder.encode(&reply, &mut write_buf);
                }
                Ok(None) => break,
                Err(e) => {
                    // protocol desync: report and drop the connection
                    encoder.encode(&RespValue::error(format!("ERR {}", e)), &mut write_buf);
                    stream.write_all(&write_buf).await?;
                    return Ok(());
                }
            }
        }

        if !write_buf.is_empty() {
            stream.write_all(&write_buf).await?;
            write_buf.clear();
        }
    }
}

/// Periodic expiration sweep over every database.
pub fn spawn_ttl_sweeper(store: Arc<Store>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            for db in store.databases() {
                if let Err(e) = db.purge_expired(now) {
                    warn!("ttl sweep failed on db {}: {}", db.index(), e);
                }
            }
        }
    })
}
