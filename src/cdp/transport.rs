//! CDP Transport Layer
//!
//! Talks to Chrome over a minimal WebSocket client. Commands that page
//! scripts can detect are filtered before they reach the wire.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};

use crate::error::{Error, Result};

/// Commands that are blocked (highly detectable by anti-bot)
const BLOCKED_COMMANDS: &[&str] = &[
    "Runtime.enable",
    "Runtime.disable",
    "Debugger.enable",
    "Debugger.disable",
    "Console.enable",
    "Console.disable",
    "Profiler.enable",
    "Profiler.disable",
];

/// Commands that trigger a warning (potentially detectable)
const RISKY_COMMANDS: &[&str] = &[
    "Emulation.setUserAgentOverride",
    "Emulation.setLocaleOverride",
    "Page.setBypassCSP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Send,
    Warn,
    Block,
}

fn disposition(method: &str) -> Disposition {
    if BLOCKED_COMMANDS.contains(&method) {
        Disposition::Block
    } else if RISKY_COMMANDS.contains(&method) {
        Disposition::Warn
    } else {
        Disposition::Send
    }
}

/// A command waiting for its response; responses carry only the id
struct PendingCommand {
    method: String,
    tx: oneshot::Sender<Result<Value>>,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingCommand>>>;

/// RFC 6455 framing, client side
mod frame {
    use std::io::{self, Read};

    pub const OPCODE_TEXT: u8 = 0x1;
    pub const OPCODE_CLOSE: u8 = 0x8;
    pub const OPCODE_PING: u8 = 0x9;
    pub const OPCODE_PONG: u8 = 0xA;

    /// Build a single final frame; clients always mask
    pub fn encode(opcode: u8, payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
        let len = payload.len();
        let mut out = Vec::with_capacity(len + 14);
        out.push(0x80 | opcode);

        match len {
            0..=125 => out.push(0x80 | len as u8),
            126..=0xFFFF => {
                out.push(0x80 | 126);
                out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                out.push(0x80 | 127);
                out.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }

        out.extend_from_slice(&mask);
        out.extend(payload.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]));
        out
    }

    /// Read one frame, returning (opcode, unmasked payload)
    pub fn decode<R: Read>(reader: &mut R) -> io::Result<(u8, Vec<u8>)> {
        let mut head = [0u8; 2];
        reader.read_exact(&mut head)?;

        let opcode = head[0] & 0x0F;
        let masked = head[1] & 0x80 != 0;
        let len = match head[1] & 0x7F {
            126 => {
                let mut ext = [0u8; 2];
                reader.read_exact(&mut ext)?;
                u16::from_be_bytes(ext) as usize
            }
            127 => {
                let mut ext = [0u8; 8];
                reader.read_exact(&mut ext)?;
                u64::from_be_bytes(ext) as usize
            }
            n => n as usize,
        };

        let mask = if masked {
            let mut m = [0u8; 4];
            reader.read_exact(&mut m)?;
            Some(m)
        } else {
            None
        };

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;
        if let Some(mask) = mask {
            for (i, byte) in payload.iter_mut().enumerate() {
                *byte ^= mask[i % 4];
            }
        }

        Ok((opcode, payload))
    }
}

fn write_frame(stream: &mut TcpStream, opcode: u8, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(&frame::encode(opcode, payload, rand::random()))?;
    stream.flush()
}

/// Split `ws://host:port/path` into (`host:port`, `/path`)
fn split_ws_url(ws_url: &str) -> (&str, String) {
    let rest = ws_url.trim_start_matches("ws://");
    match rest.split_once('/') {
        Some((host, path)) => (host, format!("/{}", path)),
        None => (rest, "/".to_string()),
    }
}

/// CDP Transport - sends commands and routes responses via WebSocket
pub struct Transport {
    /// The Chrome child process
    child: Mutex<Child>,
    writer: Mutex<TcpStream>,
    next_id: AtomicU64,
    pending: PendingMap,
}

impl Transport {
    /// Connect to Chrome's DevTools WebSocket and start the reader thread
    pub fn new(child: Child, ws_url: &str) -> Result<Self> {
        let (host_port, path) = split_ws_url(ws_url);

        let mut stream = TcpStream::connect(host_port)
            .map_err(|e| Error::transport_io("Failed to connect to Chrome", e))?;

        let key = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            rand::random::<[u8; 16]>(),
        );
        let request = format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n",
            path, host_port, key
        );
        stream
            .write_all(request.as_bytes())
            .map_err(|e| Error::transport_io("Handshake write failed", e))?;

        let mut response = [0u8; 1024];
        let n = stream
            .read(&mut response)
            .map_err(|e| Error::transport_io("Handshake read failed", e))?;
        let status = String::from_utf8_lossy(&response[..n]);
        if !status.starts_with("HTTP/1.1 101") {
            return Err(Error::transport(format!(
                "WebSocket handshake failed: {}",
                status.lines().next().unwrap_or_default()
            )));
        }

        tracing::debug!("WebSocket connected to {}", ws_url);

        let reader = stream
            .try_clone()
            .map_err(|e| Error::transport_io("Failed to clone stream", e))?;
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let routes = Arc::clone(&pending);
        std::thread::spawn(move || Self::reader_loop(reader, routes));

        Ok(Self {
            child: Mutex::new(child),
            writer: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            pending,
        })
    }

    fn reader_loop(mut stream: TcpStream, pending: PendingMap) {
        loop {
            let (opcode, payload) = match frame::decode(&mut stream) {
                Ok(f) => f,
                Err(e) => {
                    tracing::debug!("WebSocket read error: {}", e);
                    break;
                }
            };

            match opcode {
                frame::OPCODE_TEXT => Self::route(&payload, &pending),
                frame::OPCODE_PING => {
                    let _ = write_frame(&mut stream, frame::OPCODE_PONG, &payload);
                }
                frame::OPCODE_CLOSE => {
                    tracing::debug!("WebSocket closed by Chrome");
                    break;
                }
                _ => {}
            }
        }

        // Fail everything still waiting
        pending.blocking_lock().clear();
        tracing::debug!("CDP reader loop ended");
    }

    /// Hand a response to its waiting command. Events are not consumed.
    fn route(payload: &[u8], pending: &PendingMap) {
        let msg: Value = match serde_json::from_slice(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to parse CDP message: {}", e);
                return;
            }
        };

        let Some(id) = msg.get("id").and_then(Value::as_u64) else {
            if let Some(method) = msg.get("method").and_then(Value::as_str) {
                tracing::trace!("CDP event: {}", method);
            }
            return;
        };

        let Some(command) = pending.blocking_lock().remove(&id) else {
            tracing::trace!("Response for unknown id: {}", id);
            return;
        };

        let result = match msg.get("error") {
            Some(error) => Err(Error::cdp(
                command.method,
                error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown"),
            )),
            None => Ok(msg.get("result").cloned().unwrap_or_else(|| json!({}))),
        };
        let _ = command.tx.send(result);
    }

    /// Send a browser-level CDP command and wait for the response
    pub async fn send<C, R>(&self, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.dispatch(None, method, params).await
    }

    /// Send a CDP command to a specific session
    pub async fn send_to_session<C, R>(&self, session_id: &str, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.dispatch(Some(session_id), method, params).await
    }

    async fn dispatch<C, R>(&self, session_id: Option<&str>, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        match disposition(method) {
            Disposition::Block => {
                // Answer locally with an empty object; result types default their fields
                tracing::debug!("Blocked CDP command: {}", method);
                return serde_json::from_value(json!({})).map_err(Into::into);
            }
            Disposition::Warn => tracing::warn!("Risky CDP command (may be detectable): {}", method),
            Disposition::Send => {}
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut msg = json!({
            "id": id,
            "method": method,
            "params": serde_json::to_value(params)?,
        });
        if let Some(session_id) = session_id {
            msg["sessionId"] = json!(session_id);
        }
        let data = serde_json::to_vec(&msg)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingCommand {
                method: method.to_string(),
                tx,
            },
        );

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = write_frame(&mut writer, frame::OPCODE_TEXT, &data) {
                self.pending.lock().await.remove(&id);
                return Err(Error::transport_io("WebSocket write failed", e));
            }
        }
        tracing::trace!("Sent CDP command: {} (id={}, session={:?})", method, id, session_id);

        let result = rx
            .await
            .map_err(|_| Error::transport(format!("No response to {}", method)))??;
        Ok(serde_json::from_value(result)?)
    }

    /// Close the socket and kill Chrome
    pub async fn close(&self) -> Result<()> {
        {
            let mut writer = self.writer.lock().await;
            let _ = write_frame(&mut writer, frame::OPCODE_CLOSE, &[]);
        }

        terminate(&mut *self.child.lock().await);
        Ok(())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Ok(mut child) = self.child.try_lock() {
            terminate(&mut child);
        }
    }
}

/// Kill Chrome and reap it if it already exited. Never blocks.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    match child.try_wait() {
        Ok(Some(status)) => tracing::debug!("Chrome exited: {}", status),
        Ok(None) => tracing::debug!("Chrome still shutting down (pid {})", child.id()),
        Err(e) => tracing::debug!("Failed to poll Chrome exit: {}", e),
    }
}

/// Extract the DevTools URL from a Chrome stderr line
fn devtools_url(line: &str) -> Option<String> {
    if !line.contains("DevTools listening on") {
        return None;
    }
    line.find("ws://").map(|start| line[start..].trim().to_string())
}

/// Launch Chrome and get the WebSocket debugging URL
pub fn launch_chrome(path: &std::path::Path, args: &[String]) -> Result<(Child, String)> {
    let mut child = std::process::Command::new(path)
        .args(args)
        .arg("--remote-debugging-port=0")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Launch(format!("{}: {}", path.display(), e)))?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Launch("No stderr from Chrome".into()))?;

    // Chrome prints: DevTools listening on ws://127.0.0.1:PORT/devtools/browser/GUID
    let ws_url = BufReader::new(stderr)
        .lines()
        .map_while(|line| line.ok())
        .inspect(|line| tracing::trace!("Chrome stderr: {}", line))
        .find_map(|line| devtools_url(&line));

    match ws_url {
        Some(url) => {
            tracing::info!("Chrome DevTools URL: {}", url);
            Ok((child, url))
        }
        None => {
            let _ = child.kill();
            Err(Error::Launch(
                "Failed to get DevTools WebSocket URL from Chrome".into(),
            ))
        }
    }
}
