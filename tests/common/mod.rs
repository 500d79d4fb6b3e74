#![allow(dead_code)]

use std::io::{Cursor, Write};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What the local test server answers to every request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with the whole body and a matching `Content-Length`.
    Body(Vec<u8>),
    /// 200 declaring `declared` bytes, then closing after `body`.
    Truncated { body: Vec<u8>, declared: u64 },
    /// Bare status line, empty body.
    Status(u16),
}

/// Serves `reply` on an ephemeral localhost port, returns the base URL.
pub async fn serve(reply: Reply) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let reply = reply.clone();
            tokio::spawn(async move {
                let Some(method) = read_request(&mut socket).await else {
                    return;
                };
                let (status, body, declared) = match reply {
                    Reply::Body(body) => {
                        let len = body.len() as u64;
                        (200, body, len)
                    }
                    Reply::Truncated { body, declared } => (200, body, declared),
                    Reply::Status(code) => (code, Vec::new(), 0),
                };

                let head = format!(
                    "HTTP/1.1 {status} {}\r\n\
                     Content-Length: {declared}\r\n\
                     Content-Type: application/zip\r\n\
                     ETag: \"platform-tools-test\"\r\n\
                     Last-Modified: Tue, 01 Sep 2026 10:00:00 GMT\r\n\
                     Connection: close\r\n\r\n",
                    reason(status)
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                if method != "HEAD" {
                    let _ = socket.write_all(&body).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/platform-tools-latest.zip")
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&buf);
    text.split_whitespace().next().map(str::to_string)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A platform-tools style zip: everything under `platform-tools/`, an `adb`
/// executable and a stored payload of `payload_len` bytes.
pub fn platform_tools_zip(payload_len: usize) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    let stored = options.compression_method(zip::CompressionMethod::Stored);

    zip.add_directory("platform-tools/", options).unwrap();
    zip.start_file("platform-tools/adb", options.unix_permissions(0o755))
        .unwrap();
    zip.write_all(b"#!/bin/sh\necho \"Android Debug Bridge\"\n")
        .unwrap();
    zip.start_file("platform-tools/adb.exe", options).unwrap();
    zip.write_all(b"MZ").unwrap();
    zip.start_file("platform-tools/NOTICE.txt", options).unwrap();
    zip.write_all(b"test notice\n").unwrap();
    zip.start_file("platform-tools/lib64/payload.bin", stored)
        .unwrap();
    zip.write_all(&vec![0x5a; payload_len]).unwrap();

    zip.finish().unwrap().into_inner()
}

/// Temp files the installer left behind in `dir`.
pub fn leftover_archives(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("platform-tools-"))
        })
        .collect()
}
