#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use cattetris::leaderboard::{read_record, route, ApiRoute, Leaderboard, LeaderboardEntry};
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::io::Cursor;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
#[cfg(not(target_arch = "wasm32"))]
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Serves the web bundle and the family leaderboard API.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
struct Opts {
    /// Address to listen on
    #[arg(default_value = "127.0.0.1:8080")]
    addr: String,
    /// Directory holding index.html and the wasm bundle
    #[arg(long, default_value = "web")]
    root: PathBuf,
    /// JSON-lines file finished games are appended to
    #[arg(long, default_value = "leaderboard.jsonl")]
    leaderboard: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let root = fs::canonicalize(&opts.root)
        .map_err(|e| anyhow::anyhow!("web directory {} not usable: {}", opts.root.display(), e))?;
    let board = Leaderboard::open(&opts.leaderboard);

    println!(
        "Serving {} on http://{} (leaderboard {})",
        root.display(),
        opts.addr,
        board.path().display()
    );
    let server = Server::http(&opts.addr).map_err(|e| anyhow::anyhow!("bind {}: {}", opts.addr, e))?;
    for mut request in server.incoming_requests() {
        let url = request.url().to_string();
        let method = request.method().to_string();
        let (path, query) = split_url(&url);
        let response = if path.starts_with("/api/") {
            handle_api(&mut request, &board, path, query)
        } else {
            serve_static(&root, path)
        };
        let status = response.status_code().0;
        if let Err(e) = request.respond(response) {
            eprintln!("{} {} -> write failed: {}", method, url, e);
        }
        println!("{} {} -> {}", method, url, status);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
type Reply = Response<Cursor<Vec<u8>>>;

#[cfg(not(target_arch = "wasm32"))]
fn split_url(url: &str) -> (&str, &str) {
    match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn handle_api(request: &mut Request, board: &Leaderboard, path: &str, query: &str) -> Reply {
    let route = match route(request.method().as_str(), path, query) {
        Ok(r) => r,
        Err(e) => return text_response(e.status(), &e.to_string()),
    };
    match route {
        ApiRoute::SubmitRecord { family_id } => {
            let record = match read_record(request.as_reader()) {
                Ok(r) => r,
                Err(e) => return text_response(e.status(), &e.to_string()),
            };
            let entry = LeaderboardEntry { family_id, record };
            match board.append(&entry) {
                Ok(()) => json_response(201, &entry),
                Err(e) => {
                    eprintln!("failed to store record: {}", e);
                    text_response(500, "could not store record")
                }
            }
        }
        ApiRoute::Query(q) => match board.run_query(&q) {
            Ok(entries) => json_response(200, &entries),
            Err(e) => {
                eprintln!("failed to read leaderboard: {}", e);
                text_response(500, "could not read leaderboard")
            }
        },
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn serve_static(root: &Path, url_path: &str) -> Reply {
    let Some(path) = sanitize_path(root, url_path) else {
        return not_found_response();
    };
    match fs::read(&path) {
        Ok(bytes) => {
            let mut resp = Response::from_data(bytes).with_status_code(StatusCode(200));
            if let Ok(h) = Header::from_bytes("Content-Type", content_type_for(&path).as_bytes()) {
                resp.add_header(h);
            }
            resp
        }
        Err(_) => not_found_response(),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn sanitize_path(root: &Path, url: &str) -> Option<PathBuf> {
    let rel = if url == "/" { "index.html" } else { url.trim_start_matches('/') };
    let full = root.join(rel);
    let path = if full.is_dir() {
        full.join("index.html")
    } else {
        full
    };
    let path = fs::canonicalize(path).ok()?;
    if path.starts_with(root) {
        Some(path)
    } else {
        None
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn json_response<T: serde::Serialize>(status: u16, value: &T) -> Reply {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut resp = Response::from_data(body).with_status_code(StatusCode(status));
            if let Ok(h) = Header::from_bytes("Content-Type", "application/json") {
                resp.add_header(h);
            }
            resp
        }
        Err(e) => text_response(500, &e.to_string()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn text_response(status: u16, body: &str) -> Reply {
    Response::from_string(body).with_status_code(StatusCode(status))
}

#[cfg(not(target_arch = "wasm32"))]
fn not_found_response() -> Reply {
    text_response(404, "Not Found")
}
