//! Minimal HTTP/1.1 server for exercising the REST layer without an endpoint.
//!
//! Answers each connection with the next queued response (then `200` with an
//! empty JSON object once the queue runs dry) and records the request line and
//! headers of everything it receives.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::vsphere::ConnectionParams;

pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

/// A complete HTTP response with a JSON body.
pub fn json_response(status: u16, body: &str) -> String {
    format!(
        "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

impl StubServer {
    pub fn start(responses: Vec<String>) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(vec![]));
        let queue = Mutex::new(VecDeque::from(responses));

        let seen = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let response = queue
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| json_response(200, "{}"));
                serve(stream, &response, &seen);
            }
        });
        StubServer { addr, requests }
    }

    pub fn params(&self) -> ConnectionParams {
        ConnectionParams {
            server: format!("http://{}", self.addr),
            username: "administrator@vsphere.local".to_string(),
            password: "secret".to_string(),
            skip_verification: false,
        }
    }

    /// Request line plus headers of every request so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Reads one request, records its head in `seen` and writes `response`.
/// The head is recorded before replying so the caller sees it once its call
/// returns.
fn serve(mut stream: TcpStream, response: &str, seen: &Mutex<Vec<String>>) -> Option<()> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut head = String::new();
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        if line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
        head.push_str(&line);
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).ok()?;

    seen.lock().unwrap().push(head.trim_end().to_string());
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()
}
