//! Shared HTTP agent construction and size-capped response reading.

use std::io::{self, Read, Write};
use std::time::Duration;

/// Timeouts applied to every request made through one agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub read: Duration,
    /// Budget for a whole upload request. FASTQ archives run to gigabytes.
    pub write: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            read: Duration::from_secs(30),
            write: Duration::from_secs(3600),
        }
    }
}

const USER_AGENT: &str = concat!("seqsubmit/", env!("CARGO_PKG_VERSION"));

/// Build an agent with consistent timeouts and a client user agent.
pub fn agent(timeouts: HttpTimeouts) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(timeouts.connect)
        .timeout_read(timeouts.read)
        .timeout_write(timeouts.write)
        .user_agent(USER_AGENT)
        .build()
}

/// Client for multipart uploads. `write` bounds the whole request.
pub fn upload_client(timeouts: HttpTimeouts) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.write)
        .user_agent(USER_AGENT)
        .build()
}

/// Buffer a (JSON) response body, refusing anything over `max_bytes`.
pub fn read_response_bytes(response: ureq::Response, max_bytes: usize) -> Result<Vec<u8>, io::Error> {
    let declared = declared_length(&response);
    let mut bytes = Vec::new();
    copy_capped(response.into_reader(), declared, &mut bytes, max_bytes as u64)?;
    Ok(bytes)
}

/// [`read_response_bytes`] for an upload response.
pub fn read_upload_response(
    response: reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, io::Error> {
    let declared = response.content_length();
    let mut bytes = Vec::new();
    copy_capped(response, declared, &mut bytes, max_bytes as u64)?;
    Ok(bytes)
}

/// Stream a response (an artifact download) into `writer`, refusing anything
/// over `max_bytes`. Returns the number of bytes written.
pub fn copy_response_to_writer(
    response: ureq::Response,
    writer: &mut impl Write,
    max_bytes: u64,
) -> Result<u64, io::Error> {
    let declared = declared_length(&response);
    let total = copy_capped(response.into_reader(), declared, writer, max_bytes)?;
    writer.flush()?;
    Ok(total)
}

fn copy_capped(
    body: impl Read,
    declared: Option<u64>,
    writer: &mut impl Write,
    max_bytes: u64,
) -> Result<u64, io::Error> {
    if let Some(declared) = declared {
        if declared > max_bytes {
            return Err(too_large(declared, max_bytes));
        }
    }
    // One extra byte tells an exact fit apart from an overrun.
    let mut body = body.take(max_bytes.saturating_add(1));
    let mut total = 0u64;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = body.read(&mut buf)?;
        if read == 0 {
            return Ok(total);
        }
        total += read as u64;
        if total > max_bytes {
            return Err(too_large(total, max_bytes));
        }
        writer.write_all(&buf[..read])?;
    }
}

fn declared_length(response: &ureq::Response) -> Option<u64> {
    response.header("Content-Length")?.trim().parse().ok()
}

fn too_large(seen: u64, max_bytes: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Response body of {seen}+ bytes exceeds the {max_bytes} byte limit"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// Answer a single connection with a canned response.
    fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/api/jobs/j/")
    }

    fn get(response: String) -> ureq::Response {
        agent(HttpTimeouts::default())
            .get(&serve_once(response))
            .call()
            .unwrap()
    }

    fn with_length(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn declared_length_over_limit_is_refused_before_reading() {
        let response = get("HTTP/1.1 200 OK\r\nContent-Length: 5000\r\n\r\n{}".to_string());
        let err = read_response_bytes(response, 1024).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn undeclared_body_over_limit_is_refused() {
        let body = "a".repeat(64);
        let response = get(format!("HTTP/1.0 200 OK\r\n\r\n{body}"));
        let err = read_response_bytes(response, 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn json_body_at_exact_limit_is_read() {
        let body = r#"{"job_id":"j","status":"pending"}"#;
        let response = get(with_length(body));
        let bytes = read_response_bytes(response, body.len()).unwrap();
        assert_eq!(bytes, body.as_bytes());
    }

    #[test]
    fn artifact_stream_reports_bytes_written() {
        let body = "genus\treads\n".repeat(40);
        let response = get(with_length(&body));
        let mut saved = Vec::new();
        let written = copy_response_to_writer(response, &mut saved, 4096).unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(saved, body.as_bytes());
    }

    #[test]
    fn upload_response_is_capped_like_any_other() {
        let url = serve_once(with_length(r#"{"job_id":"j","status":"pending"}"#));
        let client = upload_client(HttpTimeouts::default()).unwrap();
        let response = client.post(&url).body("x").send().unwrap();
        let err = read_upload_response(response, 8).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
