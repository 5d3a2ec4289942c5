//! Remote generation client for a JSON-over-HTTP service
//!
//! The JSON request is POSTed to the configured endpoint; the service
//! replies with `{"image": "<base64 PNG>"}` or `{"error": "..."}`.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use crate::{CancelHandle, GenerationBackend, GenerationError, GenerationRequest, GenerationResponse};

/// Default time allowed for a whole generation round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Room for the JSON envelope around the encoded image
const RESPONSE_SLACK: usize = 64 * 1024;

/// Generation client for a JSON-over-HTTP service
pub struct RemoteGeneration {
    url: reqwest::Url,
    client: reqwest::Client,
    timeout: Duration,
    cancel: CancelHandle,
}

impl RemoteGeneration {
    pub fn new(url: &str) -> Result<Self, GenerationError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| GenerationError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GenerationError::InvalidUrl(format!(
                "{url}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(GenerationError::InvalidUrl(format!("{url}: missing host")));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerationError::Connection(e.to_string()))?;

        Ok(Self {
            url: parsed,
            client,
            timeout: DEFAULT_TIMEOUT,
            cancel: CancelHandle::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }

    async fn send(&self, request: &GenerationRequest) -> Result<image::RgbaImage, GenerationError> {
        let response = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = read_body(response, response_limit(request)).await?;
        debug!("Received HTTP {} ({} byte body)", status.as_u16(), body.len());

        if !status.is_success() {
            // Services report failures in the JSON body when they can
            if let Ok(GenerationResponse { error: Some(message), .. }) = serde_json::from_slice::<GenerationResponse>(&body) {
                return Err(GenerationError::Server(message));
            }
            return Err(GenerationError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        decode_payload(&body)
    }
}

impl GenerationBackend for RemoteGeneration {
    async fn generate(&mut self, request: GenerationRequest) -> Result<image::RgbaImage, GenerationError> {
        self.cancel.begin();
        info!(
            "Requesting {}x{} texture from {} ({} steps)",
            request.width, request.height, self.url, request.steps
        );

        let result = tokio::select! {
            result = self.send(&request) => result,
            () = self.cancel.cancelled() => {
                info!("Generation cancelled");
                Err(GenerationError::Cancelled)
            }
        };

        self.cancel.finish();
        result
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn is_generating(&self) -> bool {
        self.cancel.is_active()
    }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Connection(e.to_string())
    }
}

/// Largest reply accepted for `request`: twice the raw RGBA size covers a
/// base64 PNG of the requested dimensions
pub(crate) fn response_limit(request: &GenerationRequest) -> usize {
    (request.width as usize)
        .saturating_mul(request.height as usize)
        .saturating_mul(8)
        .saturating_add(RESPONSE_SLACK)
}

/// Read the reply body, failing as soon as it exceeds `limit` bytes
async fn read_body(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, GenerationError> {
    if response.content_length().is_some_and(|length| length > limit as u64) {
        return Err(GenerationError::ResponseTooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
        if body.len() + chunk.len() > limit {
            return Err(GenerationError::ResponseTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Decode a success body into an image
pub(crate) fn decode_payload(body: &[u8]) -> Result<image::RgbaImage, GenerationError> {
    let response: GenerationResponse =
        serde_json::from_slice(body).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    if let Some(message) = response.error {
        return Err(GenerationError::Server(message));
    }
    let encoded = response
        .image
        .ok_or_else(|| GenerationError::InvalidResponse("no image in response".into()))?;
    decode_image(&encoded)
}

/// Decode base64 image data, with or without a `data:` URL prefix
pub fn decode_image(encoded: &str) -> Result<image::RgbaImage, GenerationError> {
    let data = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| GenerationError::Decode(e.to_string()))?;
    let image = image::load_from_memory(&bytes).map_err(|e| GenerationError::Decode(e.to_string()))?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn png_base64(image: &image::RgbaImage) -> String {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        STANDARD.encode(png)
    }

    fn http_reply(status: &str, body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }

    fn chunked_reply(body: &str) -> Vec<u8> {
        let mut reply = String::from(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        );
        for piece in body.as_bytes().chunks(7) {
            let piece = std::str::from_utf8(piece).unwrap();
            reply.push_str(&format!("{:x}\r\n{piece}\r\n", piece.len()));
        }
        reply.push_str("0\r\n\r\n");
        reply.into_bytes()
    }

    async fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Read one request from `socket`; returns its text
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            request.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        String::from_utf8(request).unwrap()
    }

    /// Accept one connection, read one request, send `reply`; returns the request text
    async fn serve_once(listener: TcpListener, reply: Vec<u8>) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        // The client may hang up early on oversized replies
        let _ = socket.write_all(&reply).await;
        let _ = socket.shutdown().await;
        request
    }

    #[test]
    fn test_accepts_http_and_https_urls() {
        assert!(RemoteGeneration::new("http://localhost:7860/generate").is_ok());
        assert!(RemoteGeneration::new("https://api.example.com/v1/generate").is_ok());

        let client = RemoteGeneration::new("http://localhost:7860?model=x").unwrap();
        assert_eq!(client.url().port(), Some(7860));
        assert_eq!(client.url().query(), Some("model=x"));
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(RemoteGeneration::new("ftp://x/y"), Err(GenerationError::InvalidUrl(_))));
        assert!(matches!(RemoteGeneration::new("http://host:abc/"), Err(GenerationError::InvalidUrl(_))));
        assert!(matches!(RemoteGeneration::new("not a url"), Err(GenerationError::InvalidUrl(_))));
    }

    #[test]
    fn test_response_limit_scales_with_size() {
        let small = response_limit(&GenerationRequest::new("x").with_size(1, 1));
        let large = response_limit(&GenerationRequest::new("x").with_size(512, 512));
        assert_eq!(small, 8 + RESPONSE_SLACK);
        assert!(large > 512 * 512 * 4);
        assert_eq!(
            response_limit(&GenerationRequest::new("x").with_size(u32::MAX, u32::MAX)),
            usize::MAX
        );
    }

    #[test]
    fn test_decode_image_with_and_without_data_url() {
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 200, 30, 255]));
        let encoded = png_base64(&image);

        assert_eq!(decode_image(&encoded).unwrap(), image);
        assert_eq!(decode_image(&format!("data:image/png;base64,{encoded}")).unwrap(), image);
        assert!(matches!(decode_image("not base64!"), Err(GenerationError::Decode(_))));
    }

    #[test]
    fn test_decode_payload_reports_server_error() {
        let result = decode_payload(br#"{"error":"model not loaded"}"#);
        assert!(matches!(result, Err(GenerationError::Server(m)) if m == "model not loaded"));

        let result = decode_payload(b"{}");
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let (listener, port) = local_listener().await;

        let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        let reply = http_reply("200 OK", &format!(r#"{{"image":"{}"}}"#, png_base64(&image)));
        let server = tokio::spawn(serve_once(listener, reply));

        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}/generate")).unwrap();
        // Nothing is running yet, so this has no effect on the request below
        assert!(!client.cancel_handle().cancel());

        let request = GenerationRequest::new("red brick").with_size(4, 4).with_steps(2);
        let result = client.generate(request.clone()).await.unwrap();

        assert_eq!(result, image);
        assert!(!client.is_generating());

        let sent = server.await.unwrap();
        assert!(sent.starts_with("POST /generate HTTP/1.1"));
        let body = &sent[sent.find("\r\n\r\n").unwrap() + 4..];
        let decoded: GenerationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn test_chunked_reply_and_query_only_url() {
        let (listener, port) = local_listener().await;

        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 255]));
        let reply = chunked_reply(&format!(r#"{{"image":"{}"}}"#, png_base64(&image)));
        let server = tokio::spawn(serve_once(listener, reply));

        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}?model=sd")).unwrap();
        let result = client
            .generate(GenerationRequest::new("sky").with_size(2, 2))
            .await
            .unwrap();
        assert_eq!(result, image);

        let sent = server.await.unwrap();
        assert!(sent.starts_with("POST /?model=sd HTTP/1.1"), "{sent}");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(serve_once(listener, http_reply("503 Service Unavailable", "busy")));

        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}/")).unwrap();
        let result = client.generate(GenerationRequest::new("x")).await;

        assert!(matches!(result, Err(GenerationError::Http { status: 503, .. })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_message_from_failed_status() {
        let (listener, port) = local_listener().await;
        let reply = http_reply("500 Internal Server Error", r#"{"error":"out of memory"}"#);
        let server = tokio::spawn(serve_once(listener, reply));

        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}/")).unwrap();
        let result = client.generate(GenerationRequest::new("x")).await;

        assert!(matches!(result, Err(GenerationError::Server(m)) if m == "out of memory"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_reply_is_rejected() {
        let request = GenerationRequest::new("x").with_size(1, 1);
        let limit = response_limit(&request);
        let padding = "a".repeat(limit + 1);

        // Declared length over the limit
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(serve_once(listener, http_reply("200 OK", &padding)));
        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}/")).unwrap();
        let result = client.generate(request.clone()).await;
        assert!(matches!(result, Err(GenerationError::ResponseTooLarge { limit: l }) if l == limit));
        server.await.unwrap();

        // No declared length; the streamed body crosses the limit
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(serve_once(listener, chunked_reply(&padding)));
        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}/")).unwrap();
        let result = client.generate(request).await;
        assert!(matches!(result, Err(GenerationError::ResponseTooLarge { .. })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stalled_request() {
        let (listener, port) = local_listener().await;
        // Reads the request, then never answers
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}/")).unwrap();
        let handle = client.cancel_handle();
        let canceller = tokio::spawn(async move {
            while !handle.is_active() {
                tokio::task::yield_now().await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel()
        });

        let started = Instant::now();
        let result = client.generate(GenerationRequest::new("x")).await;

        assert!(matches!(result, Err(GenerationError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(canceller.await.unwrap());
        assert!(!client.is_generating());
        server.abort();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let (_listener, port) = local_listener().await;
            port
        };
        let mut client = RemoteGeneration::new(&format!("http://127.0.0.1:{port}/"))
            .unwrap()
            .with_timeout(Duration::from_secs(5));

        let result = client.generate(GenerationRequest::new("x")).await;
        assert!(matches!(result, Err(GenerationError::Connection(_))));
    }
}
