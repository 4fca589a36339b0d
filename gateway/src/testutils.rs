use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned reply of the mock upstream.
pub struct MockResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self::raw(status, serde_json::to_vec(&value).unwrap())
    }

    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
        MockResponse {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as seen by the mock upstream.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, e.g. `/api?rows=5`.
    pub uri: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct MockUpstream {
    pub port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path_and_query)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock upstream that answers every request with `respond(path_and_query)`.
pub async fn start_mock_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let respond = Arc::new(respond);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let io = TokioIo::new(stream);
            let respond = respond.clone();
            let recorded = recorded.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let respond = respond.clone();
                    let recorded = recorded.clone();
                    async move {
                        let uri = req
                            .uri()
                            .path_and_query()
                            .map(|pq| pq.as_str().to_string())
                            .unwrap_or_default();
                        let headers = req
                            .headers()
                            .iter()
                            .map(|(name, value)| {
                                (
                                    name.as_str().to_string(),
                                    value.to_str().unwrap_or_default().to_string(),
                                )
                            })
                            .collect();
                        recorded.lock().unwrap().push(RecordedRequest {
                            method: req.method().to_string(),
                            uri: uri.clone(),
                            headers,
                        });

                        let mock = (*respond)(&uri);
                        if !mock.delay.is_zero() {
                            tokio::time::sleep(mock.delay).await;
                        }

                        let mut response = Response::new(Full::new(Bytes::from(mock.body)));
                        *response.status_mut() = StatusCode::from_u16(mock.status).unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });

                let _ = Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    MockUpstream { port, requests }
}

/// Start an upstream that writes `response` verbatim once the request head
/// has arrived, then closes the connection.
///
/// Covers replies the hyper server never produces: chunked bodies without a
/// length and bodies cut short of their declared length.
pub async fn start_raw_upstream(response: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut head: Vec<u8> = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == &b"\r\n\r\n"[..]) {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(response).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    port
}

/// A local port with nothing listening on it.
pub async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
