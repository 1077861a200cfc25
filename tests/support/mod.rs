//! Purpose: Loopback axum server that records every request and answers from a fixed script.
//! Exports: `Stub`, `Recorded`, `RecordedPart`, `TestResult`.
//! Role: Shared by the transport and CLI integration tests.
//! Invariants: Binds 127.0.0.1 on an ephemeral port; the runtime is torn down when the stub drops.
//! Invariants: A request is recorded before its response is written.
#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use islandora_rest::api::{Credentials, Endpoint, IslandoraClient, UreqTransport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Runtime;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Clone, Debug)]
pub struct RecordedPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RecordedPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Decoded form parts when the body was `multipart/form-data`.
    pub parts: Vec<RecordedPart>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn part(&self, name: &str) -> Option<&RecordedPart> {
        self.parts.iter().find(|part| part.name == name)
    }
}

#[derive(Default)]
struct StubState {
    script: Mutex<VecDeque<(u16, String)>>,
    recorded: Mutex<Vec<Recorded>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

pub struct Stub {
    base_url: String,
    state: Arc<StubState>,
    runtime: Option<Runtime>,
}

impl Stub {
    pub fn start(script: Vec<(u16, &str)>) -> TestResult<Self> {
        let state = Arc::new(StubState::default());
        lock(&state.script).extend(
            script
                .into_iter()
                .map(|(status, body)| (status, body.to_string())),
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let listener = runtime.block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))?;
        let base_url = format!("http://{}/islandora/rest/", listener.local_addr()?);
        let app = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&state));
        runtime.spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            state,
            runtime: Some(runtime),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self, credentials: Option<Credentials>) -> TestResult<IslandoraClient> {
        let mut transport = UreqTransport::new().with_timeout(Duration::from_secs(10));
        if let Some(credentials) = credentials {
            transport = transport.with_credentials(credentials);
        }
        Ok(IslandoraClient::with_transport(
            Endpoint::new(self.base_url.clone())?,
            transport,
        ))
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        lock(&self.state.recorded).clone()
    }
}

impl Drop for Stub {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn record(State(state): State<Arc<StubState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let method = parts.method.as_str().to_string();
    let target = parts
        .uri
        .path_and_query()
        .map(|path| path.as_str().to_string())
        .unwrap_or_default();
    let headers: Vec<(String, String)> = parts
        .headers
        .iter()
        .map(|(key, value)| {
            (
                key.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let is_multipart = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));
    let form_parts = if is_multipart {
        read_parts(Request::from_parts(parts, Body::from(bytes.clone()))).await
    } else {
        Vec::new()
    };

    lock(&state.recorded).push(Recorded {
        method,
        target,
        headers,
        body: bytes.to_vec(),
        parts: form_parts,
    });
    let (status, body) = lock(&state.script)
        .pop_front()
        .unwrap_or((500, "stub script exhausted".to_string()));
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn read_parts(request: Request) -> Vec<RecordedPart> {
    let Ok(mut multipart) = Multipart::from_request(request, &()).await else {
        return Vec::new();
    };
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|bytes| bytes.to_vec()).unwrap_or_default();
        parts.push(RecordedPart {
            name,
            filename,
            content_type,
            data,
        });
    }
    parts
}
