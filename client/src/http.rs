//! HTTP implementation of the endpoint traits, talking to `fieldsync-server`.

use crate::config::ClientConfig;
use crate::endpoint::{PersistenceEndpoint, WatchEndpoint};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use fieldsync_engine::{
    FieldKey, Patch, RecordValues, SaveFailure, SaveRequest, SaveResponse, WatchRequest,
    WatchState,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;

/// Error body of non-2xx answers.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Reqwest-backed endpoint.
///
/// Failure mapping: `{ok:false}` and 4xx answers are rejections; connection
/// errors, timeouts, 5xx answers and undecodable bodies are transport
/// failures.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpEndpoint {
    /// Endpoint with a default reqwest client.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url, None)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Self::with_client(client, &config.endpoint_url, config.auth_token.clone())
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        auth_token: Option<String>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    /// `{base}/records/{record_id}[/{tail}]`, with the id percent-encoded.
    pub fn record_url(&self, record_id: &str, tail: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("records").push(record_id);
            if let Some(tail) = tail {
                segments.push(tail);
            }
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Authoritative snapshot of a record, for seeding a driver.
    pub async fn fetch_record<K: FieldKey>(&self, record_id: &str) -> Result<Patch<K>> {
        let request = self.client.get(self.record_url(record_id, None));
        let response = self.authorized(request).send().await?;
        let body: RecordValues<K> = expect_success(response).await?.json().await?;
        Ok(body.values)
    }

    /// Seed or replace the full field map of a record.
    pub async fn replace_record<K: FieldKey>(
        &self,
        record_id: &str,
        values: Patch<K>,
    ) -> Result<()> {
        let request = self
            .client
            .put(self.record_url(record_id, None))
            .json(&RecordValues { values });
        let response = self.authorized(request).send().await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn watch_call(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<WatchState, SaveFailure> {
        let response = self.authorized(request).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        decode_watch(status, &body)
    }
}

#[async_trait]
impl<K: FieldKey> PersistenceEndpoint<K> for HttpEndpoint {
    async fn save(
        &self,
        record_id: &str,
        patch: Patch<K>,
    ) -> std::result::Result<Patch<K>, SaveFailure> {
        let request = self
            .client
            .post(self.record_url(record_id, Some("save")))
            .json(&SaveRequest { patch });
        let response = self.authorized(request).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        decode_save(status, &body)
    }
}

#[async_trait]
impl WatchEndpoint for HttpEndpoint {
    async fn set_watching(
        &self,
        record_id: &str,
        watching: bool,
    ) -> std::result::Result<(), SaveFailure> {
        let request = self
            .client
            .put(self.record_url(record_id, Some("watch")))
            .json(&WatchRequest { watching });
        self.watch_call(request).await.map(|_| ())
    }

    async fn fetch_watch(&self, record_id: &str) -> std::result::Result<WatchState, SaveFailure> {
        let request = self.client.get(self.record_url(record_id, Some("watch")));
        self.watch_call(request).await
    }
}

fn transport(err: reqwest::Error) -> SaveFailure {
    if err.is_timeout() {
        SaveFailure::transport("request timed out")
    } else {
        SaveFailure::transport(err.to_string())
    }
}

/// Map a non-2xx answer onto a save failure.
fn classify(status: StatusCode, body: &[u8]) -> std::result::Result<(), SaveFailure> {
    if status.is_success() {
        return Ok(());
    }
    let message = error_message(status, body);
    if status.is_client_error() {
        Err(SaveFailure::rejected(message))
    } else {
        Err(SaveFailure::transport(message))
    }
}

/// Read a save answer: the authoritative values, or why the save failed.
fn decode_save<K: FieldKey>(
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<Patch<K>, SaveFailure> {
    classify(status, body)?;
    let response: SaveResponse<K> = serde_json::from_slice(body)
        .map_err(|e| SaveFailure::transport(format!("undecodable save response: {e}")))?;
    response.into_result()
}

fn decode_watch(status: StatusCode, body: &[u8]) -> std::result::Result<WatchState, SaveFailure> {
    classify(status, body)?;
    serde_json::from_slice(body)
        .map_err(|e| SaveFailure::transport(format!("undecodable watch state: {e}")))
}

async fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    }
}
