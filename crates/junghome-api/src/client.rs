// Gateway REST client
//
// Wraps `reqwest::Client` with the gateway's URL layout and status mapping.
// No retries happen here; callers decide what is worth repeating.

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::error::Error;
use crate::models::{Catalog, DatapointValues, HubConfig, PatchBody, PatchOutcome};
use crate::transport::TransportConfig;

const API_PREFIX: &str = "api/junghome/";

/// HTTP client for the gateway's `/api/junghome/` surface.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GatewayClient {
    /// Build a client for `base_url` (e.g. `https://192.168.1.20`) that
    /// sends `token` on every request.
    pub fn new(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wrap a pre-built `reqwest::Client`. Mostly useful in tests.
    pub fn with_client(http: reqwest::Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    /// Parse `base_url` and wrap a pre-built client.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self::with_client(http, Url::parse(base_url)?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(API_PREFIX)?.join(path)?)
    }

    /// `{base}/api/junghome/functions/`
    pub fn functions_url(&self) -> Result<Url, Error> {
        self.api_url("functions/")
    }

    /// `{base}/api/junghome/config/`
    pub fn config_url(&self) -> Result<Url, Error> {
        self.api_url("config/")
    }

    /// `{base}/api/junghome/functions/{device}/datapoints/{datapoint}`
    pub fn datapoint_url(&self, device_id: &str, datapoint_id: &str) -> Result<Url, Error> {
        let mut url = self.api_url("functions/")?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend([device_id, "datapoints", datapoint_id]);
        Ok(url)
    }

    /// Socket URL with a cache-busting timestamp: `wss://{host}/ws?t={millis}`.
    ///
    /// `https` maps to `wss` and `http` to `ws`.
    pub fn ws_url(&self, now_millis: i64) -> Result<Url, Error> {
        let mut url = self.base_url.join("ws")?;
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        url.set_scheme(scheme).map_err(|()| {
            Error::WebSocketConnect(format!("cannot derive socket URL from {}", self.base_url))
        })?;
        url.query_pairs_mut()
            .clear()
            .append_pair("t", &now_millis.to_string());
        Ok(url)
    }

    // ── Typed endpoints ──────────────────────────────────────────────

    /// Full device catalog. A body that is not an array is a decode
    /// error; a malformed entry only costs that entry.
    pub async fn list_functions(&self) -> Result<Catalog, Error> {
        let url = self.functions_url()?;
        let entries: Vec<Value> = self.get_json(url).await?;
        Ok(Catalog::from_entries(entries))
    }

    /// Hub configuration.
    pub async fn hub_config(&self) -> Result<HubConfig, Error> {
        let url = self.config_url()?;
        self.get_json(url).await
    }

    /// Current values of one datapoint.
    pub async fn datapoint(
        &self,
        device_id: &str,
        datapoint_id: &str,
    ) -> Result<DatapointValues, Error> {
        let url = self.datapoint_url(device_id, datapoint_id)?;
        self.get_json(url).await
    }

    /// Write a datapoint. The gateway answers with either an echo or an
    /// empty body; both count as success.
    pub async fn set_datapoint(
        &self,
        device_id: &str,
        datapoint_id: &str,
        body: &PatchBody,
    ) -> Result<PatchOutcome, Error> {
        let url = self.datapoint_url(device_id, datapoint_id)?;
        self.patch_json(url, body).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url.clone()).send().await?;
        let body = check_status(&url, resp).await?;

        serde_json::from_str(&body).map_err(|e| Error::decode(&e, &body))
    }

    /// PATCH `url` with a JSON body.
    pub async fn patch_json(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<PatchOutcome, Error> {
        debug!("PATCH {url}");

        let resp = self.http.patch(url.clone()).json(body).send().await?;
        let text = check_status(&url, resp).await?;

        if text.trim().is_empty() {
            return Ok(PatchOutcome::Accepted);
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Ok(PatchOutcome::Echo(value)),
            Err(e) => {
                debug!(error = %e, "PATCH response is not JSON, treating as success");
                Ok(PatchOutcome::Accepted)
            }
        }
    }
}

/// Map the response status, returning the body text on success.
async fn check_status(url: &Url, resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        error!(%url, "gateway rejected the token");
        return Err(Error::Authentication {
            message: format!("token rejected by {}", url.host_str().unwrap_or("gateway")),
        });
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound {
            url: url.to_string(),
        });
    }

    let body = resp.text().await?;
    if !status.is_success() {
        let message: String = body.chars().take(200).collect();
        return Err(Error::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}
