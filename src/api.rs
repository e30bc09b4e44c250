use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sync::{Request, Response};
use crate::wallet::{AddressDetail, AddressEntry, Balance, HistoryEntry};

/// Why a backend call did not produce a usable result.
///
/// Callers treat every variant the same way; the split only helps the
/// message shown to the user and the logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to parse response: {0}")]
    Decode(String),
    #[error("server error {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CreateAddressBody<'a> {
    label: Option<&'a str>,
}

#[derive(Serialize)]
struct SetLabelBody<'a> {
    address: &'a str,
    label: &'a str,
}

#[derive(Serialize)]
struct SendBody<'a> {
    address: &'a str,
    amount: &'a str,
}

#[derive(Deserialize)]
struct HistoryData {
    #[serde(default)]
    response: Vec<HistoryEntry>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API url {} cannot be used as a base", base_url);
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    /// Issues one request and returns the response once its status is known
    /// to be a success. Never retries.
    pub async fn call<B: Serialize>(
        &self,
        op: &str,
        method: Method,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<reqwest::Response, FetchError> {
        let url = self.url(path)?;
        debug!("{}: {} {}", op, method, url);

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("{}: request failed: {}", op, e);
            FetchError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{}: server returned {}", op, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn call_json<T: DeserializeOwned, B: Serialize>(
        &self,
        op: &str,
        method: Method,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<T, FetchError> {
        let text = self.call_text(op, method, path, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("{}: undecodable response: {}", op, e);
            FetchError::Decode(e.to_string())
        })
    }

    async fn call_text<B: Serialize>(
        &self,
        op: &str,
        method: Method,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<String, FetchError> {
        self.call(op, method, path, body)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    pub async fn balance(&self) -> Result<Balance, FetchError> {
        self.call_json("balance", Method::GET, &["balance"], None::<&()>)
            .await
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, FetchError> {
        let data: HistoryData = self
            .call_json("history", Method::GET, &["history"], None::<&()>)
            .await?;
        Ok(data.response)
    }

    pub async fn addresses(&self) -> Result<Vec<AddressEntry>, FetchError> {
        self.call_json("addresses", Method::GET, &["addresses"], None::<&()>)
            .await
    }

    pub async fn address_detail(&self, address: &str) -> Result<AddressDetail, FetchError> {
        self.call_json(
            "address_detail",
            Method::GET,
            &["balance", address],
            None::<&()>,
        )
        .await
    }

    /// The backend echoes the new address; the client only needs success.
    pub async fn create_address(&self, label: Option<&str>) -> Result<(), FetchError> {
        let body = CreateAddressBody { label };
        self.call("create_address", Method::POST, &["addresses"], Some(&body))
            .await?;
        Ok(())
    }

    pub async fn set_label(&self, address: &str, label: &str) -> Result<(), FetchError> {
        let body = SetLabelBody { address, label };
        self.call("set_label", Method::POST, &["label"], Some(&body))
            .await?;
        Ok(())
    }

    /// Returns the backend's reply as plain text, to be shown verbatim.
    pub async fn send(&self, address: &str, amount: &str) -> Result<String, FetchError> {
        let body = SendBody { address, amount };
        self.call_text("send", Method::POST, &["send"], Some(&body))
            .await
    }

    /// Runs a controller request and wraps the outcome for `SyncController::apply`.
    pub async fn execute(self, request: Request) -> Response {
        match request {
            Request::Balance => Response::Balance(self.balance().await),
            Request::History => Response::History(self.history().await),
            Request::Addresses => Response::Addresses(self.addresses().await),
            Request::AddressDetail(ticket) => {
                let result = self.address_detail(&ticket.address).await;
                Response::AddressDetail { ticket, result }
            }
            Request::CreateAddress { label } => {
                Response::AddressCreated(self.create_address(label.as_deref()).await)
            }
            Request::SetLabel { address, label } => {
                Response::LabelSet(self.set_label(&address, &label).await)
            }
            Request::Send { address, amount } => {
                Response::Sent(self.send(&address, &amount).await)
            }
        }
    }
}
