use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use signage_shared::pairing::{InitiatePairingBody, InitiatePairingResponse, PairingStatus};

use crate::config::Config;

/// The two pairing calls a player makes against the server.
#[async_trait]
pub trait PairingApi: Send + Sync {
    async fn initiate_pairing(&self, device_id: &str) -> Result<InitiatePairingResponse>;

    async fn pairing_status(&self, device_id: &str) -> Result<PairingStatus>;
}

#[async_trait]
impl<T: PairingApi + ?Sized> PairingApi for Arc<T> {
    async fn initiate_pairing(&self, device_id: &str) -> Result<InitiatePairingResponse> {
        (**self).initiate_pairing(device_id).await
    }

    async fn pairing_status(&self, device_id: &str) -> Result<PairingStatus> {
        (**self).pairing_status(device_id).await
    }
}

pub struct HttpPairingApi {
    api_url: String,
    client: Client,
}

impl HttpPairingApi {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            api_url: config.api_base().to_string(),
            client: get_client(config.trust_invalid_server_cert, config.request_timeout())?,
        })
    }
}

#[async_trait]
impl PairingApi for HttpPairingApi {
    async fn initiate_pairing(&self, device_id: &str) -> Result<InitiatePairingResponse> {
        let url = format!("{}/api/screens/initiate-pairing", self.api_url);
        let res = self
            .client
            .post(&url)
            .json(&InitiatePairingBody {
                device_hardware_id: device_id.to_string(),
            })
            .send()
            .await?;
        match res.error_for_status() {
            Ok(r) => Ok(r.json().await?),
            Err(e) => Err(anyhow!(e)),
        }
    }

    async fn pairing_status(&self, device_id: &str) -> Result<PairingStatus> {
        let url = format!("{}/api/screens/pairing-status/{}", self.api_url, device_id);
        let res = self.client.get(&url).send().await?;
        match res.error_for_status() {
            Ok(r) => Ok(r.json().await?),
            Err(e) => Err(anyhow!(e)),
        }
    }
}

fn get_client(trust_invalid_server_cert: bool, timeout: Duration) -> Result<Client> {
    // self-signed certificates are common on local signage controllers
    let builder = Client::builder().timeout(timeout);
    let client = if trust_invalid_server_cert {
        builder.danger_accept_invalid_certs(true).build()?
    } else {
        builder.build()?
    };
    Ok(client)
}
