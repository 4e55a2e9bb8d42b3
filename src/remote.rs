//! Remote packing optimizer.
//!
//! The remote service receives the full catalog and product set and is asked
//! to minimize the number of bins. Its answers fall into three groups:
//! - exactly one bin holds everything: [`RemotePackingOutcome::Packed`]
//! - the service says it cannot be done in one bin: [`RemotePackingOutcome::Infeasible`]
//! - the call or the response is broken: [`RemoteApiError`]

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{Packaging, PackagingId, Product, ProductId};

const PACK_INTO_MANY_PATH: &str = "/packer/packIntoMany";
const OPTIMIZATION_MODE: &str = "bins_number";

/// Definite answers of the remote optimizer.
#[derive(Clone, Debug, PartialEq)]
pub enum RemotePackingOutcome {
    /// All products fit into this single packaging.
    Packed {
        packaging_id: PackagingId,
        /// Fraction of the packaging volume in use (0.0 to 1.0).
        volume_utilization: f64,
    },
    /// No single packaging holds all products.
    Infeasible(String),
}

/// The remote optimizer could not give an answer.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("remote packing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote packing response unusable: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait RemotePackingApi: Send + Sync {
    async fn find_minimal_packaging(
        &self,
        packagings: &[Packaging],
        products: &[Product],
    ) -> Result<RemotePackingOutcome, RemoteApiError>;
}

fn user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    format!("packwise/{version} ({os}; {arch})")
}

#[derive(Debug, Serialize)]
struct PackIntoManyRequest<'a> {
    username: &'a str,
    api_key: &'a str,
    bins: Vec<WireBin>,
    items: Vec<WireItem>,
    params: WireParams,
}

#[derive(Debug, Serialize, PartialEq)]
struct WireBin {
    id: u64,
    h: f64,
    w: f64,
    d: f64,
    max_wg: f64,
}

#[derive(Debug, Serialize, PartialEq)]
struct WireItem {
    id: u64,
    h: f64,
    w: f64,
    d: f64,
    wg: f64,
    /// Vertical rotation allowed.
    vr: u8,
    q: u32,
}

#[derive(Debug, Serialize)]
struct WireParams {
    optimization_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct PackIntoManyEnvelope {
    response: PackIntoManyResponse,
}

#[derive(Debug, Deserialize)]
struct PackIntoManyResponse {
    status: i64,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    #[serde(default)]
    not_packed_items: Vec<WireNotPacked>,
    #[serde(default)]
    bins_packed: Vec<WirePackedBin>,
}

#[derive(Debug, Deserialize)]
struct WireNotPacked {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WirePackedBin {
    #[serde(default)]
    bin_data: Option<WireBinData>,
}

#[derive(Debug, Deserialize)]
struct WireBinData {
    id: serde_json::Value,
    used_space: f64,
}

/// Client of the 3D bin packing HTTP API.
#[derive(Clone, Debug)]
pub struct BinPackingClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    api_key: String,
}

impl BinPackingClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, PACK_INTO_MANY_PATH)
    }

    fn compile_request<'a>(
        &'a self,
        packagings: &[Packaging],
        products: &[Product],
    ) -> PackIntoManyRequest<'a> {
        PackIntoManyRequest {
            username: &self.username,
            api_key: &self.api_key,
            bins: packagings.iter().map(wire_bin).collect(),
            items: wire_items(products),
            params: WireParams {
                optimization_mode: OPTIMIZATION_MODE,
            },
        }
    }
}

fn wire_bin(packaging: &Packaging) -> WireBin {
    WireBin {
        id: packaging.id.get(),
        h: packaging.height,
        w: packaging.width,
        d: packaging.length,
        max_wg: packaging.max_weight,
    }
}

/// One wire item per distinct product, repeated products become a quantity.
fn wire_items(products: &[Product]) -> Vec<WireItem> {
    let mut items: Vec<(ProductId, WireItem)> = Vec::new();
    for product in products {
        if let Some((_, item)) = items.iter_mut().find(|(id, _)| *id == product.id) {
            item.q += 1;
            continue;
        }
        let [d1, d2, d3] = product.dims;
        items.push((
            product.id,
            WireItem {
                id: product.id.get(),
                h: d1,
                w: d2,
                d: d3,
                wg: product.weight,
                vr: 1,
                q: 1,
            },
        ));
    }
    items.into_iter().map(|(_, item)| item).collect()
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .map(render_value)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

fn parse_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(number) => number.as_u64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn interpret_response(
    response: PackIntoManyResponse,
) -> Result<RemotePackingOutcome, RemoteApiError> {
    if response.status != 1 {
        let reason = response.errors.first().map(render_value).unwrap_or_else(|| {
            "remote optimizer responded with error status but without error message".to_string()
        });
        return Ok(RemotePackingOutcome::Infeasible(reason));
    }

    if !response.not_packed_items.is_empty() {
        let ids = response
            .not_packed_items
            .iter()
            .map(|item| render_value(&item.id))
            .collect::<Vec<_>>()
            .join(", ");
        return Ok(RemotePackingOutcome::Infeasible(format!(
            "could not pack items with ids [{ids}]"
        )));
    }

    if response.bins_packed.len() > 1 {
        return Ok(RemotePackingOutcome::Infeasible(format!(
            "items need {} bins instead of one",
            response.bins_packed.len()
        )));
    }

    let bin_data = response
        .bins_packed
        .into_iter()
        .next()
        .and_then(|bin| bin.bin_data)
        .ok_or_else(|| RemoteApiError::Protocol("response carries no bin data".to_string()))?;

    let packaging_id = parse_id(&bin_data.id).ok_or_else(|| {
        RemoteApiError::Protocol(format!("bin id {} is not a packaging id", bin_data.id))
    })?;

    if !bin_data.used_space.is_finite() || bin_data.used_space < 0.0 {
        return Err(RemoteApiError::Protocol(format!(
            "used space {} is not a percentage",
            bin_data.used_space
        )));
    }

    Ok(RemotePackingOutcome::Packed {
        packaging_id: PackagingId::new(packaging_id),
        volume_utilization: bin_data.used_space / 100.0,
    })
}

#[async_trait]
impl RemotePackingApi for BinPackingClient {
    async fn find_minimal_packaging(
        &self,
        packagings: &[Packaging],
        products: &[Product],
    ) -> Result<RemotePackingOutcome, RemoteApiError> {
        let body = self.compile_request(packagings, products);
        debug!(
            endpoint = %self.endpoint(),
            bins = body.bins.len(),
            items = body.items.len(),
            "calling remote packing optimizer"
        );

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        let envelope: PackIntoManyEnvelope = serde_json::from_str(&text).map_err(|err| {
            RemoteApiError::Protocol(format!("error parsing bin packing response: {err}"))
        })?;
        interpret_response(envelope.response)
    }
}
