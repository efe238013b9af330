//! IBGE geography API client.

use crate::domain::{Locality, Region};
use crate::error::AppError;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://servicodados.ibge.gov.br/api";

/// Remote source of regions and their localities.
pub trait GeoSource: Send + Sync {
    fn regions(&self) -> Result<Vec<Region>, AppError>;
    fn localities(&self, region: &Region) -> Result<Vec<Locality>, AppError>;
}

#[derive(Debug, Deserialize)]
struct IbgeUfRes {
    sigla: String,
}

#[derive(Debug, Deserialize)]
struct IbgeCityRes {
    nome: String,
}

pub fn decode_regions(body: &str) -> Result<Vec<Region>, AppError> {
    let rows: Vec<IbgeUfRes> =
        serde_json::from_str(body).map_err(|e| AppError::InvalidResponse(e.to_string()))?;
    Ok(rows.into_iter().map(|r| Region(r.sigla)).collect())
}

pub fn decode_localities(body: &str) -> Result<Vec<Locality>, AppError> {
    let rows: Vec<IbgeCityRes> =
        serde_json::from_str(body).map_err(|e| AppError::InvalidResponse(e.to_string()))?;
    Ok(rows.into_iter().map(|r| Locality(r.nome)).collect())
}

pub struct IbgeClient {
    agent: ureq::Agent,
    base_url: String,
}

impl IbgeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn regions_url(&self) -> String {
        format!("{}/v1/localidades/estados", self.base_url)
    }

    pub fn localities_url(&self, region: &Region) -> String {
        format!(
            "{}/v1/localidades/estados/{}/municipios",
            self.base_url,
            region.as_str()
        )
    }

    fn get(&self, url: &str) -> Result<String, AppError> {
        log::debug!("GET {}", url);
        let response = self
            .agent
            .get(url)
            .set("Accept", "application/json")
            .call()
            .map_err(|e| AppError::Network(e.to_string()))?;
        response
            .into_string()
            .map_err(|e| AppError::InvalidResponse(e.to_string()))
    }
}

impl GeoSource for IbgeClient {
    fn regions(&self) -> Result<Vec<Region>, AppError> {
        decode_regions(&self.get(&self.regions_url())?)
    }

    fn localities(&self, region: &Region) -> Result<Vec<Locality>, AppError> {
        decode_localities(&self.get(&self.localities_url(region))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_regions_keeps_order_and_ignores_extra_fields() {
        let body = r#"[{"id":35,"sigla":"SP","nome":"São Paulo"},{"id":33,"sigla":"RJ","nome":"Rio de Janeiro"}]"#;
        let regions = decode_regions(body).unwrap();
        assert_eq!(regions, vec![Region::new("SP"), Region::new("RJ")]);
    }

    #[test]
    fn decode_localities_keeps_order() {
        let body = r#"[{"id":3509502,"nome":"Campinas"},{"id":3548500,"nome":"Santos"}]"#;
        let localities = decode_localities(body).unwrap();
        assert_eq!(
            localities,
            vec![Locality::new("Campinas"), Locality::new("Santos")]
        );
    }

    #[test]
    fn decode_rejects_non_array() {
        let err = decode_regions(r#"{"message":"down"}"#).unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE");
    }

    #[test]
    fn urls_follow_ibge_layout() {
        let client = IbgeClient::new("https://geo.example/api/", Duration::from_secs(1));
        assert_eq!(
            client.regions_url(),
            "https://geo.example/api/v1/localidades/estados"
        );
        assert_eq!(
            client.localities_url(&Region::new("SP")),
            "https://geo.example/api/v1/localidades/estados/SP/municipios"
        );
    }
}
