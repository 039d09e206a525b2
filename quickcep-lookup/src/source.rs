use crate::record::{AddressRecord, BrasilApiAddress, ViaCepAddress};
use crate::{LookupError, PostalCode};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;

const BRASIL_API_DEFAULT_BASE_URL: &str = "https://brasilapi.com.br";
const VIA_CEP_DEFAULT_BASE_URL: &str = "https://viacep.com.br";

/// Backends a postal code can be resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    BrasilApi,
    ViaCep,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::BrasilApi, SourceKind::ViaCep];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::BrasilApi => "BrasilAPI",
            SourceKind::ViaCep => "ViaCEP",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            SourceKind::BrasilApi => BRASIL_API_DEFAULT_BASE_URL,
            SourceKind::ViaCep => VIA_CEP_DEFAULT_BASE_URL,
        }
    }

    /// Path of the lookup endpoint for the given postal code, relative to the base URL.
    fn lookup_path(&self, postal_code: &PostalCode) -> String {
        match self {
            SourceKind::BrasilApi => format!("api/cep/v1/{postal_code}"),
            SourceKind::ViaCep => format!("ws/{postal_code}/json/"),
        }
    }

    /// Decodes a successful response body into this source's record shape.
    pub fn decode(&self, body: &[u8]) -> Result<AddressRecord, LookupError> {
        match self {
            SourceKind::BrasilApi => {
                let address: BrasilApiAddress = serde_json::from_slice(body)?;
                Ok(address.into())
            }
            SourceKind::ViaCep => match serde_json::from_slice(body)? {
                ViaCepResponse::NotFound { .. } => Err(LookupError::NotFound(
                    "ViaCEP has no address for this postal code".to_string(),
                )),
                ViaCepResponse::Found(address) => Ok(address.into()),
            },
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "brasilapi" => Ok(SourceKind::BrasilApi),
            "viacep" => Ok(SourceKind::ViaCep),
            _ => Err(format!("unknown source {s:?}, expected one of: brasil_api, via_cep")),
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// ViaCEP answers unknown postal codes with HTTP 200 and `{"erro": true}` (older
/// deployments use the string `"true"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum ViaCepResponse {
    NotFound {
        #[allow(dead_code)]
        #[serde(deserialize_with = "erro_flag")]
        erro: (),
    },
    Found(ViaCepAddress),
}

/// Only a set flag marks the answer as not found, `{"erro": false}` is decoded as an address.
fn erro_flag<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(true) => Ok(()),
        serde_json::Value::String(flag) if flag == "true" => Ok(()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected erro flag: {other}"
        ))),
    }
}

/// A lookup backend: which kind of service it is and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    kind: SourceKind,
    base_url: String,
}

impl Source {
    /// Creates a [`Source`] pointing at the public endpoint of the given kind.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            base_url: kind.default_base_url().to_string(),
        }
    }

    /// Overrides the base URL, e.g. for self-hosted mirrors or mock servers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the request URL for the given postal code.
    ///
    /// Fails with [`LookupError::RequestConstruction`] if the base URL is malformed or
    /// cannot carry a path.
    pub fn lookup_url(&self, postal_code: &PostalCode) -> Result<Url, LookupError> {
        let mut base = Url::parse(&self.base_url)?;
        if base.cannot_be_a_base() {
            return Err(LookupError::RequestConstruction(format!(
                "base URL {:?} cannot carry a path",
                self.base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(&self.kind.lookup_path(postal_code))?)
    }
}
