use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Address as returned by BrasilAPI's CEP v1 endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrasilApiAddress {
    pub cep: String,
    pub state: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
    /// Upstream provider BrasilAPI used to answer the request.
    pub service: String,
}

/// Address as returned by ViaCEP's JSON endpoint. Field names follow the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViaCepAddress {
    pub cep: String,
    pub logradouro: String,
    pub complemento: String,
    pub unidade: String,
    pub bairro: String,
    pub localidade: String,
    pub uf: String,
    pub ibge: String,
    pub gia: String,
    pub ddd: String,
    pub siafi: String,
}

/// Address record produced by one of the supported sources. The shape depends on the
/// source that answered, no common schema is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AddressRecord {
    BrasilApi(BrasilApiAddress),
    ViaCep(ViaCepAddress),
}

impl AddressRecord {
    pub fn cep(&self) -> &str {
        match self {
            AddressRecord::BrasilApi(address) => &address.cep,
            AddressRecord::ViaCep(address) => &address.cep,
        }
    }

    pub fn city(&self) -> &str {
        match self {
            AddressRecord::BrasilApi(address) => &address.city,
            AddressRecord::ViaCep(address) => &address.localidade,
        }
    }

    fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            AddressRecord::BrasilApi(a) => vec![
                ("cep", a.cep.as_str()),
                ("state", a.state.as_str()),
                ("city", a.city.as_str()),
                ("neighborhood", a.neighborhood.as_str()),
                ("street", a.street.as_str()),
                ("service", a.service.as_str()),
            ],
            AddressRecord::ViaCep(a) => vec![
                ("cep", a.cep.as_str()),
                ("logradouro", a.logradouro.as_str()),
                ("complemento", a.complemento.as_str()),
                ("unidade", a.unidade.as_str()),
                ("bairro", a.bairro.as_str()),
                ("localidade", a.localidade.as_str()),
                ("uf", a.uf.as_str()),
                ("ibge", a.ibge.as_str()),
                ("gia", a.gia.as_str()),
                ("ddd", a.ddd.as_str()),
                ("siafi", a.siafi.as_str()),
            ],
        }
    }
}

impl Display for AddressRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields = self.fields();
        let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or_default();
        for (idx, (name, value)) in fields.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  {name:<width$}  {value}")?;
        }
        Ok(())
    }
}

impl From<BrasilApiAddress> for AddressRecord {
    fn from(value: BrasilApiAddress) -> Self {
        AddressRecord::BrasilApi(value)
    }
}

impl From<ViaCepAddress> for AddressRecord {
    fn from(value: ViaCepAddress) -> Self {
        AddressRecord::ViaCep(value)
    }
}
