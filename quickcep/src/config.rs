use crate::CliArgs;
use anyhow::Context;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use quickcep_lookup::{PostalCode, Source, SourceKind};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_POSTAL_CODE: &str = "05874120";
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 1000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub postal_code: PostalCode,
    pub timeout_millis: u64,
    #[serde(deserialize_with = "deserialize_sources")]
    pub sources: Vec<SourceKind>,
    pub cancel_losers: bool,
    pub output: OutputFormat,
    pub brasil_api: SourceEndpointConfig,
    pub via_cep: SourceEndpointConfig,
}

impl AppConfig {
    pub fn parse(cli: &CliArgs) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name(config_file_path("config.toml")?.as_str()).required(false))
            .add_source(File::with_name("config.toml").required(false));

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        Self::load(builder.add_source(environment()), cli)
    }

    /// Layers `sources` on top of the defaults, then applies CLI overrides and validates.
    fn load(sources: ConfigBuilder<DefaultState>, cli: &CliArgs) -> anyhow::Result<Self> {
        let mut config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(sources.build_cloned().context("Failed to build config")?)
            .build()
            .context("Failed to build config")?
            .try_deserialize::<Self>()
            .context("Failed to deserialize config")?;

        config.apply_cli(cli);
        config.validate()?;

        Ok(config)
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        if let Some(postal_code) = &cli.postal_code {
            self.postal_code = postal_code.clone();
        }
        if let Some(timeout_millis) = cli.timeout_millis {
            self.timeout_millis = timeout_millis;
        }
        if !cli.sources.is_empty() {
            self.sources = cli.sources.clone();
        }
        if cli.json {
            self.output = OutputFormat::Json;
        }
    }

    fn validate(&mut self) -> anyhow::Result<()> {
        let mut seen = Vec::with_capacity(self.sources.len());
        self.sources.retain(|kind| {
            if seen.contains(kind) {
                false
            } else {
                seen.push(*kind);
                true
            }
        });

        if self.sources.is_empty() {
            anyhow::bail!("No sources configured");
        } else if self.timeout_millis == 0 {
            anyhow::bail!("Timeout must be greater than zero");
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }

    pub fn source(&self, kind: SourceKind) -> Source {
        let endpoint = match kind {
            SourceKind::BrasilApi => &self.brasil_api,
            SourceKind::ViaCep => &self.via_cep,
        };
        Source::new(kind).with_base_url(endpoint.base_url.clone())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            postal_code: DEFAULT_POSTAL_CODE
                .parse()
                .expect("Default postal code must be valid"),
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            sources: SourceKind::ALL.to_vec(),
            cancel_losers: true,
            output: OutputFormat::default(),
            brasil_api: SourceEndpointConfig::new(SourceKind::BrasilApi),
            via_cep: SourceEndpointConfig::new(SourceKind::ViaCep),
        }
    }
}

/// Environment overrides, e.g. `QUICKCEP__TIMEOUT_MILLIS=500` or
/// `QUICKCEP__BRASIL_API__BASE_URL=http://localhost:9000`. Values are kept as strings so
/// postal codes retain their leading zeros.
fn environment() -> Environment {
    Environment::with_prefix("quickcep").separator("__")
}

/// Accepts either a list of sources or a single comma-separated string, as set through
/// `QUICKCEP__SOURCES=via_cep,brasil_api`.
fn deserialize_sources<'de, D>(deserializer: D) -> Result<Vec<SourceKind>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Sources {
        List(Vec<SourceKind>),
        Joined(String),
    }

    match Sources::deserialize(deserializer)? {
        Sources::List(sources) => Ok(sources),
        Sources::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(serde::de::Error::custom))
            .collect(),
    }
}

pub fn config_file_path(file_name: impl AsRef<Path>) -> anyhow::Result<String> {
    Ok(Path::new("/etc")
        .join(env!("CARGO_PKG_NAME").to_lowercase())
        .join(file_name)
        .to_str()
        .context("Failed to build config file path")?
        .to_string())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceEndpointConfig {
    pub base_url: String,
}

impl SourceEndpointConfig {
    fn new(kind: SourceKind) -> Self {
        Self {
            base_url: kind.default_base_url().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn cli(args: &[&str]) -> CliArgs {
        use clap::Parser;
        CliArgs::parse_from(std::iter::once("quickcep").chain(args.iter().copied()))
    }

    fn load(toml: &str, args: &[&str]) -> anyhow::Result<AppConfig> {
        AppConfig::load(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
            &cli(args),
        )
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let config = load("", &[])?;
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.postal_code.as_str(), "05874120");
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.sources, vec![SourceKind::BrasilApi, SourceKind::ViaCep]);
        assert_eq!(
            config.source(SourceKind::ViaCep).base_url(),
            "https://viacep.com.br"
        );
        Ok(())
    }

    #[test]
    fn file_overrides_defaults() -> anyhow::Result<()> {
        let config = load(
            r#"
            postal_code = "01001-000"
            timeout_millis = 250
            sources = ["via_cep"]
            cancel_losers = false

            [brasil_api]
            base_url = "http://localhost:9000"
            "#,
            &[],
        )?;

        assert_eq!(config.postal_code.as_str(), "01001000");
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.sources, vec![SourceKind::ViaCep]);
        assert!(!config.cancel_losers);
        assert_eq!(
            config.source(SourceKind::BrasilApi).base_url(),
            "http://localhost:9000"
        );
        assert_eq!(
            config.source(SourceKind::ViaCep).base_url(),
            "https://viacep.com.br"
        );
        Ok(())
    }

    #[test]
    fn cli_overrides_file() -> anyhow::Result<()> {
        let config = load(
            "timeout_millis = 250\nsources = [\"via_cep\"]",
            &[
                "20040-020",
                "--timeout",
                "1500",
                "--source",
                "brasil_api",
                "--json",
            ],
        )?;

        assert_eq!(config.postal_code.as_str(), "20040020");
        assert_eq!(config.timeout_millis, 1500);
        assert_eq!(config.sources, vec![SourceKind::BrasilApi]);
        assert_eq!(config.output, OutputFormat::Json);
        Ok(())
    }

    #[test]
    fn duplicate_sources_are_removed() -> anyhow::Result<()> {
        let config = load(
            "",
            &["--source", "via_cep", "--source", "brasil_api", "--source", "ViaCEP"],
        )?;
        assert_eq!(config.sources, vec![SourceKind::ViaCep, SourceKind::BrasilApi]);
        Ok(())
    }

    fn load_env(vars: &[(&str, &str)], args: &[&str]) -> anyhow::Result<AppConfig> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<config::Map<_, _>>();
        AppConfig::load(
            Config::builder().add_source(environment().source(Some(vars))),
            &cli(args),
        )
    }

    #[test]
    fn environment_overrides_defaults() -> anyhow::Result<()> {
        let config = load_env(
            &[
                ("QUICKCEP__POSTAL_CODE", "01001000"),
                ("QUICKCEP__TIMEOUT_MILLIS", "500"),
                ("QUICKCEP__SOURCES", "via_cep, brasil_api"),
                ("QUICKCEP__CANCEL_LOSERS", "false"),
                ("QUICKCEP__VIA_CEP__BASE_URL", "http://localhost:9001"),
            ],
            &[],
        )?;

        assert_eq!(config.postal_code.as_str(), "01001000");
        assert_eq!(config.timeout(), Duration::from_millis(500));
        assert_eq!(config.sources, vec![SourceKind::ViaCep, SourceKind::BrasilApi]);
        assert!(!config.cancel_losers);
        assert_eq!(
            config.source(SourceKind::ViaCep).base_url(),
            "http://localhost:9001"
        );
        Ok(())
    }

    #[test]
    fn environment_single_source() -> anyhow::Result<()> {
        let config = load_env(&[("QUICKCEP__SOURCES", "brasil_api")], &[])?;
        assert_eq!(config.sources, vec![SourceKind::BrasilApi]);
        Ok(())
    }

    #[test]
    fn environment_unknown_source_is_rejected() {
        assert!(load_env(&[("QUICKCEP__SOURCES", "via_cep,correios")], &[]).is_err());
    }

    #[test]
    fn cli_overrides_environment() -> anyhow::Result<()> {
        let config = load_env(
            &[("QUICKCEP__SOURCES", "via_cep"), ("QUICKCEP__TIMEOUT_MILLIS", "500")],
            &["--source", "brasil_api", "--timeout", "750"],
        )?;
        assert_eq!(config.sources, vec![SourceKind::BrasilApi]);
        assert_eq!(config.timeout_millis, 750);
        Ok(())
    }

    #[test]
    fn invalid_postal_code_in_file() {
        assert!(load("postal_code = \"123\"", &[]).is_err());
    }

    #[test]
    fn invalid_cli_arguments() {
        use clap::Parser;
        assert!(CliArgs::try_parse_from(["quickcep", "12-34"]).is_err());
        assert!(CliArgs::try_parse_from(["quickcep", "--source", "correios"]).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(load("", &["--timeout", "0"]).is_err());
    }

    #[test]
    fn empty_sources_are_rejected() {
        assert!(load("sources = []", &[]).is_err());
    }
}
