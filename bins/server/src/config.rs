use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use phonebook_bulk::GeneratorConfig;
use phonebook_hub::HubConfig;
use phonebook_store::StoreConfig;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "phonebook-server", about = "Phone number records with live broadcast")]
pub struct Cli {
    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, global = true, default_value = "info", env = "PHONEBOOK_LOG")]
    pub log: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP + WebSocket service
    Serve(ConfigArgs),
    /// Generate and persist a batch of records, then exit
    Generate(GenerateArgs),
    /// Create the schema, then exit
    Migrate(ConfigArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml", env = "CONFIG_PATH")]
    pub config: String,
}

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// How many records; defaults to `generator.default_count`
    #[arg(long)]
    pub count: Option<usize>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: StoreConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

fn default_port() -> u16 {
    3000
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|detail| ServerError::Config { context: "parse", detail: format!("'{path}': {detail}") })
    }

    fn parse(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.generator.validate().map_err(|e| e.to_string())?;
        config.hub.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phonebook_api::OverflowPolicy;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = ServerConfig::parse("").unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.database.path, "phonebook.db");
        assert_eq!(cfg.generator.default_count, 200);
        assert_eq!(cfg.hub.overflow, OverflowPolicy::Drop);
        assert!(!cfg.hub.exclude_sender);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = ServerConfig::parse(
            r#"
            port = 8080

            [database]
            path = ":memory:"

            [generator]
            default_count = 50
            workers = 4
            seed = 7

            [hub]
            overflow = "disconnect"
            exclude_sender = true
            read_timeout_ms = 30000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.database.is_memory());
        assert_eq!(cfg.generator.default_count, 50);
        assert_eq!(cfg.generator.workers, 4);
        assert_eq!(cfg.generator.seed, Some(7));
        assert_eq!(cfg.generator.max_count, 100_000);
        assert_eq!(cfg.hub.overflow, OverflowPolicy::Disconnect);
        assert!(cfg.hub.exclude_sender);
        assert_eq!(cfg.hub.read_timeout_ms, Some(30000));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for bad in [
            "[generator]\nchunk_size = 0",
            "[generator]\ndefault_count = 500\nmax_count = 100",
            "[hub]\nqueue_capacity = 0",
            "[hub]\noverflow = \"block\"",
            "port = \"eighty\"",
        ] {
            assert!(ServerConfig::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = ServerConfig::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ServerError::Config { context: "read", .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 4000\n[generator]\nprefix = \"555\"\n").unwrap();
        let cfg = ServerConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.generator.prefix, "555");
    }

    #[test]
    fn log_flag_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["phonebook-server", "generate", "--count", "5", "--log", "debug"])
            .unwrap();
        assert_eq!(cli.log, "debug");
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.count, Some(5));
                assert_eq!(args.config.config, "config.toml");
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["phonebook-server", "bogus"]).is_err());
    }
}
