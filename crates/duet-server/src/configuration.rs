use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use duet::pipeline::PipelineConfig;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("DUET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("pipeline.ignore_patterns"),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `name`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet::pipeline::PipelineKind;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("DUET_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.pipeline, PipelineConfig::default());
    }

    #[test]
    #[serial]
    fn test_pipeline_settings() {
        clean_env();
        env::set_var("DUET_PIPELINE__KIND", "chain");
        env::set_var("DUET_PIPELINE__ENHANCER_TEMPERATURE", "0.5");
        env::set_var("DUET_PIPELINE__MAX_TOKENS", "4096");
        env::set_var("DUET_PIPELINE__CONTEXT_MAX_CHARS", "50000");
        env::set_var("DUET_PIPELINE__CONTEXT_OPTIMIZATION", "true");
        env::set_var("DUET_PIPELINE__IGNORE_PATTERNS", "node_modules/**,**/*.lock");

        let settings = Settings::new().unwrap();
        let pipeline = settings.pipeline;
        assert_eq!(pipeline.kind, PipelineKind::Chain);
        assert_eq!(pipeline.enhancer_temperature, 0.5);
        assert_eq!(pipeline.generator_temperature, 0.2);
        assert_eq!(pipeline.max_tokens, Some(4096));
        assert_eq!(pipeline.context_max_chars, 50_000);
        assert!(pipeline.context_optimization);
        assert_eq!(
            pipeline.ignore_patterns,
            Some(vec!["node_modules/**".to_string(), "**/*.lock".to_string()])
        );

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("DUET_SERVER__HOST", "0.0.0.0");
        env::set_var("DUET_SERVER__PORT", "8080");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(
            settings.server.socket_addr().unwrap().to_string(),
            "0.0.0.0:8080"
        );

        clean_env();
    }

    #[test]
    #[serial]
    fn test_invalid_kind_is_rejected() {
        clean_env();
        env::set_var("DUET_PIPELINE__KIND", "parallel");

        assert!(matches!(Settings::new(), Err(ConfigError::Other(_))));

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}
