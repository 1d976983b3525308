use scaffold_core::prompts;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported OpenAI-compatible backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Model for the graph, scheduling and translation generators.
    pub generation_model: String,
    /// Model for the graph and plan critics.
    pub critic_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub default_language: String,
    pub graph_max_attempts: u32,
    pub plan_max_attempts: u32,
    /// Default local retry budget for malformed or rejected model output.
    pub output_retries: u32,
    /// Per-stage budgets from `OUTPUT_RETRIES_<STAGE>`, keyed by stage name.
    pub stage_output_retries: HashMap<String, u32>,
    pub llm_timeout: Duration,
}

/// Reads `name`, falling back to `default` when unset, and parses it.
fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{}': {}", raw, e)))
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:3000")?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "gemini" => Provider::Gemini,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of openai, gemini", other),
                ));
            }
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let generation_model =
            std::env::var("GENERATION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let critic_model =
            std::env::var("CRITIC_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let default_language =
            std::env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "English".to_string());

        let graph_max_attempts = parse_var::<u32>("GRAPH_MAX_ATTEMPTS", "2")?;
        let plan_max_attempts = parse_var::<u32>("PLAN_MAX_ATTEMPTS", "2")?;
        let output_retries = parse_var::<u32>("OUTPUT_RETRIES", "1")?;
        let mut stage_output_retries = HashMap::new();
        for stage in [
            prompts::KNOWLEDGE_GRAPH,
            prompts::GRAPH_CRITIC,
            prompts::SCHEDULER,
            prompts::PLAN_CRITIC,
            prompts::TRANSLATOR,
        ] {
            let var = format!("OUTPUT_RETRIES_{}", stage.to_uppercase());
            if std::env::var(&var).is_ok() {
                stage_output_retries.insert(stage.to_string(), parse_var::<u32>(&var, "")?);
            }
        }
        let llm_timeout = Duration::from_secs(parse_var::<u64>("LLM_TIMEOUT_SECS", "120")?);

        for (var, value) in [
            ("GRAPH_MAX_ATTEMPTS", graph_max_attempts),
            ("PLAN_MAX_ATTEMPTS", plan_max_attempts),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(
                    var.to_string(),
                    "at least one attempt is required".to_string(),
                ));
            }
        }

        match provider {
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            gemini_api_key,
            generation_model,
            critic_model,
            log_level,
            prompts_path,
            cors_origins,
            default_language,
            graph_max_attempts,
            plan_max_attempts,
            output_retries,
            stage_output_retries,
            llm_timeout,
        })
    }

    /// The local retry budget for one stage, falling back to `OUTPUT_RETRIES`.
    pub fn output_retries_for(&self, stage: &str) -> u32 {
        self.stage_output_retries
            .get(stage)
            .copied()
            .unwrap_or(self.output_retries)
    }

    /// The API key for the configured provider.
    pub fn api_key(&self) -> Option<&str> {
        match self.provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Gemini => self.gemini_api_key.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            for var in [
                "BIND_ADDRESS",
                "LLM_PROVIDER",
                "OPENAI_API_KEY",
                "GEMINI_API_KEY",
                "GENERATION_MODEL",
                "CRITIC_MODEL",
                "RUST_LOG",
                "PROMPTS_PATH",
                "CORS_ORIGINS",
                "DEFAULT_LANGUAGE",
                "GRAPH_MAX_ATTEMPTS",
                "PLAN_MAX_ATTEMPTS",
                "OUTPUT_RETRIES",
                "OUTPUT_RETRIES_KNOWLEDGE_GRAPH",
                "OUTPUT_RETRIES_GRAPH_CRITIC",
                "OUTPUT_RETRIES_SCHEDULER",
                "OUTPUT_RETRIES_PLAN_CRITIC",
                "OUTPUT_RETRIES_TRANSLATOR",
                "LLM_TIMEOUT_SECS",
            ] {
                env::remove_var(var);
            }
        }
    }

    fn set_minimal_env_openai() {
        unsafe {
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal_openai() {
        clear_env_vars();
        set_minimal_env_openai();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.api_key(), Some("test-openai-key"));
        assert_eq!(config.gemini_api_key, None);
        assert_eq!(config.generation_model, "gpt-4o");
        assert_eq!(config.critic_model, "gpt-4o-mini");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.prompts_path, PathBuf::from("./prompts"));
        assert_eq!(config.cors_origins, vec!["http://localhost:5173".to_string()]);
        assert_eq!(config.default_language, "English");
        assert_eq!(config.graph_max_attempts, 2);
        assert_eq!(config.plan_max_attempts, 2);
        assert_eq!(config.output_retries, 1);
        assert!(config.stage_output_retries.is_empty());
        assert_eq!(config.llm_timeout, Duration::from_secs(120));
    }

    #[test]
    #[serial]
    fn test_config_from_env_gemini_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "Gemini");
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.api_key(), Some("test-gemini-key"));
        assert!(config.provider.api_base().contains("generativelanguage"));
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("GENERATION_MODEL", "gpt-4.1");
            env::set_var("CRITIC_MODEL", "gpt-4.1-mini");
            env::set_var("RUST_LOG", "debug");
            env::set_var("PROMPTS_PATH", "/custom/prompts");
            env::set_var("CORS_ORIGINS", "https://a.example, https://b.example,");
            env::set_var("DEFAULT_LANGUAGE", "German");
            env::set_var("GRAPH_MAX_ATTEMPTS", "3");
            env::set_var("PLAN_MAX_ATTEMPTS", "4");
            env::set_var("OUTPUT_RETRIES", "0");
            env::set_var("LLM_TIMEOUT_SECS", "30");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.generation_model, "gpt-4.1");
        assert_eq!(config.critic_model, "gpt-4.1-mini");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.prompts_path, PathBuf::from("/custom/prompts"));
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.default_language, "German");
        assert_eq!(config.graph_max_attempts, 3);
        assert_eq!(config.plan_max_attempts, 4);
        assert_eq!(config.output_retries, 0);
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_config_per_stage_output_retries() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("OUTPUT_RETRIES", "1");
            env::set_var("OUTPUT_RETRIES_SCHEDULER", "3");
            env::set_var("OUTPUT_RETRIES_TRANSLATOR", "0");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.output_retries_for(prompts::SCHEDULER), 3);
        assert_eq!(config.output_retries_for(prompts::TRANSLATOR), 0);
        assert_eq!(config.output_retries_for(prompts::KNOWLEDGE_GRAPH), 1);
        assert_eq!(config.output_retries_for(prompts::PLAN_CRITIC), 1);
    }

    #[test]
    #[serial]
    fn test_config_invalid_stage_output_retries() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("OUTPUT_RETRIES_GRAPH_CRITIC", "many");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "OUTPUT_RETRIES_GRAPH_CRITIC"),
            _ => panic!("Expected InvalidValue for OUTPUT_RETRIES_GRAPH_CRITIC"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_unknown_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "carrier-pigeon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "LLM_PROVIDER"),
            _ => panic!("Expected InvalidValue for LLM_PROVIDER"),
        }
    }

    #[test]
    #[serial]
    fn test_config_zero_attempts_rejected() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("PLAN_MAX_ATTEMPTS", "0");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "PLAN_MAX_ATTEMPTS"),
            _ => panic!("Expected InvalidValue for PLAN_MAX_ATTEMPTS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_non_numeric_timeout() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("LLM_TIMEOUT_SECS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, msg) => {
                assert_eq!(var, "LLM_TIMEOUT_SECS");
                assert!(msg.contains("soon"));
            }
            _ => panic!("Expected InvalidValue for LLM_TIMEOUT_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_openai_key() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "openai");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => {
                assert!(msg.contains("OPENAI_API_KEY"));
            }
            _ => panic!("Expected MissingVar for OPENAI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_gemini_key() {
        clear_env_vars();
        unsafe {
            env::set_var("LLM_PROVIDER", "gemini");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => {
                assert!(msg.contains("GEMINI_API_KEY"));
            }
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }
}
