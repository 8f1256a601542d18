use dotenv_config::EnvConfig;
use dotenvy::dotenv;

use crate::errors::ServeError;

/// Upper bound on `MAX_WORKERS`, well below the semaphore's permit limit.
pub const MAX_WORKERS_LIMIT: usize = 4096;

#[derive(Debug, EnvConfig, Clone)]
pub struct Config {
    #[env_config(name = "MODEL_PATH", default = "/app/models/model.json")]
    pub model_path: String,

    #[env_config(name = "MODEL_VERSION", default = "v1.0.0")]
    pub model_version: String,

    #[env_config(name = "HOST", default = "0.0.0.0")]
    pub serve_host: String,

    #[env_config(name = "PORT", default = 50051)]
    pub serve_port: u16,

    #[env_config(name = "MAX_WORKERS", default = 10)]
    pub max_workers: usize,

    #[env_config(name = "TIMEZONE", default = "UTC")]
    pub timezone: String,

    #[env_config(name = "LOG_FORMAT", default = "text")]
    pub log_format: String,

    #[env_config(name = "LOG_LEVEL", default = "INFO")]
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self, ServeError> {
        if let Ok(path) = dotenv() {
            println!("config loaded from env file: {:?}", path);
        } else {
            println!("config loaded from env");
        }
        let config = Config::init().map_err(|e| ServeError::Config {
            msg: format!("{:?}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServeError> {
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS_LIMIT {
            return Err(ServeError::Config {
                msg: format!(
                    "MAX_WORKERS must be between 1 and {}, got {}",
                    MAX_WORKERS_LIMIT, self.max_workers
                ),
            });
        }
        if self.model_version.trim().is_empty() {
            return Err(ServeError::Config {
                msg: "MODEL_VERSION must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.serve_host, self.serve_port)
    }
}
