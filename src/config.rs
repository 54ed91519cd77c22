use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Access tokens
    pub secret_key: Secret<String>,
    pub algorithm: String,
    pub token_expire_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8000)?
            .set_default("algorithm", "HS256")?
            .set_default("token_expire_minutes", 30)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            host: config.get("host")?,
            port: config.get("port")?,

            secret_key: Secret::new(config.get("secret_key")?),
            algorithm: config.get("algorithm")?,
            token_expire_minutes: config.get("token_expire_minutes")?,
        })
    }
}
