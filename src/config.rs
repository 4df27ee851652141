use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RosterConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub db_path: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Session token lifetime, default 7 days.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Hex-encoded HMAC signing secret. Generated on first start;
    /// rotating it invalidates every outstanding session.
    #[serde(default = "generate_secret_hex")]
    pub secret_hex: String,
}

fn default_token_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn generate_secret_hex() -> String {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    hex::encode(secret)
}

impl AuthConfig {
    pub fn secret_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.secret_hex)
    }

    pub fn token_ttl_ms(&self) -> u64 {
        self.token_ttl_secs * 1000
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8081,
                db_path: "./data/roster".to_string(),
                log_level: "info".to_string(),
            },
            auth: AuthConfig {
                token_ttl_secs: default_token_ttl_secs(),
                secret_hex: generate_secret_hex(),
            },
        }
    }
}

impl RosterConfig {
    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => {
                        println!("Config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        eprintln!("Error parsing config: {}. Using Defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    eprintln!("Error reading config: {}. Using Defaults.", e);
                    Self::default()
                }
            }
        } else {
            println!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            if let Ok(s) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(path, s);
            }
            config
        }
    }
}
