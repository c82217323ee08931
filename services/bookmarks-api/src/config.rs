//! サーバー設定
//!
//! 環境変数から起動に必要な値を読み込む。
//! - API_TOKEN: APIトークン（必須）
//! - DB_PATH: データベースファイルのパス（デフォルト: bookmarks.db）
//! - LISTEN_ADDR: リッスンアドレス（デフォルト: 127.0.0.1:8000）

use std::net::SocketAddr;

use thiserror::Error;

/// APIトークン環境変数名
pub const API_TOKEN_ENV: &str = "API_TOKEN";

/// データベースパス環境変数名
pub const DB_PATH_ENV: &str = "DB_PATH";

/// リッスンアドレス環境変数名
pub const LISTEN_ADDR_ENV: &str = "LISTEN_ADDR";

/// デフォルトのデータベースパス
pub const DEFAULT_DB_PATH: &str = "bookmarks.db";

/// デフォルトのリッスンアドレス
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";

/// 設定読み込みのエラー型
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// サーバー設定
#[derive(Debug, Clone)]
pub struct Config {
    api_token: String,
    db_path: String,
    listen_addr: SocketAddr,
}

impl Config {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列の値は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_token =
            get(API_TOKEN_ENV).ok_or_else(|| ConfigError::MissingEnvVar(API_TOKEN_ENV.to_string()))?;

        let db_path = get(DB_PATH_ENV).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let listen_addr_raw =
            get(LISTEN_ADDR_ENV).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: LISTEN_ADDR_ENV.to_string(),
                value: listen_addr_raw.clone(),
            })?;

        Ok(Self {
            api_token,
            db_path,
            listen_addr,
        })
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    // テストで環境変数を安全に設定/削除するヘルパー
    // 安全性: #[serial]を付けたテストからのみ呼び出す
    unsafe fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    #[test]
    fn test_missing_env_var_error_display() {
        let error = ConfigError::MissingEnvVar("API_TOKEN".to_string());
        assert_eq!(error.to_string(), "Missing environment variable: API_TOKEN");
    }

    /// 必須のAPI_TOKENのみ指定した場合にデフォルト値が使われることを確認
    #[test]
    fn test_from_lookup_applies_defaults() {
        let config = Config::from_lookup(lookup_from(&[(API_TOKEN_ENV, "secret")])).unwrap();

        assert_eq!(config.api_token(), "secret");
        assert_eq!(config.db_path(), DEFAULT_DB_PATH);
        assert_eq!(config.listen_addr(), "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_from_lookup_reads_all_values() {
        let config = Config::from_lookup(lookup_from(&[
            (API_TOKEN_ENV, "secret"),
            (DB_PATH_ENV, "/tmp/bookmarks.db"),
            (LISTEN_ADDR_ENV, "0.0.0.0:9090"),
        ]))
        .unwrap();

        assert_eq!(config.db_path(), "/tmp/bookmarks.db");
        assert_eq!(config.listen_addr(), "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_from_lookup_missing_token_fails() {
        let result = Config::from_lookup(lookup_from(&[(DB_PATH_ENV, "x.db")]));

        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == API_TOKEN_ENV));
    }

    /// 空のAPI_TOKENは未設定として扱われることを確認
    #[test]
    fn test_from_lookup_blank_token_fails() {
        let result = Config::from_lookup(lookup_from(&[(API_TOKEN_ENV, "  ")]));

        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_from_lookup_invalid_listen_addr_fails() {
        let result = Config::from_lookup(lookup_from(&[
            (API_TOKEN_ENV, "secret"),
            (LISTEN_ADDR_ENV, "localhost"),
        ]));

        match result {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, LISTEN_ADDR_ENV);
                assert_eq!(value, "localhost");
            }
            other => panic!("InvalidValueを期待したが {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        unsafe {
            set_env(API_TOKEN_ENV, "env-token");
            set_env(DB_PATH_ENV, "/var/tmp/env.db");
            remove_env(LISTEN_ADDR_ENV);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.api_token(), "env-token");
        assert_eq!(config.db_path(), "/var/tmp/env.db");
        assert_eq!(config.listen_addr(), DEFAULT_LISTEN_ADDR.parse::<SocketAddr>().unwrap());

        unsafe {
            remove_env(API_TOKEN_ENV);
            remove_env(DB_PATH_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_without_token_fails() {
        unsafe {
            remove_env(API_TOKEN_ENV);
        }

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }
}
