//! Configuração do manut carregada a partir de `manut.toml`.
//!
//! A struct [`ManutConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `MANUT_DATABASE` tem precedência sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::allocator::RetryConfig;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "manut.toml";

/// Variável de ambiente que sobrescreve `database_path`.
pub const DATABASE_ENV: &str = "MANUT_DATABASE";

/// Configuração de nível superior carregada de `manut.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ManutConfig {
    /// Caminho do arquivo SQLite.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Máximo de retentativas ao disputar um número de ordem.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Atraso base em milissegundos para backoff exponencial.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// TTLs do cache por classe de recurso.
    #[serde(default)]
    pub cache: CacheTtls,
}

/// TTLs em segundos. Cadastros mudam pouco e ficam mais tempo em cache.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheTtls {
    #[serde(default = "default_tickets_ttl")]
    pub tickets_ttl_secs: u64,

    #[serde(default = "default_employees_ttl")]
    pub employees_ttl_secs: u64,

    #[serde(default = "default_companies_ttl")]
    pub companies_ttl_secs: u64,

    #[serde(default = "default_branches_ttl")]
    pub branches_ttl_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("manut.db")
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    5
}

// 2 minutos.
fn default_tickets_ttl() -> u64 {
    120
}

// 5 minutos.
fn default_employees_ttl() -> u64 {
    300
}

// 10 minutos.
fn default_companies_ttl() -> u64 {
    600
}

// 10 minutos.
fn default_branches_ttl() -> u64 {
    600
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            tickets_ttl_secs: default_tickets_ttl(),
            employees_ttl_secs: default_employees_ttl(),
            companies_ttl_secs: default_companies_ttl(),
            branches_ttl_secs: default_branches_ttl(),
        }
    }
}

impl CacheTtls {
    pub fn tickets(&self) -> Duration {
        Duration::from_secs(self.tickets_ttl_secs)
    }

    pub fn employees(&self) -> Duration {
        Duration::from_secs(self.employees_ttl_secs)
    }

    pub fn companies(&self) -> Duration {
        Duration::from_secs(self.companies_ttl_secs)
    }

    pub fn branches(&self) -> Duration {
        Duration::from_secs(self.branches_ttl_secs)
    }
}

impl Default for ManutConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            cache: CacheTtls::default(),
        }
    }
}

impl ManutConfig {
    /// Carrega a configuração de `manut.toml` no diretório atual.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de `path`, usando valores padrão se o arquivo não existir.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::parse(&contents).with_context(|| format!("invalid {}", path.display()))?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo.
        if let Ok(db) = std::env::var(DATABASE_ENV)
            && !db.is_empty()
        {
            config.database_path = PathBuf::from(db);
        }

        Ok(config)
    }

    /// Interpreta e valida o conteúdo TOML.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: ManutConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// TTL precisa ser positivo e deve haver ao menos uma retentativa.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries < 1 {
            bail!("max_retries must be at least 1");
        }
        let ttls = [
            ("tickets_ttl_secs", self.cache.tickets_ttl_secs),
            ("employees_ttl_secs", self.cache.employees_ttl_secs),
            ("companies_ttl_secs", self.cache.companies_ttl_secs),
            ("branches_ttl_secs", self.cache.branches_ttl_secs),
        ];
        for (name, secs) in ttls {
            if secs == 0 {
                bail!("cache.{name} must be greater than zero");
            }
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ManutConfig::default();
        assert_eq!(config.database_path, PathBuf::from("manut.db"));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.cache.tickets(), Duration::from_secs(120));
        assert_eq!(config.cache.employees(), Duration::from_secs(300));
        assert_eq!(config.cache.companies(), Duration::from_secs(600));
        assert_eq!(config.cache.branches(), Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_partial_toml() {
        let config = ManutConfig::parse(
            r#"
            max_retries = 5

            [cache]
            tickets_ttl_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 5);
        assert_eq!(config.cache.tickets_ttl_secs, 30);
        assert_eq!(config.cache.branches_ttl_secs, 600);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = ManutConfig::parse("[cache]\nemployees_ttl_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("employees_ttl_secs"));
    }

    #[test]
    fn zero_retries_is_rejected() {
        assert!(ManutConfig::parse("max_retries = 0").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manut.toml");
        std::fs::write(&path, "base_delay_ms = 0\n").unwrap();
        let config = ManutConfig::load_from(&path).unwrap();
        assert_eq!(config.base_delay_ms, 0);
        assert_eq!(config.retry_config().max_retries, 3);
    }

    #[test]
    fn database_env_overrides_file_unless_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manut.toml");
        std::fs::write(&path, "database_path = \"from-file.db\"\n").unwrap();

        // SAFETY: only std touches the environment in these tests, and it
        // serializes its own access.
        unsafe { std::env::set_var(DATABASE_ENV, "") };
        let config = ManutConfig::load_from(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("from-file.db"));

        unsafe { std::env::set_var(DATABASE_ENV, "/tmp/from-env.db") };
        let config = ManutConfig::load_from(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/from-env.db"));

        unsafe { std::env::remove_var(DATABASE_ENV) };
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ManutConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.max_retries, 3);
    }
}
