//! Carga y gestión de configuración de la aplicación (servidor + artefactos del modelo).

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineMode {
    /// Carga los artefactos y usa el clasificador si están todos.
    #[default]
    Auto,
    /// No intenta cargar nada: sólo la cascada de reglas.
    Rules,
}

impl EngineMode {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" | "ml" => Ok(Self::Auto),
            "rules" => Ok(Self::Rules),
            other => Err(anyhow!("Modo de motor no soportado: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,

    pub model_dir: PathBuf,
    pub classifier_file: String,
    pub vectorizer_file: String,
    pub treatment_db_file: String,
    pub engine_mode: EngineMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3322".to_string(),
            model_dir: PathBuf::from("."),
            classifier_file: "ml_model.json".to_string(),
            vectorizer_file: "vectorizer.json".to_string(),
            treatment_db_file: "treatment_db.json".to_string(),
            engine_mode: EngineMode::Auto,
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que [`AppConfig::from_env`] pero con una fuente de variables
    /// arbitraria.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let server_addr = lookup("SERVER_ADDR").unwrap_or(defaults.server_addr);
        let model_dir = lookup("MODEL_DIR").map(PathBuf::from).unwrap_or(defaults.model_dir);
        let classifier_file = lookup("CLASSIFIER_FILE").unwrap_or(defaults.classifier_file);
        let vectorizer_file = lookup("VECTORIZER_FILE").unwrap_or(defaults.vectorizer_file);
        let treatment_db_file = lookup("TREATMENT_DB_FILE").unwrap_or(defaults.treatment_db_file);

        let engine_mode = match lookup("ENGINE_MODE") {
            Some(mode) => EngineMode::from_str(&mode)?,
            None => defaults.engine_mode,
        };

        Ok(Self {
            server_addr,
            model_dir,
            classifier_file,
            vectorizer_file,
            treatment_db_file,
            engine_mode,
        })
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.model_dir.join(&self.classifier_file)
    }

    pub fn vectorizer_path(&self) -> PathBuf {
        self.model_dir.join(&self.vectorizer_file)
    }

    pub fn treatment_db_path(&self) -> PathBuf {
        self.model_dir.join(&self.treatment_db_file)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.server_addr, "127.0.0.1:3322");
        assert_eq!(cfg.engine_mode, EngineMode::Auto);
        assert_eq!(cfg.classifier_path(), PathBuf::from("./ml_model.json"));
        assert_eq!(cfg.treatment_db_path(), PathBuf::from("./treatment_db.json"));
    }

    #[test]
    fn overrides_from_environment() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("MODEL_DIR", "/srv/models"),
            ("VECTORIZER_FILE", "tfidf.json"),
            ("ENGINE_MODE", "RULES"),
        ]))
        .unwrap();
        assert_eq!(cfg.vectorizer_path(), PathBuf::from("/srv/models/tfidf.json"));
        assert_eq!(cfg.engine_mode, EngineMode::Rules);
    }

    #[test]
    fn unknown_engine_mode_is_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("ENGINE_MODE", "neural")])).is_err());
    }
}
