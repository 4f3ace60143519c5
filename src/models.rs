//! Modelos de dominio: consulta de síntomas, recomendación y registros de
//! tratamiento.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Edad usada cuando la consulta no trae un entero no negativo válido.
pub const DEFAULT_AGE: f64 = 30.0;

/// Edad tal y como llega del formulario: entero o texto libre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Age {
    Years(u64),
    Text(String),
    /// Cualquier otro valor JSON (negativos, decimales, booleanos, null...).
    Other(serde_json::Value),
}

impl Default for Age {
    fn default() -> Self {
        Age::Text(String::new())
    }
}

impl From<i32> for Age {
    fn from(years: i32) -> Self {
        u64::try_from(years)
            .map(Age::Years)
            .unwrap_or_else(|_| Age::Other(years.into()))
    }
}

impl From<&str> for Age {
    fn from(text: &str) -> Self {
        Age::Text(text.to_string())
    }
}

impl From<String> for Age {
    fn from(text: String) -> Self {
        Age::Text(text)
    }
}

impl Age {
    /// Sólo un literal entero no negativo cuenta como edad, sin límite de
    /// magnitud; el resto cae en [`DEFAULT_AGE`].
    pub fn years(&self) -> f64 {
        match self {
            Age::Years(n) => *n as f64,
            Age::Text(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().unwrap_or(DEFAULT_AGE)
            }
            _ => DEFAULT_AGE,
        }
    }
}

/// Entrada del motor. Inmutable una vez construida.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SymptomQuery {
    #[serde(alias = "text")]
    pub symptoms: String,
    #[serde(default)]
    pub age: Age,
    #[serde(default)]
    pub gender: String,
    #[serde(default, alias = "genetic_history")]
    pub family_history: Option<String>,
}

impl SymptomQuery {
    pub fn new(symptoms: impl Into<String>, age: impl Into<Age>, gender: impl Into<String>) -> Self {
        Self {
            symptoms: symptoms.into(),
            age: age.into(),
            gender: gender.into(),
            family_history: None,
        }
    }

    pub fn with_family_history(mut self, history: impl Into<String>) -> Self {
        self.family_history = Some(history.into());
        self
    }

    /// Codificación del género para el clasificador: "male"/"m" → 0, resto → 1.
    pub fn gender_code(&self) -> f64 {
        match self.gender.to_lowercase().as_str() {
            "male" | "m" => 0.0,
            _ => 1.0,
        }
    }
}

/// Recomendación de tratamiento devuelta por el motor.
///
/// Todos los campos de texto están siempre rellenos, sea cual sea la ruta
/// (clasificador o cascada de reglas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub diagnosis: String,
    pub medicine: String,
    pub alternative: String,
    pub lifestyle: String,
    pub red_flags: String,
    pub follow_up: String,
    pub notes: String,
    pub predicted_category: Option<String>,
    pub confidence: Option<f64>,
}

/// Entrada del catálogo de tratamientos, con las claves que escribe el
/// proceso de entrenamiento (`"Medicine"`, `"Red Flags"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    #[serde(rename = "Medicine", default)]
    pub medicine: Option<String>,
    #[serde(rename = "Alternative", default)]
    pub alternative: Option<String>,
    #[serde(rename = "Lifestyle", default)]
    pub lifestyle: Option<String>,
    #[serde(rename = "Red Flags", default)]
    pub red_flags: Option<String>,
    #[serde(rename = "Follow-Up", default)]
    pub follow_up: Option<String>,
}
