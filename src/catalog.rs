//! Catálogo de tratamientos por categoría y tabla fija de diagnósticos.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use crate::models::TreatmentRecord;

/// Clave de la entrada genérica del catálogo.
pub const GENERAL_CATEGORY: &str = "general";

/// Diagnóstico para cualquier etiqueta fuera del conjunto conocido.
pub const UNMAPPED_DIAGNOSIS: &str = "Condition Requiring Further Assessment";

const DEFAULT_MEDICINE: &str = "Symptomatic treatment recommended";
const DEFAULT_ALTERNATIVE: &str = "Consult specialist for alternatives";
const DEFAULT_LIFESTYLE: &str = "Healthy lifestyle, adequate rest";
const DEFAULT_RED_FLAGS: &str = "Worsening symptoms, no improvement in 3 days";
const DEFAULT_FOLLOW_UP: &str = "Review in 48-72 hours";

/// Conjunto cerrado de categorías que produce el clasificador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Fever,
    Diabetes,
    Cold,
    Headache,
    Hypertension,
    Asthma,
    Gastric,
    Allergy,
    Arthritis,
    MentalHealth,
    General,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Fever,
        Category::Diabetes,
        Category::Cold,
        Category::Headache,
        Category::Hypertension,
        Category::Asthma,
        Category::Gastric,
        Category::Allergy,
        Category::Arthritis,
        Category::MentalHealth,
        Category::General,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == label)
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::Fever => "fever",
            Category::Diabetes => "diabetes",
            Category::Cold => "cold",
            Category::Headache => "headache",
            Category::Hypertension => "hypertension",
            Category::Asthma => "asthma",
            Category::Gastric => "gastric",
            Category::Allergy => "allergy",
            Category::Arthritis => "arthritis",
            Category::MentalHealth => "mental_health",
            Category::General => GENERAL_CATEGORY,
        }
    }

    pub fn diagnosis(self) -> &'static str {
        match self {
            Category::Fever => "Acute Febrile Illness",
            Category::Diabetes => "Type 2 Diabetes Mellitus",
            Category::Cold => "Upper Respiratory Tract Infection (URTI)",
            Category::Headache => "Tension Headache / Migraine",
            Category::Hypertension => "Hypertension",
            Category::Asthma => "Asthma",
            Category::Gastric => "Gastritis",
            Category::Allergy => "Allergic Reaction",
            Category::Arthritis => "Osteoarthritis",
            Category::MentalHealth => "Anxiety/Depression - Requires Specialist",
            Category::General => "General Symptomatic Care",
        }
    }
}

/// Etiqueta de diagnóstico legible para una categoría predicha.
pub fn diagnosis_label(label: &str) -> &'static str {
    Category::from_label(label)
        .map(Category::diagnosis)
        .unwrap_or(UNMAPPED_DIAGNOSIS)
}

/// Registro ya resuelto: todos los campos con texto.
#[derive(Debug, Clone, PartialEq)]
pub struct Treatment {
    pub medicine: String,
    pub alternative: String,
    pub lifestyle: String,
    pub red_flags: String,
    pub follow_up: String,
}

/// Catálogo de sólo lectura, cargado una vez al arrancar.
#[derive(Debug, Clone, Default)]
pub struct TreatmentCatalog {
    records: HashMap<String, TreatmentRecord>,
}

impl TreatmentCatalog {
    pub fn new(records: HashMap<String, TreatmentRecord>) -> Self {
        Self { records }
    }

    /// Carga el catálogo desde el JSON que genera el entrenamiento.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer el catálogo {}", path.display()))?;
        let records: HashMap<String, TreatmentRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Catálogo de tratamientos inválido: {}", path.display()))?;
        info!("Catálogo de tratamientos cargado ({} categorías).", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resuelve el tratamiento de una categoría. Si no existe se usa la
    /// entrada `general`; los campos ausentes o en blanco reciben el texto
    /// por defecto.
    pub fn treatment_for(&self, category: &str) -> Treatment {
        let record = self
            .records
            .get(category)
            .or_else(|| self.records.get(GENERAL_CATEGORY));

        Treatment {
            medicine: resolve(record.and_then(|r| r.medicine.as_deref()), DEFAULT_MEDICINE),
            alternative: resolve(record.and_then(|r| r.alternative.as_deref()), DEFAULT_ALTERNATIVE),
            lifestyle: resolve(record.and_then(|r| r.lifestyle.as_deref()), DEFAULT_LIFESTYLE),
            red_flags: resolve(record.and_then(|r| r.red_flags.as_deref()), DEFAULT_RED_FLAGS),
            follow_up: resolve(record.and_then(|r| r.follow_up.as_deref()), DEFAULT_FOLLOW_UP),
        }
    }
}

fn resolve(value: Option<&str>, default: &str) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}
