//! Motor de recomendaciones.
//!
//! Flujo:
//!   1. Al arrancar se intenta cargar vectorizador, clasificador y catálogo.
//!      Si los tres cargan, el motor queda en modo ML; si no, en modo reglas
//!      para toda la vida del proceso.
//!   2. En modo ML cada consulta se vectoriza y se clasifica; cualquier error
//!      en esa llamada se resuelve con la cascada de reglas sólo para ella.
//!   3. `recommend` nunca falla: siempre devuelve una recomendación completa.

use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    catalog::{diagnosis_label, TreatmentCatalog},
    classifier::{CategoryClassifier, RandomForest, TextVectorizer, TfidfVectorizer},
    config::{AppConfig, EngineMode},
    models::{Recommendation, SymptomQuery},
    rules::RuleCascade,
};

/// Capacidad común a las dos rutas de recomendación.
pub trait Recommender: Send + Sync {
    fn name(&self) -> &'static str;
    fn recommend(&self, query: &SymptomQuery) -> Result<Recommendation>;
}

/// Modo fijado al inicializar el motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Ml,
    Rules,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Ml => write!(f, "ml"),
            Mode::Rules => write!(f, "rules"),
        }
    }
}

/// Recomendador basado en el clasificador entrenado.
pub struct MlRecommender {
    vectorizer: Box<dyn TextVectorizer>,
    classifier: Box<dyn CategoryClassifier>,
    catalog: TreatmentCatalog,
}

impl MlRecommender {
    pub fn new(
        vectorizer: Box<dyn TextVectorizer>,
        classifier: Box<dyn CategoryClassifier>,
        catalog: TreatmentCatalog,
    ) -> Self {
        Self {
            vectorizer,
            classifier,
            catalog,
        }
    }

    /// Carga los tres artefactos. Falla si cualquiera de ellos falla.
    pub fn load(vectorizer: &Path, classifier: &Path, catalog: &Path) -> Result<Self> {
        let vectorizer = TfidfVectorizer::load(vectorizer)?;
        let classifier = RandomForest::load(classifier)?;
        let catalog = TreatmentCatalog::load(catalog)?;
        Ok(Self::new(Box::new(vectorizer), Box::new(classifier), catalog))
    }

    /// `[características de texto..., edad, género]`.
    fn features(&self, query: &SymptomQuery) -> Result<Vec<f64>> {
        let mut features = self.vectorizer.transform(&query.symptoms.to_lowercase())?;
        if features.len() != self.vectorizer.n_features() {
            bail!(
                "El vectorizador produjo {} columnas y declara {}",
                features.len(),
                self.vectorizer.n_features()
            );
        }
        features.push(query.age.years());
        features.push(query.gender_code());
        Ok(features)
    }
}

impl Recommender for MlRecommender {
    fn name(&self) -> &'static str {
        "ml"
    }

    fn recommend(&self, query: &SymptomQuery) -> Result<Recommendation> {
        let features = self.features(query)?;
        let prediction = self.classifier.predict(&features)?;
        let treatment = self.catalog.treatment_for(&prediction.label);

        Ok(Recommendation {
            diagnosis: diagnosis_label(&prediction.label).to_string(),
            medicine: treatment.medicine,
            alternative: treatment.alternative,
            lifestyle: treatment.lifestyle,
            red_flags: treatment.red_flags,
            follow_up: treatment.follow_up,
            notes: format!(
                "ML Model Prediction: {} (Confidence: {:.1}%). This is an AI-assisted recommendation.",
                prediction.label,
                prediction.confidence * 100.0
            ),
            predicted_category: Some(prediction.label),
            confidence: Some(prediction.confidence),
        })
    }
}

/// Motor con un recomendador principal opcional y la cascada como respaldo.
///
/// Es inmutable tras la construcción; se comparte entre peticiones con `Arc`.
pub struct RecommendationEngine {
    primary: Option<Box<dyn Recommender>>,
    fallback: RuleCascade,
}

impl RecommendationEngine {
    pub fn rules_only() -> Self {
        Self {
            primary: None,
            fallback: RuleCascade,
        }
    }

    pub fn with_primary(primary: Box<dyn Recommender>) -> Self {
        Self {
            primary: Some(primary),
            fallback: RuleCascade,
        }
    }

    /// Inicializa el motor según la configuración. Si los artefactos no
    /// cargan se avisa y se queda en modo reglas; nunca es un error fatal.
    pub fn from_config(cfg: &AppConfig) -> Self {
        if cfg.engine_mode == EngineMode::Rules {
            info!("Modo reglas forzado por configuración; no se cargan artefactos.");
            return Self::rules_only();
        }

        match MlRecommender::load(&cfg.vectorizer_path(), &cfg.classifier_path(), &cfg.treatment_db_path()) {
            Ok(ml) => {
                info!("Modelo ML cargado desde {}.", cfg.model_dir.display());
                Self::with_primary(Box::new(ml))
            }
            Err(e) => {
                warn!("Modelo ML no disponible ({e:#}). Se usará el sistema de reglas.");
                Self::rules_only()
            }
        }
    }

    pub fn mode(&self) -> Mode {
        if self.primary.is_some() {
            Mode::Ml
        } else {
            Mode::Rules
        }
    }

    pub fn recommend(&self, query: &SymptomQuery) -> Recommendation {
        if let Some(primary) = &self.primary {
            match primary.recommend(query) {
                Ok(rec) => return rec,
                Err(e) => warn!(
                    "Error en la predicción '{}': {e:#}. Se aplica la cascada de reglas.",
                    primary.name()
                ),
            }
        }
        self.fallback.evaluate(query)
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::rules_only()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::anyhow;

    use super::*;
    use crate::catalog::{GENERAL_CATEGORY, UNMAPPED_DIAGNOSIS};
    use crate::models::{TreatmentRecord, DEFAULT_AGE};
    use crate::rules::RULE_NOTES;

    /// Vectorizador de prueba: una columna que vale 1.0 si aparece "fever".
    struct KeywordVectorizer;

    impl TextVectorizer for KeywordVectorizer {
        fn n_features(&self) -> usize {
            1
        }

        fn transform(&self, text: &str) -> Result<Vec<f64>> {
            Ok(vec![if text.contains("fever") { 1.0 } else { 0.0 }])
        }
    }

    /// Clasificador que devuelve siempre la misma distribución.
    struct FixedClassifier {
        classes: Vec<String>,
        probabilities: Vec<f64>,
    }

    impl FixedClassifier {
        fn new(classes: &[&str], probabilities: &[f64]) -> Self {
            Self {
                classes: classes.iter().map(|c| c.to_string()).collect(),
                probabilities: probabilities.to_vec(),
            }
        }
    }

    impl CategoryClassifier for FixedClassifier {
        fn classes(&self) -> &[String] {
            &self.classes
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>> {
            Ok(self.probabilities.clone())
        }
    }

    struct BrokenClassifier(Vec<String>);

    impl CategoryClassifier for BrokenClassifier {
        fn classes(&self) -> &[String] {
            &self.0
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>> {
            Err(anyhow!("modelo corrupto"))
        }
    }

    fn catalog() -> TreatmentCatalog {
        let record = |medicine: &str| TreatmentRecord {
            medicine: Some(medicine.to_string()),
            alternative: Some("- Rest".to_string()),
            lifestyle: Some("Hydration".to_string()),
            red_flags: Some("Persistent fever".to_string()),
            follow_up: Some("48 hours".to_string()),
        };
        TreatmentCatalog::new(HashMap::from([
            ("fever".to_string(), record("- Paracetamol 500 mg")),
            (GENERAL_CATEGORY.to_string(), record("- Symptomatic")),
        ]))
    }

    fn ml_engine(classifier: impl CategoryClassifier + 'static) -> RecommendationEngine {
        RecommendationEngine::with_primary(Box::new(MlRecommender::new(
            Box::new(KeywordVectorizer),
            Box::new(classifier),
            catalog(),
        )))
    }

    #[test]
    fn ml_mode_fills_from_catalog_and_labels() {
        let engine = ml_engine(FixedClassifier::new(&["cold", "fever"], &[0.1234, 0.8766]));
        assert_eq!(engine.mode(), Mode::Ml);

        let rec = engine.recommend(&SymptomQuery::new("High FEVER and body ache", 30, "male"));
        assert_eq!(rec.diagnosis, "Acute Febrile Illness");
        assert_eq!(rec.medicine, "- Paracetamol 500 mg");
        assert_eq!(rec.predicted_category.as_deref(), Some("fever"));
        assert_eq!(rec.confidence, Some(0.8766));
        assert_eq!(
            rec.notes,
            "ML Model Prediction: fever (Confidence: 87.7%). This is an AI-assisted recommendation."
        );
    }

    #[test]
    fn ml_features_append_age_and_gender() {
        let classifier = FixedClassifier::new(&["fever"], &[1.0]);
        let recommender = MlRecommender::new(Box::new(KeywordVectorizer), Box::new(classifier), catalog());

        let features = recommender.features(&SymptomQuery::new("FEVER", "45", "Female")).unwrap();
        assert_eq!(features, vec![1.0, 45.0, 1.0]);

        let features = recommender.features(&SymptomQuery::new("cough", "abc", "M")).unwrap();
        assert_eq!(features, vec![0.0, DEFAULT_AGE, 0.0]);
    }

    #[test]
    fn unknown_category_falls_back_to_general_record() {
        let engine = ml_engine(FixedClassifier::new(&["uti"], &[0.6]));
        let rec = engine.recommend(&SymptomQuery::new("burning", 40, "female"));
        assert_eq!(rec.diagnosis, UNMAPPED_DIAGNOSIS);
        assert_eq!(rec.medicine, "- Symptomatic");
        assert_eq!(rec.predicted_category.as_deref(), Some("uti"));
    }

    #[test]
    fn classifier_error_uses_rules_for_that_call() {
        let engine = ml_engine(BrokenClassifier(vec!["fever".to_string()]));
        let rec = engine.recommend(&SymptomQuery::new("high fever and body ache", 30, "male"));
        assert_eq!(rec.diagnosis, "Acute febrile illness");
        assert_eq!(rec.notes, RULE_NOTES);
        assert!(rec.predicted_category.is_none());
        assert!(rec.confidence.is_none());
        // El modo no se degrada por un fallo puntual.
        assert_eq!(engine.mode(), Mode::Ml);
    }

    #[test]
    fn probability_width_mismatch_is_a_per_call_failure() {
        let engine = ml_engine(FixedClassifier::new(&["cold", "fever"], &[1.0]));
        let rec = engine.recommend(&SymptomQuery::new("wheezing", 30, "male"));
        assert_eq!(rec.diagnosis, "Asthma / Reactive Airway Disease");
    }

    #[test]
    fn rules_only_is_deterministic() {
        let engine = RecommendationEngine::rules_only();
        assert_eq!(engine.mode(), Mode::Rules);
        let query = SymptomQuery::new("knee pain at night", "61", "female").with_family_history("gout");
        let first = engine.recommend(&query);
        let second = engine.recommend(&query);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.diagnosis, "Osteoarthritis / Degenerative Joint Disease");
    }

    #[test]
    fn rules_mode_forced_by_config_skips_artifacts() {
        let cfg = AppConfig {
            engine_mode: EngineMode::Rules,
            model_dir: std::path::PathBuf::from("/no/existe"),
            ..Default::default()
        };
        assert_eq!(RecommendationEngine::from_config(&cfg).mode(), Mode::Rules);
    }
}
