use std::{fs, path::Path};

use med4me_cds::{
    config::{AppConfig, EngineMode},
    engine::{Mode, RecommendationEngine},
    models::SymptomQuery,
};
use tempfile::TempDir;

const VECTORIZER: &str = r#"{"vocabulary": {"fever": 0, "cough": 1}, "idf": [1.0, 1.0]}"#;

// Un solo árbol: la columna "fever" decide entre cold y fever.
const CLASSIFIER: &str = r#"{
    "classes": ["cold", "fever"],
    "n_features": 4,
    "trees": [{
        "children_left": [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature": [0, -2, -2],
        "threshold": [0.5, -2.0, -2.0],
        "value": [[4.0, 4.0], [3.0, 1.0], [0.0, 4.0]]
    }]
}"#;

const TREATMENTS: &str = r#"{
    "fever": {"Medicine": "- Paracetamol 500 mg", "Alternative": "- Ibuprofen 400 mg",
              "Lifestyle": "Rest and fluids", "Red Flags": "Fever above 39C",
              "Follow-Up": "48 hours"},
    "general": {"Medicine": "- Symptomatic care"}
}"#;

fn write_artifacts(dir: &Path) {
    fs::write(dir.join("vectorizer.json"), VECTORIZER).expect("vectorizer");
    fs::write(dir.join("ml_model.json"), CLASSIFIER).expect("classifier");
    fs::write(dir.join("treatment_db.json"), TREATMENTS).expect("treatments");
}

fn config(dir: &TempDir) -> AppConfig {
    AppConfig {
        model_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

fn fever_query() -> SymptomQuery {
    SymptomQuery::new("high fever and body ache", 30, "male")
}

#[test]
fn loads_ml_mode_when_all_artifacts_are_present() {
    let dir = tempfile::tempdir().expect("tmpdir");
    write_artifacts(dir.path());

    let engine = RecommendationEngine::from_config(&config(&dir));
    assert_eq!(engine.mode(), Mode::Ml);

    let rec = engine.recommend(&fever_query());
    assert_eq!(rec.diagnosis, "Acute Febrile Illness");
    assert_eq!(rec.medicine, "- Paracetamol 500 mg");
    assert_eq!(rec.predicted_category.as_deref(), Some("fever"));
    assert_eq!(rec.confidence, Some(1.0));

    let rec = engine.recommend(&SymptomQuery::new("dry cough", "41", "female"));
    assert_eq!(rec.predicted_category.as_deref(), Some("cold"));
    // "cold" no está en el catálogo: se usa la entrada general y los textos por defecto.
    assert_eq!(rec.medicine, "- Symptomatic care");
    assert!(!rec.follow_up.is_empty());
}

#[test]
fn missing_catalog_keeps_rules_mode() {
    let dir = tempfile::tempdir().expect("tmpdir");
    write_artifacts(dir.path());
    fs::remove_file(dir.path().join("treatment_db.json")).expect("remove");

    let engine = RecommendationEngine::from_config(&config(&dir));
    assert_eq!(engine.mode(), Mode::Rules);

    let rec = engine.recommend(&fever_query());
    assert_eq!(rec.diagnosis, "Acute febrile illness");
    assert!(rec.notes.contains("rule-based recommendation"));
    assert!(rec.predicted_category.is_none());
    assert!(rec.confidence.is_none());
}

#[test]
fn absent_classifier_never_reports_a_prediction() {
    let dir = tempfile::tempdir().expect("tmpdir");
    write_artifacts(dir.path());
    fs::remove_file(dir.path().join("ml_model.json")).expect("remove");

    let engine = RecommendationEngine::from_config(&config(&dir));
    assert_eq!(engine.mode(), Mode::Rules);

    for text in ["high fever and body ache", "dry cough", "wheezing at night", "tired"] {
        let rec = engine.recommend(&SymptomQuery::new(text, 30, "male"));
        assert!(rec.predicted_category.is_none(), "{text:?}");
        assert!(rec.confidence.is_none(), "{text:?}");
        assert!(rec.notes.contains("rule-based recommendation"), "{text:?}");
    }
}

#[test]
fn absent_vectorizer_keeps_rules_mode() {
    let dir = tempfile::tempdir().expect("tmpdir");
    write_artifacts(dir.path());
    fs::remove_file(dir.path().join("vectorizer.json")).expect("remove");

    let engine = RecommendationEngine::from_config(&config(&dir));
    assert_eq!(engine.mode(), Mode::Rules);
    assert!(engine.recommend(&fever_query()).predicted_category.is_none());
}

#[test]
fn corrupt_classifier_keeps_rules_mode() {
    let dir = tempfile::tempdir().expect("tmpdir");
    write_artifacts(dir.path());
    fs::write(dir.path().join("ml_model.json"), "{").expect("corrupt");

    let engine = RecommendationEngine::from_config(&config(&dir));
    assert_eq!(engine.mode(), Mode::Rules);
}

#[test]
fn forced_rules_mode_ignores_valid_artifacts() {
    let dir = tempfile::tempdir().expect("tmpdir");
    write_artifacts(dir.path());

    let cfg = AppConfig {
        engine_mode: EngineMode::Rules,
        ..config(&dir)
    };
    assert_eq!(RecommendationEngine::from_config(&cfg).mode(), Mode::Rules);
}

#[test]
fn every_answer_has_diagnosis_and_medicine() {
    let dir = tempfile::tempdir().expect("tmpdir");
    write_artifacts(dir.path());
    let engines = [
        RecommendationEngine::from_config(&config(&dir)),
        RecommendationEngine::rules_only(),
    ];

    let inputs = [
        "",
        "   ",
        "fever",
        "sneezing and runny nose",
        "burning urination",
        "random words with no match",
        "ÁÉÍ ñandú 🤒",
    ];
    for engine in &engines {
        for text in inputs {
            let rec = engine.recommend(&SymptomQuery::new(text, "", ""));
            assert!(!rec.diagnosis.is_empty(), "{text:?}");
            assert!(!rec.medicine.is_empty(), "{text:?}");
        }
    }
}
