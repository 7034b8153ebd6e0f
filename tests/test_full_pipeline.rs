//! Integration test: upload, train, persist and predict end-to-end

use std::sync::Arc;
use tabtrain::error::TabtrainError;
use tabtrain::preprocessing::{ClassLabel, FieldValue, Record};
use tabtrain::registry::{FsModelRegistry, ModelRegistry};
use tabtrain::session::Session;
use tabtrain::training::{ModelKind, TrainingConfig};

fn loan_csv() -> String {
    let mut text = String::from("income;employment;debt;approved\n");
    for i in 0..40 {
        let approved = i % 2 == 0;
        let income = if approved { 6000 + i * 50 } else { 1500 + i * 10 };
        let employment = if approved { "salaried" } else if i % 3 == 0 { "none" } else { "contract" };
        let debt = if approved { 100 } else { 2500 };
        text.push_str(&format!(
            "{};{};{};{}\n",
            income,
            employment,
            debt,
            if approved { "yes" } else { "no" }
        ));
    }
    text
}

fn config() -> TrainingConfig {
    TrainingConfig::default()
        .with_n_estimators(20)
        .with_boosting_rounds(20)
}

fn session_at(dir: &std::path::Path) -> Session {
    let registry: Arc<dyn ModelRegistry> = Arc::new(FsModelRegistry::open(dir).unwrap());
    Session::new(registry, config())
}

fn approved_applicant() -> Record {
    let mut record = Record::new();
    record.insert("income".to_string(), FieldValue::Number(7000.0));
    record.insert("employment".to_string(), FieldValue::from("salaried"));
    record.insert("debt".to_string(), FieldValue::Number(100.0));
    record
}

#[test]
fn test_full_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_at(dir.path());

    assert!(!session.state().dataset_loaded);
    assert!(matches!(session.train("approved"), Err(TabtrainError::NoDatasetLoaded)));
    assert!(matches!(session.features(), Err(TabtrainError::NoModelTrained)));

    let columns = session.upload(loan_csv().as_bytes()).unwrap();
    assert_eq!(columns, vec!["income", "employment", "debt", "approved"]);
    assert!(session.state().dataset_loaded);
    assert!(!session.state().model_trained);

    let result = session.train("approved").unwrap();
    assert_eq!(result.prediction_url, "/predict");
    assert_eq!(result.n_held_out, 8);
    assert!(session.state().model_trained);

    let features = session.features().unwrap();
    assert_eq!(
        features,
        vec!["income", "employment_salaried", "employment_contract", "employment_none", "debt"]
    );

    for kind in ModelKind::ROSTER {
        let label = session.predict_with(kind, &approved_applicant()).unwrap();
        assert_eq!(label, ClassLabel::from("yes"), "{} disagreed", kind);
    }
}

#[test]
fn test_models_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let session = session_at(dir.path());
        session.upload(loan_csv().as_bytes()).unwrap();
        session.train("approved").unwrap();
    }

    let restarted = session_at(dir.path());
    assert!(!restarted.state().dataset_loaded);
    assert!(restarted.state().model_trained);
    assert_eq!(restarted.features().unwrap().len(), 5);
    assert_eq!(
        restarted.predict(&approved_applicant()).unwrap(),
        ClassLabel::from("yes")
    );
}

#[test]
fn test_retrain_gives_same_schema_and_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_at(dir.path());
    session.upload(loan_csv().as_bytes()).unwrap();

    let mut record = approved_applicant();
    record.insert("income".to_string(), FieldValue::Number(3000.0));

    session.train("approved").unwrap();
    let first_features = session.features().unwrap();
    let first: Vec<ClassLabel> = ModelKind::ROSTER
        .iter()
        .map(|&kind| session.predict_with(kind, &record).unwrap())
        .collect();

    session.train("approved").unwrap();
    let second: Vec<ClassLabel> = ModelKind::ROSTER
        .iter()
        .map(|&kind| session.predict_with(kind, &record).unwrap())
        .collect();

    assert_eq!(session.features().unwrap(), first_features);
    assert_eq!(first, second);
}

#[test]
fn test_retrain_replaces_schema() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_at(dir.path());
    session.upload(loan_csv().as_bytes()).unwrap();
    session.train("approved").unwrap();

    // Same table, different target
    session.train("employment").unwrap();
    let features = session.features().unwrap();
    assert!(features.contains(&"approved_yes".to_string()));
    assert!(features.iter().all(|f| !f.starts_with("employment")));
}

#[test]
fn test_failed_train_keeps_previous_models() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_at(dir.path());
    session.upload(loan_csv().as_bytes()).unwrap();
    session.train("approved").unwrap();
    let before = session.features().unwrap();

    let err = session.train("not_a_column").unwrap_err();
    assert!(matches!(err, TabtrainError::InvalidTarget(_)));
    assert_eq!(session.features().unwrap(), before);

    // A new upload does not touch the stored models
    session.upload(b"a;b\n1;x\n2;y\n").unwrap();
    assert_eq!(session.features().unwrap(), before);
    assert!(session.predict(&approved_applicant()).is_ok());
}

#[test]
fn test_prediction_with_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_at(dir.path());
    session.upload(loan_csv().as_bytes()).unwrap();
    session.train("approved").unwrap();

    let mut partial = Record::new();
    partial.insert("income".to_string(), FieldValue::Number(7000.0));
    assert!(session.predict_with(ModelKind::RandomForest, &partial).is_ok());
    assert!(session.predict_with(ModelKind::GradientBoosting, &partial).is_ok());
}

#[test]
fn test_registry_directory_layout() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_at(dir.path());
    session.upload(loan_csv().as_bytes()).unwrap();
    session.train("approved").unwrap();

    let manifest = std::fs::read_to_string(dir.path().join("MANIFEST.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    let generation = manifest["generation"].as_str().unwrap();

    let gen_dir = dir.path().join(generation);
    for file in ["random_forest.bin", "gradient_boosting.bin", "svm.bin", "feature_names.json"] {
        assert!(gen_dir.join(file).exists(), "missing {}", file);
    }

    let schema: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(gen_dir.join("feature_names.json")).unwrap())
            .unwrap();
    assert_eq!(schema["target"], "approved");
}
