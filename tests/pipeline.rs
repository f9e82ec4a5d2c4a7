use approx::assert_abs_diff_eq;
use resale_pricer::data::synthetic;
use resale_pricer::{
    BoostingParams, Column, Dataset, EstimatorConfig, Listing, Model, PipelineConfig,
    PipelineError, ReducerConfig, ReducerKind, TabularConfig, TextConfig, TextField,
    VectorizerConfig, VectorizerKind,
};
use serde_json::Value;
use std::collections::BTreeMap;

fn head_tail(data: &Dataset, n_head: usize) -> (Dataset, Dataset) {
    let head: Vec<usize> = (0..n_head).collect();
    let tail: Vec<usize> = (n_head..data.len()).collect();
    (data.select(&head), data.select(&tail))
}

fn text_pipeline(name: &str) -> PipelineConfig {
    PipelineConfig::new(name).with_text(true).with_text_config(
        TextConfig::default().with_reducer(Some(ReducerConfig::new(ReducerKind::TruncatedSvd, 10))),
    )
}

fn boosting_pipeline(name: &str) -> PipelineConfig {
    let params = BoostingParams {
        n_estimators: 40,
        subsample: 0.8,
        min_samples_leaf: 3,
        ..BoostingParams::default()
    };
    text_pipeline(name).with_estimator(EstimatorConfig::gradient_boosting(params))
}

fn unseen_listing() -> Listing {
    Listing::default()
        .with_categorical(Column::Category, "swimwear")
        .with_categorical(Column::Subcategory, "trunks")
        .with_categorical(Column::Department, "kidswear")
        .with_categorical(Column::Designer, "Maison Margiela")
        .with_categorical(Column::Size, "XXXL")
        .with_categorical(Column::Color, "teal")
        .with_categorical(Column::Condition, "Vintage")
        .with_numeric(Column::NPhotos, 4.0)
        .with_text(TextField::ItemName, "Maison Margiela tabi swim trunks")
        .with_text(TextField::Description, "never seen before words")
        .with_text(TextField::Hashtags, "#margiela #swim")
}

#[test]
fn save_load_round_trip_reproduces_predictions() {
    let data = synthetic::generate(90, 21);
    let (train, test) = head_tail(&data, 70);
    let dir = tempfile::tempdir().unwrap();

    for config in [text_pipeline("ridge-text"), boosting_pipeline("gboost-text")] {
        let mut model = Model::new(config).unwrap();
        model.fit(&train.listings, &train.prices).unwrap();
        let path = model.save(dir.path()).unwrap();
        let loaded = Model::load(&path).unwrap();

        assert_eq!(loaded.feature_names().unwrap(), model.feature_names().unwrap());
        assert_eq!(
            loaded.predict(&test.listings).unwrap(),
            model.predict(&test.listings).unwrap()
        );
    }
}

#[test]
fn predictions_follow_row_permutation() {
    let data = synthetic::generate(80, 5);
    let mut model = Model::new(text_pipeline("perm")).unwrap();
    model.fit(&data.listings, &data.prices).unwrap();

    let forward = model.predict(&data.listings).unwrap();
    let reversed_rows: Vec<Listing> = data.listings.iter().rev().cloned().collect();
    let reversed = model.predict(&reversed_rows).unwrap();

    for (a, b) in forward.iter().rev().zip(reversed.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }

    // one row at a time matches the batch
    for (row, expected) in data.listings.iter().zip(forward.iter()).take(5) {
        let single = model.predict(std::slice::from_ref(row)).unwrap();
        assert_abs_diff_eq!(single[0], *expected, epsilon = 1e-9);
    }
}

#[test]
fn unseen_categories_and_terms_still_predict() {
    let data = synthetic::generate(80, 8);
    for config in [text_pipeline("ridge"), boosting_pipeline("gboost")] {
        let mut model = Model::new(config).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();
        let prediction = model.predict(&[unseen_listing()]).unwrap();
        assert_eq!(prediction.len(), 1);
        assert!(prediction[0].is_finite() && prediction[0] >= 0.0);
    }
}

#[test]
fn missing_text_in_any_field_is_handled() {
    let data = synthetic::generate(80, 13);
    let mut model = Model::new(text_pipeline("missing-text")).unwrap();
    model.fit(&data.listings, &data.prices).unwrap();

    let base = data.listings[0].clone();
    for field in TextField::ALL {
        let blank = base.clone().with_text(field, "   ").clean();
        let mut absent = base.clone();
        match field {
            TextField::ItemName => absent.item_name = None,
            TextField::Description => absent.description = None,
            TextField::Hashtags => absent.hashtags = None,
        }
        let absent = absent.clean();
        assert_eq!(blank, absent);

        let prediction = model.predict(&[blank]).unwrap();
        assert!(prediction[0].is_finite() && prediction[0] >= 0.0, "{}", field);
    }

    let mut all_missing = base.clone();
    all_missing.item_name = None;
    all_missing.description = None;
    all_missing.hashtags = None;
    assert!(model.predict(&[all_missing.clean()]).unwrap()[0] >= 0.0);

    // uncleaned rows lacking a field are a structural mismatch
    let mut raw = base;
    raw.description = None;
    assert!(matches!(
        model.predict(&[raw]),
        Err(PipelineError::TransformMismatch(_))
    ));
}

#[test]
fn duplicate_column_assignment_fails_before_fit() {
    let tabular = TabularConfig::default()
        .with_one_hot(vec![Column::Department, Column::Category, Column::Designer]);
    let config = PipelineConfig::new("dup").with_tabular_config(tabular);

    match Model::new(config) {
        Err(PipelineError::Configuration(message)) => assert!(message.contains("designer")),
        other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
    }

    let mut overrides = BTreeMap::new();
    overrides.insert(
        "tabular.ordinal".to_string(),
        Value::from(vec!["condition", "color"]),
    );
    assert!(matches!(
        PipelineConfig::default().with_overrides(&overrides),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn metrics_are_deterministic() {
    let data = synthetic::generate(100, 17);
    let (train, eval) = head_tail(&data, 75);

    let run = || {
        let mut model = Model::new(boosting_pipeline("det").with_seed(9)).unwrap();
        model.fit(&train.listings, &train.prices).unwrap();
        let first = model.evaluate(&eval.listings, &eval.prices).unwrap();
        let second = model.evaluate(&eval.listings, &eval.prices).unwrap();
        assert_eq!(first, second);
        first
    };
    assert_eq!(run(), run());
}

#[test]
fn ridge_tfidf_pca_beats_error_threshold() {
    let data = synthetic::generate(80, 2024);
    let (train, test) = head_tail(&data, 60);

    let vectorizer = VectorizerConfig::new(VectorizerKind::Tfidf)
        .with_ngram_range(1, 3)
        .with_min_df(5);
    let text = TextConfig::default()
        .with_vectorizer(vectorizer)
        .with_reducer(Some(ReducerConfig::new(ReducerKind::Pca, 100)));
    let config = PipelineConfig::new("end-to-end")
        .with_estimator(EstimatorConfig::ridge(1.0))
        .with_text(true)
        .with_text_config(text);

    let mut model = Model::new(config).unwrap();
    model.fit(&train.listings, &train.prices).unwrap();

    let names = model.feature_names().unwrap();
    assert!(names.contains(&"text_pca_99".to_string()));

    let evaluation = model.evaluate(&test.listings, &test.prices).unwrap();
    assert_eq!(evaluation.n_rows, 20);
    assert!(evaluation.rmsle < 0.3, "rmsle = {}", evaluation.rmsle);
}

#[test]
fn median_baseline_predicts_a_constant() {
    let data = synthetic::generate(41, 3);
    let config = PipelineConfig::new("baseline").with_estimator(EstimatorConfig::median());
    let mut model = Model::new(config).unwrap();
    model.fit(&data.listings, &data.prices).unwrap();

    let mut sorted = data.prices.clone();
    sorted.sort_by(f64::total_cmp);
    let predictions = model.predict(&data.listings).unwrap();
    for p in predictions {
        assert_abs_diff_eq!(p, sorted[20], epsilon = 1e-9);
    }
}
