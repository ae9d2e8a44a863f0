use appstore_ml::{
    AppStore, Cell, CleanedAppRecord, Field, MemoryStore, ParseIssue, Pipeline, PipelineConfig,
    PipelineError, PriceModel, RawAppRecord, RawTable, RowIdentity, TrainingConfig,
};

fn raw(app: &str, developer: &str, category: &str, rating: &str, size: &str, installs: &str, price: &str) -> RawAppRecord {
    RawAppRecord {
        app: Some(app.to_string()),
        developer: Some(developer.to_string()),
        category: Some(category.to_string()),
        rating: Some(rating.to_string()),
        reviews: Some("۱۲۰".to_string()),
        size: Some(size.to_string()),
        installs: Some(installs.to_string()),
        price: Some(price.to_string()),
    }
}

fn market() -> RawTable {
    RawTable::from_records(&[
        raw("دیوار", "سپهر", "شبکه های اجتماعی", "۴.۲", "۱۲ مگابایت", "۵ میلیون+", "۱۵,۰۰۰ تومان"),
        // то же приложение, другие пробелы и полупробел
        raw(" دیوار", "سپهر\u{200c} ", "آموزش", "1.0", "1M", "10+", "99"),
        raw("بلد", "#NAME?", "آموزش", "۳", "۵M", "۱۰۰ هزار", "۲۰۰۰"),
        raw("تقویم", "فرزین", "شبکه\u{200c}های اجتماعی", "نامشخص", "Varies with device", "1,000+", "5000"),
        raw("لغت‌نامه", "کاوه", "کتاب ها و مطبوعات", "4.8", "30M", "۵۰ هزار+", "رایگان"),
        raw("نقشه", "کاوه", "سفر", "4.0", "20M", "abc", "12000"),
    ])
}

#[test]
fn duplicate_identity_collapses_to_first_row() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&market(), None, false).unwrap();

    assert_eq!(output.dedup.input_rows, 6);
    assert_eq!(output.dedup.duplicate_rows, 1);
    assert_eq!(output.dedup.invalid_developer_rows, 1);
    assert_eq!(output.cleaned.records.len(), 4);

    assert_eq!(
        output.cleaned.records[0],
        CleanedAppRecord {
            category: "شبکه های اجتماعی".to_string(),
            rating: 4.2,
            reviews: 120,
            size: 12.0,
            installs: 5_000_000,
            price: 15_000.0,
        }
    );
}

#[test]
fn medians_are_computed_before_any_drop() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&market(), None, false).unwrap();
    let cleaned = &output.cleaned;

    // Size: 12, 30, 20 -> 20; Rating: 4.2, 4.8, 4.0 -> 4.2
    assert_eq!(cleaned.report.size_median, Some(20.0));
    assert_eq!(cleaned.report.rating_median, Some(4.2));

    let filled = &cleaned.records[1];
    assert_eq!(filled.size, 20.0);
    assert_eq!(filled.rating, 4.2);
    assert_eq!(filled.installs, 1000);

    let flags = &cleaned.quality[1].defaulted;
    assert_eq!(flags.len(), 2);
    assert!(flags.iter().all(|f| f.reason == ParseIssue::Malformed || f.reason == ParseIssue::Missing));

    let free = &cleaned.records[2];
    assert_eq!(free.price, 0.0);
    assert_eq!(free.installs, 50_000);

    assert_eq!(cleaned.records[3].installs, 0);
    assert_eq!(cleaned.report.defaulted_count(Field::Installs), 1);
    assert_eq!(cleaned.report.defaulted_count(Field::Price), 1);
}

#[test]
fn features_drop_raw_columns_and_merge_categories() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&market(), None, false).unwrap();
    let features = &output.features;

    for raw in ["Price", "Reviews", "Installs", "Size", "Category"] {
        assert!(features.column_index(raw).is_none());
    }
    for derived in ["Reviews_Log", "Installs_Log", "Size_Log", "Rating"] {
        assert!(features.column_index(derived).is_some());
    }

    // оба написания "شبکه های اجتماعی" сливаются в одну колонку
    assert!(features.column_index("Cat_شبکه\u{200c}های اجتماعی").is_some());
    assert!(features.column_index("Cat_شبکه های اجتماعی").is_none());
    assert!(features.column_index("Cat_کتاب\u{200c}ها و مطبوعات").is_some());

    let matrix = features.to_matrix();
    let cat: Vec<usize> = (0..features.columns.len())
        .filter(|&i| features.columns[i].starts_with("Cat_"))
        .collect();
    for i in 0..matrix.nrows() {
        assert_eq!(cat.iter().map(|&j| matrix[[i, j]]).sum::<f64>(), 1.0);
    }

    assert_eq!(output.target.len(), features.len());
    assert!((output.target[0] - 15_001f64.ln()).abs() < 1e-12);
}

#[test]
fn deduplication_is_idempotent() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let (once, _) = pipeline.deduplicate(&market()).unwrap();
    let (twice, report) = pipeline.deduplicate(&once).unwrap();
    assert_eq!(once, twice);
    assert_eq!(report.output_rows, report.input_rows);
}

#[test]
fn missing_required_column_aborts() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let mut table = market();
    let size = table.column_index("Size").unwrap();
    table.columns.remove(size);
    for row in &mut table.rows {
        row.remove(size);
    }

    let err = pipeline.run(&table, None, false).unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn(c) if c == "Size"));
}

#[test]
fn raw_table_accepts_json_cells() {
    let json = r#"{
        "columns": ["App", "Developer", "Category", "Rating", "Reviews", "Size", "Installs", "Price"],
        "rows": [["a", "d", "سفر", 4.5, null, "10M", "1,000+", 2.5]]
    }"#;
    let table: RawTable = serde_json::from_str(json).unwrap();
    assert_eq!(table.rows[0][3], Cell::Number(4.5));
    assert_eq!(table.rows[0][4], Cell::Missing);

    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&table, None, true).unwrap();
    let record = &output.cleaned.records[0];
    assert_eq!((record.rating, record.reviews, record.price), (4.5, 0, 2.5));
}

#[test]
fn paid_apps_are_persisted_and_priced() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&market(), None, true).unwrap();
    assert!(output.cleaned.records.iter().all(|r| r.price > 0.0));

    let mut store = MemoryStore::new();
    store.insert_many(&output.cleaned.records).unwrap();
    assert_eq!(store.len(), 3);

    let config = TrainingConfig {
        bootstrap_samples: 500,
        ..TrainingConfig::default()
    };
    let mut model = PriceModel::new();
    let report = model.train(&output.features, &output.target, &config).unwrap();
    assert_eq!(report.samples, 500);
    assert_eq!(report.train_samples + report.test_samples, 500);
    assert_eq!(report.importance.len(), output.features.columns.len());
    assert!(report.train.rmse.is_finite());

    // новая категория при инференсе попадает в unknown того же словаря
    let unseen = RawTable::from_records(&[raw("جدید", "تازه", "ورزش", "4", "8M", "100+", "1000")]);
    let vocabulary = model.vocabulary().unwrap().clone();
    let inference = pipeline.run(&unseen, Some(&vocabulary), false).unwrap();
    assert_eq!(inference.features.columns, output.features.columns);

    let prices = model.predict_price(&inference.features).unwrap();
    assert_eq!(prices.len(), 1);
    assert!(prices[0].is_finite());
}

#[test]
fn prediction_requires_training() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&market(), None, true).unwrap();
    let model = PriceModel::new();
    assert!(matches!(
        model.predict_price(&output.features),
        Err(PipelineError::NotTrained)
    ));
}

#[test]
fn surviving_rows_point_back_to_raw_input() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let table = RawTable::from_records(&[
        raw("دیوار", "سپهر", "سفر", "4", "10M", "100+", "1000"),
        raw("دیوار ", "سپهر", "سفر", "3", "12M", "100+", "2000"),
        raw("بلد", "#NAME?", "سفر", "4", "10M", "100+", "3000"),
        raw("نقشه", "کاوه", "آموزش", "5", "8M", "10+", "4000"),
    ]);

    let output = pipeline.run(&table, None, false).unwrap();
    assert_eq!(output.dedup.kept_rows, vec![0, 3]);
    assert_eq!(output.source_rows(), vec![0, 3]);

    let identities = pipeline.identities(&table, &output.source_rows()).unwrap();
    assert_eq!(
        identities[1],
        RowIdentity {
            source_row: 3,
            app: "نقشه".to_string(),
            developer: "کاوه".to_string(),
        }
    );

    // отброшенная очисткой строка тоже указывает на сырую таблицу
    let mut broken = table.clone();
    let category = broken.column_index("Category").unwrap();
    broken.rows[3][category] = Cell::Missing;
    let output = pipeline.run(&broken, None, false).unwrap();
    assert_eq!(output.source_rows(), vec![0]);
    assert_eq!(output.cleaned.report.dropped[0].source_row, 3);
}

#[test]
fn model_fit_leaves_a_ready_model() {
    fn assert_send<T: Send + 'static>() {}
    assert_send::<PriceModel>();
    assert_send::<appstore_ml::PipelineOutput>();

    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&market(), None, true).unwrap();
    let config = TrainingConfig {
        bootstrap_samples: 200,
        ..TrainingConfig::default()
    };

    let (model, report) = PriceModel::fit(&output.features, &output.target, &config).unwrap();
    assert!(model.is_trained());
    assert_eq!(report.samples, 200);
    assert_eq!(model.predict_price(&output.features).unwrap().len(), output.features.len());
}
