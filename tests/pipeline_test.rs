use anyhow::Result;
use async_trait::async_trait;
use cereal_pipeline::app::ports::{HttpClientPort, HttpGetResult};
use cereal_pipeline::config::PipelineConfig;
use cereal_pipeline::error::PipelineError;
use cereal_pipeline::infra::{SqliteWarehouse, WarehouseSchema};
use cereal_pipeline::pipeline::steps::{max_by_column, normalize, NormalizationSpec, Report};
use cereal_pipeline::pipeline::Pipeline;
use cereal_pipeline::storage::{InMemoryWarehouse, WarehouseSink};
use cereal_pipeline::types::{Record, Table, Value};
use std::sync::Arc;
use tempfile::tempdir;

const CEREAL_CSV: &str = "\
name,mfr,type,calories,protein,fat,sodium,fiber,carbo,sugars,potass,vitamins,shelf,weight,cups,rating
100% Bran,N,C,70,4,1,130,10,5,6,280,25,3,1,0.33,68.402973
100% Natural Bran,Q,C,120,3,5,15,2,8,8,135,0,3,1,1,33.983679
All-Bran,K,C,70,4,1,260,9,7,5,320,25,3,1,0.33,59.425505
Cheerios,G,C,110,6,2,290,2,17,1,105,25,1,1,1.25,50.764999
Mueslix Crispy Blend,K,C,160,3,2,150,3,17,13,160,25,3,1.5,0.67,30.313351
";

struct CannedHttp {
    body: &'static str,
}

#[async_trait]
impl HttpClientPort for CannedHttp {
    async fn get(&self, _url: &str) -> std::result::Result<HttpGetResult, String> {
        Ok(HttpGetResult {
            status: 200,
            bytes: self.body.as_bytes().to_vec(),
        })
    }
}

fn scenario_table() -> Table {
    Table::from_records(vec![
        Record::from_pairs([("name", "A"), ("calories", "100"), ("cups", "1")]),
        Record::from_pairs([("name", "B"), ("calories", "150"), ("cups", "0.5")]),
    ])
    .unwrap()
}

#[test]
fn test_scenario_max_calories() {
    assert_eq!(max_by_column(&scenario_table(), "calories").unwrap(), "B");
}

#[test]
fn test_scenario_normalize_by_cups() {
    let spec = NormalizationSpec::new(vec!["calories".to_string()], "cups");
    let normalized = normalize(&scenario_table(), &spec).unwrap();
    assert_eq!(normalized.records()[0].get("calories"), Some(&Value::Number(100.0)));
    assert_eq!(normalized.records()[1].get("calories"), Some(&Value::Number(300.0)));
}

#[test]
fn test_normalize_preserves_shape_and_scales() {
    let table = cereal_pipeline::pipeline::steps::parse_csv(CEREAL_CSV.as_bytes()).unwrap();
    let spec = PipelineConfig::default().normalize.spec();
    let normalized = normalize(&table, &spec).unwrap();

    assert_eq!(normalized.len(), table.len());
    assert_eq!(normalized.columns(), table.columns());
    for (before, after) in table.records().iter().zip(normalized.records()) {
        let cups = before.get("cups").unwrap().numeric("cups", 0).unwrap();
        for column in &spec.columns {
            let original = before.get(column).unwrap().numeric(column, 0).unwrap();
            let scaled = after.get(column).unwrap().numeric(column, 0).unwrap();
            assert!((scaled - original / cups).abs() < 1e-9, "{column}: {scaled}");
        }
        assert_eq!(before.get("rating"), after.get("rating"));
    }
}

#[tokio::test]
async fn test_full_run_against_sqlite() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("warehouse").join("cereals.db");
    let warehouse = Arc::new(SqliteWarehouse::open(
        db_path.to_str().unwrap(),
        WarehouseSchema::cereals(),
    )?);

    let pipeline = Pipeline::new(
        Arc::new(CannedHttp { body: CEREAL_CSV }),
        warehouse.clone(),
        PipelineConfig::default(),
    );
    let outcome = pipeline.run().await?;

    assert_eq!(outcome.report, Report::new("Mueslix Crispy Blend", "Cheerios"));
    assert_eq!(outcome.summary.n_rows, 5);
    assert_eq!(outcome.summary.n_cols, 16);
    assert_eq!(outcome.rows_written, 5);
    assert_eq!(
        outcome.report.to_string(),
        "Most caloric cereal: Mueslix Crispy Blend\nMost protein-rich cereal: Cheerios"
    );

    let stored = warehouse.read_table("normalized_cereals").await?;
    assert_eq!(stored.len(), 5);
    let bran = &stored.records()[0];
    assert_eq!(bran.get("name"), Some(&Value::text("100% Bran")));
    let calories = bran.get("calories").unwrap().numeric("calories", 0)?;
    assert!((calories - 70.0 / 0.33).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_zero_cups_fails_without_touching_warehouse() -> Result<()> {
    let csv = "name,calories,protein,cups\nA,100,3,1\nB,90,2,0\n";
    let warehouse = Arc::new(InMemoryWarehouse::new());
    let previous = Table::from_records(vec![Record::from_pairs([("name", "old")])])?;
    warehouse.replace_table("normalized_cereals", &previous).await?;

    let mut config = PipelineConfig::default();
    config.normalize.columns = vec!["calories".to_string(), "protein".to_string()];
    let pipeline = Pipeline::new(Arc::new(CannedHttp { body: csv }), warehouse.clone(), config);

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.step(), Some("normalize_cereals"));
    assert!(matches!(err.root(), PipelineError::DivideByZero { row: 1, .. }));
    assert_eq!(warehouse.read_table("normalized_cereals").await?, previous);
    Ok(())
}

#[tokio::test]
async fn test_http_failure_names_fetch_step() {
    struct Unavailable;

    #[async_trait]
    impl HttpClientPort for Unavailable {
        async fn get(&self, _url: &str) -> std::result::Result<HttpGetResult, String> {
            Ok(HttpGetResult {
                status: 503,
                bytes: Vec::new(),
            })
        }
    }

    let pipeline = Pipeline::new(
        Arc::new(Unavailable),
        Arc::new(InMemoryWarehouse::new()),
        PipelineConfig::default(),
    );
    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.step(), Some("download_cereals"));
    assert_eq!(err.kind(), "fetch");
}

#[tokio::test]
async fn test_repeated_header_fails_without_touching_warehouse() -> Result<()> {
    let csv = "name,calories,protein,cups,cups\nA,100,3,1,2\n";
    let warehouse = Arc::new(InMemoryWarehouse::new());
    let previous = Table::from_records(vec![Record::from_pairs([("name", "old")])])?;
    warehouse.replace_table("normalized_cereals", &previous).await?;

    let mut config = PipelineConfig::default();
    config.normalize.columns = vec!["calories".to_string(), "protein".to_string()];
    let pipeline = Pipeline::new(Arc::new(CannedHttp { body: csv }), warehouse.clone(), config);

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.step(), Some("download_cereals"));
    assert_eq!(err.kind(), "fetch");
    assert_eq!(warehouse.read_table("normalized_cereals").await?, previous);
    Ok(())
}

#[tokio::test]
async fn test_header_only_csv_keeps_previous_sqlite_table() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("cereals.db");
    let warehouse = Arc::new(SqliteWarehouse::open(
        db_path.to_str().unwrap(),
        WarehouseSchema::cereals(),
    )?);

    let first = Pipeline::new(
        Arc::new(CannedHttp { body: CEREAL_CSV }),
        warehouse.clone(),
        PipelineConfig::default(),
    );
    first.run().await?;
    let before = warehouse.read_table("normalized_cereals").await?;

    let header_only = "name,mfr,type,calories,protein,fat,sodium,fiber,carbo,sugars,potass,vitamins,shelf,weight,cups,rating\n";
    let second = Pipeline::new(
        Arc::new(CannedHttp { body: header_only }),
        warehouse.clone(),
        PipelineConfig::default(),
    );
    let err = second.run().await.unwrap_err();
    assert_eq!(err.step(), Some("download_cereals"));
    assert_eq!(err.kind(), "empty_table");

    let after = warehouse.read_table("normalized_cereals").await?;
    assert_eq!(after.len(), 5);
    assert_eq!(after, before);
    Ok(())
}
