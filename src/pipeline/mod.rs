// Cereal pipeline: fetch, then normalize and both aggregates, then report

pub mod steps;

use crate::app::ports::HttpClientPort;
use crate::config::PipelineConfig;
use crate::constants::{
    CALORIES_COLUMN, NAME_COLUMN, PROTEIN_COLUMN, STEP_FETCH, STEP_MAX_CALORIES, STEP_MAX_PROTEIN,
    STEP_NORMALIZE, STEP_REPORT,
};
use crate::error::{PipelineError, Result};
use crate::metrics;
use crate::storage::WarehouseSink;
use crate::types::TableSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use steps::aggregate::max_by_column;
use steps::fetch::fetch_table;
use steps::normalize::normalize_into;
use steps::report::Report;

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: TableSummary,
    pub table_name: String,
    pub rows_written: usize,
    pub report: Report,
}

pub struct Pipeline {
    http: Arc<dyn HttpClientPort>,
    warehouse: Arc<dyn WarehouseSink>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        warehouse: Arc<dyn WarehouseSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            http,
            warehouse,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every step once. The first failing step aborts the run.
    pub async fn run(&self) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunOutcome> {
        let started_at = Utc::now();
        metrics::run_started();
        info!("Starting pipeline run");

        // Fetch must finish before anything downstream starts. A header-only
        // download stops here so the warehouse keeps its previous contents.
        let url = self.config.fetch.url.as_str();
        let table = timed(STEP_FETCH, async {
            let table = fetch_table(self.http.as_ref(), url).await?;
            if table.is_empty() {
                return Err(PipelineError::EmptyTable {
                    column: NAME_COLUMN.to_string(),
                });
            }
            Ok(table)
        })
        .await?;
        let summary = table.summary();
        info!("Fetched {}", summary);
        metrics::rows_fetched(summary.n_rows);

        let spec = self.config.normalize.spec();
        let table_name = self.config.warehouse.table.as_str();
        let (rows_written, most_calories, most_protein) = tokio::try_join!(
            timed(
                STEP_NORMALIZE,
                normalize_into(&table, &spec, self.warehouse.as_ref(), table_name)
            ),
            timed(STEP_MAX_CALORIES, async {
                max_by_column(&table, CALORIES_COLUMN)
            }),
            timed(STEP_MAX_PROTEIN, async {
                max_by_column(&table, PROTEIN_COLUMN)
            }),
        )?;
        metrics::rows_normalized(rows_written);

        let report = timed(STEP_REPORT, async {
            let report = Report::new(most_calories, most_protein);
            report.log();
            Ok::<_, PipelineError>(report)
        })
        .await?;

        let finished_at = Utc::now();
        info!(
            "Pipeline run finished in {} ms",
            (finished_at - started_at).num_milliseconds()
        );
        Ok(RunOutcome {
            run_id,
            started_at,
            finished_at,
            summary,
            table_name: table_name.to_string(),
            rows_written,
            report,
        })
    }
}

/// Runs one step inside its own span, records its timing, and tags any error with the step name.
async fn timed<T, F>(step: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = fut.instrument(info_span!("step", name = step)).await;
    let elapsed = started.elapsed().as_secs_f64();
    metrics::step_finished(step, elapsed, result.is_ok());

    match result {
        Ok(value) => {
            info!(step, elapsed_secs = elapsed, "Step succeeded");
            Ok(value)
        }
        Err(e) => {
            error!(step, kind = e.kind(), "Step failed: {}", e);
            Err(e.in_step(step))
        }
    }
}
