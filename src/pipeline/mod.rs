//! Batch evaluation pipeline
//!
//! Drives a compiled rule over a stream of source rows. Row-level
//! failures are recorded in the report and never abort the batch; the
//! async front-end additionally supports bounded backpressure and
//! cooperative cancellation.

use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::eval::{EvalError, Row};
use crate::generate::apply_rule;
use crate::mapping::CompiledRule;
use crate::rdf::Triple;

/// Pipeline tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Triples are flushed downstream in chunks of this many rows
    pub batch_size: usize,
    /// Bound of the row inbox (backpressure on the producer)
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            channel_capacity: 1024,
        }
    }
}

/// One failed row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Name of the rule being applied, if the mapping block was named
    pub rule: Option<String>,
    /// Zero-based offset of the row within its batch
    pub row_index: usize,
    /// What went wrong
    pub error: EvalError,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.rule {
            Some(name) => write!(f, "rule {}, row {}: {}", name, self.row_index, self.error),
            None => write!(f, "row {}: {}", self.row_index, self.error),
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalReport {
    /// Rows consumed
    pub rows_in: usize,
    /// Triples produced (after per-row deduplication)
    pub triples_out: usize,
    /// Rows that failed, in input order
    pub errors: Vec<RowError>,
}

impl EvalReport {
    /// Whether every consumed row succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, rule: &CompiledRule, row_index: usize, error: EvalError) {
        self.errors.push(RowError {
            rule: rule.name().map(str::to_string),
            row_index,
            error,
        });
    }
}

/// Apply a rule to every row, collecting triples and a report.
///
/// Row order is preserved in the output; a failed row contributes no
/// triples and one report entry.
pub fn evaluate_rows(
    rule: &CompiledRule,
    rows: impl IntoIterator<Item = Row>,
) -> (Vec<Triple>, EvalReport) {
    let mut triples = Vec::new();
    let mut report = EvalReport::default();

    for (index, row) in rows.into_iter().enumerate() {
        report.rows_in += 1;
        match apply_rule(rule, row) {
            Ok(generated) => triples.extend(generated),
            Err(error) => {
                warn!("row {} failed: {}", index, error);
                report.record(rule, index, error);
            }
        }
    }

    report.triples_out = triples.len();
    (triples, report)
}

/// Parallel variant of [`evaluate_rows`].
///
/// Rows are evaluated independently across the rayon pool; output
/// ordering and report contents match the sequential version exactly.
pub fn par_evaluate_rows(rule: &CompiledRule, rows: Vec<Row>) -> (Vec<Triple>, EvalReport) {
    let mut report = EvalReport {
        rows_in: rows.len(),
        ..Default::default()
    };

    let outcomes: Vec<(usize, Result<Vec<Triple>, EvalError>)> = rows
        .into_par_iter()
        .enumerate()
        .map(|(index, row)| (index, apply_rule(rule, row)))
        .collect();

    let mut triples = Vec::new();
    for (index, outcome) in outcomes {
        match outcome {
            Ok(generated) => triples.extend(generated),
            Err(error) => report.record(rule, index, error),
        }
    }

    report.triples_out = triples.len();
    (triples, report)
}

/// Handle to a spawned evaluator task
pub struct EvaluatorHandle {
    /// Send source rows here; dropping the sender ends the run cleanly
    pub rows: mpsc::Sender<Row>,
    /// Generated triples, in input order, flushed in batches
    pub triples: mpsc::Receiver<Vec<Triple>>,
    /// Set to `true` to stop the run without draining pending rows
    pub cancel: watch::Sender<bool>,
    /// Resolves to the final report when the task finishes
    pub done: JoinHandle<EvalReport>,
}

impl EvaluatorHandle {
    /// Split the handle into its parts, wrapping the output side as a
    /// `Stream` of triple batches for use with stream combinators.
    ///
    /// The cancel sender must be kept alive for the run's duration:
    /// dropping it cancels the evaluator.
    pub fn into_stream(
        self,
    ) -> (
        mpsc::Sender<Row>,
        ReceiverStream<Vec<Triple>>,
        watch::Sender<bool>,
        JoinHandle<EvalReport>,
    ) {
        (
            self.rows,
            ReceiverStream::new(self.triples),
            self.cancel,
            self.done,
        )
    }
}

/// Spawn an evaluator task with bounded backpressure.
///
/// The task consumes rows until the sender is dropped or `cancel` flips
/// to `true`. Cancellation stops consumption immediately; rows already
/// buffered in the channel are left undrained.
pub fn spawn_evaluator(rule: Arc<CompiledRule>, config: EngineConfig) -> EvaluatorHandle {
    let (row_tx, mut row_rx) = mpsc::channel::<Row>(config.channel_capacity);
    let (triple_tx, triple_rx) = mpsc::channel::<Vec<Triple>>(config.channel_capacity);
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let done = tokio::spawn(async move {
        let mut report = EvalReport::default();
        let mut buffer: Vec<Triple> = Vec::new();
        let mut index = 0usize;

        debug!(
            "evaluator started (batch_size {}, rule {:?})",
            config.batch_size,
            rule.name()
        );

        loop {
            let row = tokio::select! {
                biased;
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        info!("evaluator cancelled after {} rows", report.rows_in);
                        break;
                    }
                    continue;
                }
                row = row_rx.recv() => match row {
                    Some(row) => row,
                    None => break,
                },
            };

            report.rows_in += 1;
            match apply_rule(&rule, row) {
                Ok(generated) => {
                    report.triples_out += generated.len();
                    buffer.extend(generated);
                }
                Err(error) => {
                    warn!("row {} failed: {}", index, error);
                    report.record(&rule, index, error);
                }
            }
            index += 1;

            if buffer.len() >= config.batch_size {
                let batch = std::mem::take(&mut buffer);
                if triple_tx.send(batch).await.is_err() {
                    // downstream hung up
                    break;
                }
            }
        }

        if !buffer.is_empty() {
            let _ = triple_tx.send(buffer).await;
        }

        info!(
            "evaluator finished: {} rows in, {} triples out, {} errors",
            report.rows_in,
            report.triples_out,
            report.errors.len()
        );
        report
    });

    EvaluatorHandle {
        rows: row_tx,
        triples: triple_rx,
        cancel: cancel_tx,
        done,
    }
}
