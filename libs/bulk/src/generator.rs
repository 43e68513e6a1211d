use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use phonebook_api::{NewPhone, PhoneStore};

use crate::config::GeneratorConfig;
use crate::error::GenerateError;
use crate::number::NumberSource;
use crate::pool::WorkerPool;

// ═══════════════════════════════════════════════════════════════
//  GenerateReport
// ═══════════════════════════════════════════════════════════════

/// Outcome of one successful generate-and-persist call.
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    /// Rows committed. Always equals the requested count.
    pub persisted: usize,
    /// Worker threads that took part in generation.
    pub workers: usize,
    pub generation_duration: Duration,
    pub persist_duration: Duration,
}

impl GenerateReport {
    pub fn total_duration(&self) -> Duration {
        self.generation_duration + self.persist_duration
    }

    pub fn rows_per_second(&self) -> f64 {
        let secs = self.total_duration().as_secs_f64();
        if secs > 0.0 {
            self.persisted as f64 / secs
        } else {
            0.0
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Generator
// ═══════════════════════════════════════════════════════════════

/// Owns the process-wide generation pool. Share one instance between
/// callers; every batch runs on the same `workers` threads.
pub struct Generator {
    store: Arc<dyn PhoneStore>,
    source: Arc<NumberSource>,
    pool: WorkerPool,
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(store: Arc<dyn PhoneStore>, config: GeneratorConfig) -> Result<Self, GenerateError> {
        config.validate()?;
        let pool = WorkerPool::new(config.effective_workers())?;
        Ok(Self {
            store,
            source: Arc::new(NumberSource::from_config(&config)),
            pool,
            config,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Threads in the generation pool.
    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    /// Generate `count` records in parallel, then insert all of them in one
    /// transaction.
    ///
    /// Returns only after every chunk has been generated and the insert has
    /// either committed or rolled back. On error nothing was persisted.
    pub async fn generate_and_persist(&self, count: usize) -> Result<GenerateReport, GenerateError> {
        if count == 0 {
            return Err(GenerateError::InvalidCount);
        }
        if count > self.config.max_count {
            return Err(GenerateError::TooLarge {
                requested: count,
                max: self.config.max_count,
            });
        }

        let started = Instant::now();
        let (batch, workers) =
            generate_batch(&self.pool, &self.source, count, self.config.chunk_size).await?;
        let generation_duration = started.elapsed();

        let persist_started = Instant::now();
        let persisted = match self.store.insert_batch(batch).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(count, error = %e, "batch persist failed, nothing committed");
                return Err(e.into());
            }
        };

        let report = GenerateReport {
            persisted,
            workers,
            generation_duration,
            persist_duration: persist_started.elapsed(),
        };
        tracing::info!(
            persisted = report.persisted,
            workers = report.workers,
            generation_ms = report.generation_duration.as_millis() as u64,
            persist_ms = report.persist_duration.as_millis() as u64,
            rate = format_args!("{:.1}", report.rows_per_second()),
            "batch generated and persisted"
        );
        Ok(report)
    }
}

/// Build a batch of `count` slots on `pool`.
///
/// The slots are cut into disjoint `chunk_size` ranges, one pool job each.
/// A job owns its range outright and hands it back when filled, so workers
/// never share a slot. Resolves once every range is back (or a job is
/// known lost), together with the number of workers that could take part.
pub(crate) async fn generate_batch(
    pool: &WorkerPool,
    source: &Arc<NumberSource>,
    count: usize,
    chunk_size: usize,
) -> Result<(Vec<NewPhone>, usize), GenerateError> {
    let chunk_size = chunk_size.max(1);
    let chunks = count.div_ceil(chunk_size);
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Vec<NewPhone>)>();

    for chunk in 0..chunks {
        let start = chunk * chunk_size;
        let len = chunk_size.min(count - start);
        let source = source.clone();
        let tx = tx.clone();
        pool.execute(move || {
            let mut slots = vec![NewPhone::default(); len];
            source.fill(start, &mut slots);
            let _ = tx.send((chunk, slots));
        })?;
    }
    // The channel closes once the last job has replied or been dropped.
    drop(tx);

    let mut parts: Vec<Option<Vec<NewPhone>>> = vec![None; chunks];
    while let Some((chunk, slots)) = rx.recv().await {
        parts[chunk] = Some(slots);
    }

    let mut batch = Vec::with_capacity(count);
    for (chunk, part) in parts.into_iter().enumerate() {
        let part = part.ok_or_else(|| GenerateError::Worker(format!("chunk {chunk} was lost")))?;
        batch.extend(part);
    }
    if batch.len() != count {
        return Err(GenerateError::Worker(format!(
            "filled {} of {count} slots",
            batch.len()
        )));
    }

    Ok((batch, pool.size().min(chunks)))
}
