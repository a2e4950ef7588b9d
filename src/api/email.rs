//! Outbound email delivery via a transactional outbox.
//!
//! Handlers never talk to an email provider directly: the reset-code flow
//! inserts a row into `email_outbox` inside the same transaction that
//! persists the code, so a code can only be delivered if it was also
//! recorded. A background worker drains the table in locked batches
//! (`FOR UPDATE SKIP LOCKED`, safe with multiple instances) and hands each
//! row to an [`EmailSender`]. Failures retry with capped exponential backoff
//! and jitter until `max_attempts`, then park as `failed`.
//!
//! The default sender logs instead of sending, which is what local
//! development wants; production plugs a real provider in behind the trait.

use anyhow::{Context, Result};
use rand::Rng;
use sqlx::{PgPool, Row, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// A single queued message.
#[derive(Clone, Debug)]
pub struct OutboundEmail {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

/// Delivery seam between the outbox worker and an email provider.
pub trait EmailSender: Send + Sync {
    /// Deliver the message, or return an error to schedule a retry.
    fn send(&self, message: &OutboundEmail) -> Result<()>;
}

/// Development sender: logs the payload and reports success.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &OutboundEmail) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            payload = %message.payload_json,
            "email outbox send stub"
        );
        Ok(())
    }
}

/// Worker tuning knobs. Values are clamped to sane minimums on the way in.
#[derive(Clone, Copy, Debug)]
pub struct OutboxConfig {
    poll_interval: Duration,
    batch_size: usize,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl OutboxConfig {
    /// Defaults: 5s polls, 10 rows per batch, 5 attempts, 5s–5m backoff.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(mut self, seconds: u64) -> Self {
        self.backoff_base = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn with_backoff_max_seconds(mut self, seconds: u64) -> Self {
        self.backoff_max = Duration::from_secs(seconds.max(1));
        self
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the background task that drains the outbox.
pub fn spawn_outbox_worker(
    pool: PgPool,
    sender: Arc<dyn EmailSender>,
    config: OutboxConfig,
) -> tokio::task::JoinHandle<()> {
    let worker = OutboxWorker {
        pool,
        sender,
        config,
    };
    tokio::spawn(worker.run())
}

struct OutboxWorker {
    pool: PgPool,
    sender: Arc<dyn EmailSender>,
    config: OutboxConfig,
}

impl OutboxWorker {
    async fn run(self) {
        // Backoff between rows is carried in next_attempt_at, so the loop
        // itself polls on a fixed cadence.
        loop {
            if let Err(err) = self.process_batch().await {
                error!("email outbox batch failed: {err:#}");
            }
            sleep(self.config.poll_interval).await;
        }
    }

    async fn process_batch(&self) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start outbox transaction")?;

        let query = r"
            SELECT id, to_email, template, payload_json::text AS payload_json, attempts
            FROM email_outbox
            WHERE status = 'pending'
              AND next_attempt_at <= NOW()
            ORDER BY next_attempt_at ASC, created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(i64::try_from(self.config.batch_size).unwrap_or(1))
            .fetch_all(&mut *tx)
            .instrument(span)
            .await
            .context("failed to load outbox batch")?;

        let row_count = rows.len();
        for row in rows {
            let id: Uuid = row.get("id");
            let attempts = u32::try_from(row.get::<i32, _>("attempts")).unwrap_or(0);
            let message = OutboundEmail {
                to_email: row.get("to_email"),
                template: row.get("template"),
                payload_json: row.get("payload_json"),
            };

            match self.sender.send(&message) {
                Ok(()) => Self::mark_sent(&mut tx, id, attempts).await?,
                Err(err) => self.mark_failed(&mut tx, id, attempts, &err).await?,
            }
        }

        // Commit also when the batch was empty, releasing the row locks.
        tx.commit()
            .await
            .context("failed to commit outbox batch")?;

        Ok(row_count)
    }

    async fn mark_sent(
        tx: &mut Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        attempts: u32,
    ) -> Result<()> {
        let query = r"
            UPDATE email_outbox
            SET status = 'sent',
                attempts = $2,
                last_error = NULL,
                sent_at = NOW()
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(attempt_count(attempts))
            .execute(&mut **tx)
            .instrument(span)
            .await
            .context("failed to mark outbox row sent")?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        tx: &mut Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        attempts: u32,
        cause: &anyhow::Error,
    ) -> Result<()> {
        let next_attempt = attempts.saturating_add(1);

        if next_attempt >= self.config.max_attempts {
            let query = r"
                UPDATE email_outbox
                SET status = 'failed',
                    attempts = $2,
                    last_error = $3
                WHERE id = $1
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "UPDATE",
                db.statement = query
            );
            sqlx::query(query)
                .bind(id)
                .bind(attempt_count(attempts))
                .bind(cause.to_string())
                .execute(&mut **tx)
                .instrument(span)
                .await
                .context("failed to park outbox row as failed")?;
            return Ok(());
        }

        let delay = retry_delay(next_attempt, self.config.backoff_base, self.config.backoff_max);
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let query = r"
            UPDATE email_outbox
            SET status = 'pending',
                attempts = $2,
                last_error = $3,
                next_attempt_at = NOW() + ($4 * INTERVAL '1 millisecond')
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(attempt_count(attempts))
            .bind(cause.to_string())
            .bind(delay_ms)
            .execute(&mut **tx)
            .instrument(span)
            .await
            .context("failed to reschedule outbox row")?;
        Ok(())
    }
}

fn attempt_count(attempts: u32) -> i32 {
    i32::try_from(attempts.saturating_add(1)).unwrap_or(i32::MAX)
}

/// Exponential backoff capped at `max`, with up to 50% random jitter shaved
/// off so parked rows do not thunder back in lockstep.
fn retry_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max).min(max);

    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}
