//! Database helpers for reset codes and account credentials.
//!
//! Each operation that touches a reset code runs inside a single write
//! transaction scoped to that email's rows, so issuance and consumption stay
//! atomic with respect to each other. Correctness leans on Postgres
//! transactional guarantees; there is no application-level locking.

use anyhow::{Context, Result};
use serde_json::json;
use sqlx::PgPool;
use tracing::Instrument;

/// Does an account exist for this (already normalized) email?
pub(super) async fn user_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let query = "SELECT 1 AS present FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up account by email")?;
    Ok(row.is_some())
}

/// Persist a fresh reset code for the email and enqueue its delivery.
///
/// Prior codes for the email are superseded in the same transaction, so at
/// most one code is active per email at any time, and a code only exists in
/// the outbox if it also exists in the reset table.
pub(super) async fn issue_otp(pool: &PgPool, email: &str, otp: &str) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin reset-code transaction")?;

    let query = "DELETE FROM password_reset_otps WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to supersede prior reset codes")?;

    let query = r"
        INSERT INTO password_reset_otps (email, otp, created_at)
        VALUES ($1, $2, NOW())
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(otp)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert reset code")?;

    enqueue_otp_email(&mut tx, email, otp).await?;

    tx.commit()
        .await
        .context("failed to commit reset-code transaction")?;

    Ok(())
}

/// Queue the reset-code email in the outbox, inside the caller's transaction.
async fn enqueue_otp_email(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &str,
    otp: &str,
) -> Result<()> {
    let payload = json!({
        "email": email,
        "otp": otp,
    });
    let payload_text =
        serde_json::to_string(&payload).context("failed to serialize email payload")?;

    let query = r"
        INSERT INTO email_outbox (to_email, template, payload_json)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind("password_reset_otp")
        .bind(payload_text)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to enqueue reset-code email")?;

    Ok(())
}

/// Consume a matching, fresh reset code and apply the new password hash.
///
/// Returns `Ok(false)` when no row matches `(email, otp)` within the
/// freshness window — the caller cannot tell a wrong code from an expired
/// one. On a match, the password update and the deletion of every code for
/// the email commit together; if the update fails, the rollback leaves the
/// code in place so the user can retry.
pub(super) async fn consume_otp_and_set_password(
    pool: &PgPool,
    email: &str,
    otp: &str,
    ttl_seconds: i64,
    password_hash: &str,
) -> Result<bool> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin reset transaction")?;

    // Lock the matching row so a concurrent issue/verify for the same email
    // serializes against this consumption.
    let query = r"
        SELECT id FROM password_reset_otps
        WHERE email = $1
          AND otp = $2
          AND created_at >= NOW() - ($3 * INTERVAL '1 second')
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(otp)
        .bind(ttl_seconds)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to look up reset code")?;

    if row.is_none() {
        let _ = tx.rollback().await;
        return Ok(false);
    }

    let query = "UPDATE users SET password_hash = $2 WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let updated = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    if updated.rows_affected() == 0 {
        // Account vanished between issuance and reset; keep the code.
        let _ = tx.rollback().await;
        return Ok(false);
    }

    let query = "DELETE FROM password_reset_otps WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume reset codes")?;

    tx.commit()
        .await
        .context("failed to commit reset transaction")?;

    Ok(true)
}
