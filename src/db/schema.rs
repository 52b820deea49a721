use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Alerts
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS alerts (
  alert_id TEXT PRIMARY KEY,
  asset TEXT NOT NULL,
  target_price REAL NOT NULL,
  condition TEXT NOT NULL CHECK (condition IN ('gte','lte')),
  is_active INTEGER NOT NULL CHECK (is_active IN (0,1))
);
"#,
    )
    .execute(pool)
    .await?;

    // Trigger history
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS alert_history (
  history_id TEXT PRIMARY KEY,
  alert_id TEXT NOT NULL,
  asset TEXT NOT NULL,
  target_price REAL NOT NULL,
  triggered_price REAL NOT NULL,
  triggered_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_alerts_active ON alerts(is_active);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_alert_history_alert ON alert_history(alert_id);"#)
        .execute(pool)
        .await?;

    Ok(())
}
