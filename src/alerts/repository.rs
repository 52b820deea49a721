use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::alerts::model::{AlertCondition, UserAlert};

/// Query/mutation surface of the external alert store.
///
/// The monitor only ever reads active alerts and, on trigger, appends a
/// history record and flips the alert inactive. No transactional coupling
/// between the two mutations is promised.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn fetch_active(&self) -> anyhow::Result<Vec<UserAlert>>;

    /// Mark an alert inactive after it has fired.
    async fn deactivate(&self, id: &Uuid) -> anyhow::Result<()>;

    /// Append a record of a fired alert.
    async fn insert_history(
        &self,
        alert: &UserAlert,
        triggered_price: f64,
        triggered_ms: u64,
    ) -> anyhow::Result<()>;
}

/// SQLx-backed implementation of AlertRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxAlertRepository {
    pool: AnyPool,
}

impl SqlxAlertRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for SqlxAlertRepository {
    async fn fetch_active(&self) -> anyhow::Result<Vec<UserAlert>> {
        let rows = sqlx::query(
            r#"
SELECT
  alert_id, asset, target_price, condition,
  CASE WHEN is_active THEN 1 ELSE 0 END AS active_i64
FROM alerts
WHERE is_active = TRUE;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_alert(&r) {
                Ok(a) => out.push(a),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the pass
                    tracing::warn!(error = %e, "skipping malformed alert row");
                }
            }
        }

        Ok(out)
    }

    async fn deactivate(&self, id: &Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
UPDATE alerts
SET is_active = FALSE
WHERE alert_id = ?;
"#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_history(
        &self,
        alert: &UserAlert,
        triggered_price: f64,
        triggered_ms: u64,
    ) -> anyhow::Result<()> {
        let triggered_ms = i64::try_from(triggered_ms).context("triggered_ms overflows i64")?;

        sqlx::query(
            r#"
INSERT INTO alert_history
  (history_id, alert_id, asset, target_price, triggered_price, triggered_ms)
VALUES (?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(alert.id.to_string())
        .bind(&alert.asset)
        .bind(alert.target_price)
        .bind(triggered_price)
        .bind(triggered_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_alert(r: &sqlx::any::AnyRow) -> anyhow::Result<UserAlert> {
    let id_str: String = r.get("alert_id");
    let id = Uuid::parse_str(&id_str).context("invalid alert_id")?;

    let cond_str: String = r.get("condition");
    let condition =
        AlertCondition::parse(&cond_str).ok_or_else(|| anyhow!("invalid condition: {cond_str}"))?;

    let active_i64: i64 = r.get("active_i64");

    Ok(UserAlert {
        id,
        asset: r.get("asset"),
        target_price: r.get("target_price"),
        condition,
        is_active: active_i64 == 1,
    })
}
