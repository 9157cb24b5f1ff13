// Decision sink trait: where the service hands off each decision.
//
// Implementors: SqliteDatabase. Whatever sits behind this trait, the
// decision service logs its failures and carries on; a broken sink never
// changes the outcome returned to the caller.

use async_trait::async_trait;

use super::models::DetectionRecord;
use crate::error::Result;

#[async_trait]
pub trait DecisionSink: Send + Sync {
    /// Persist one decision.
    async fn record(&self, record: &DetectionRecord) -> Result<()>;
}
