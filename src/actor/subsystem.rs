//! `ActorSubsystem`: the coordinator-facing facade over the data-store and alert
//! actors. `Send` fans a record to both mailboxes without waiting past enqueue; every
//! query is request-reply under the configured request-timeout deadline enforced by
//! `actor::query`.

use super::alert::{self, AlertMsg, AlertThresholds};
use super::data_store::{self, DataStoreMsg, StatsResult};
use super::{query, ActorHandle};
use crate::errors::Result;
use crate::record::{SensorRecord, SensorType};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct ActorSubsystem {
    data_store: ActorHandle<DataStoreMsg>,
    alert: ActorHandle<AlertMsg>,
    data_store_join: JoinHandle<()>,
    alert_join: JoinHandle<()>,
    request_timeout: Duration,
}

impl ActorSubsystem {
    pub fn spawn(mailbox_bound: usize, thresholds: AlertThresholds, request_timeout: Duration) -> Self {
        let (data_store, data_store_join) = data_store::spawn(mailbox_bound);
        let (alert, alert_join) = alert::spawn(mailbox_bound, thresholds);
        ActorSubsystem { data_store, alert, data_store_join, alert_join, request_timeout }
    }

    pub async fn send(&self, record: SensorRecord) -> Result<()> {
        self.data_store.send_msg(DataStoreMsg::Ingest(record.clone())).await?;
        self.alert.send_msg(AlertMsg::Ingest(record)).await
    }

    pub async fn analyze_type(&self, sensor_type: SensorType) -> Result<StatsResult> {
        let (tx, rx) = oneshot::channel();
        query(
            self.data_store.send_msg(DataStoreMsg::Analyze { sensor_type, reply: tx }),
            rx,
            self.request_timeout,
        )
        .await
    }

    pub async fn get_processed(&self) -> Result<(u64, usize)> {
        let (tx, rx) = oneshot::channel();
        query(self.data_store.send_msg(DataStoreMsg::Status { reply: tx }), rx, self.request_timeout).await
    }

    pub async fn get_alerts(&self) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        query(self.alert.send_msg(AlertMsg::Status { reply: tx }), rx, self.request_timeout).await
    }

    pub async fn shutdown(self) -> Result<()> {
        self.data_store.send_msg(DataStoreMsg::Shutdown).await?;
        self.alert.send_msg(AlertMsg::Shutdown).await?;
        let _ = self.data_store_join.await;
        let _ = self.alert_join.await;
        Ok(())
    }
}
