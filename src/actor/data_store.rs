//! `DataStoreActor`: owns per-serial history and a monotonic processed counter.
//! Single consumer task, no mutex — state is only ever touched from inside the loop.

use super::ActorHandle;
use crate::record::{SensorRecord, SensorType};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsResult {
    pub count: usize,
    pub temperature: f64,
    pub humidity: f64,
    pub battery_level: f64,
}

pub enum DataStoreMsg {
    Ingest(SensorRecord),
    Analyze { sensor_type: SensorType, reply: oneshot::Sender<StatsResult> },
    Status { reply: oneshot::Sender<(u64, usize)> },
    Shutdown,
}

struct DataStoreState {
    storage: HashMap<String, Vec<SensorRecord>>,
    processed: u64,
}

impl DataStoreState {
    fn new() -> Self {
        DataStoreState { storage: HashMap::new(), processed: 0 }
    }

    fn ingest(&mut self, record: SensorRecord) {
        if record.serial.is_empty() {
            return;
        }
        self.storage.entry(record.serial.clone()).or_default().push(record);
        self.processed += 1;
    }

    /// `Count` is the number of distinct sensors whose history contains a record of
    /// `sensor_type`, not the number of matching records; the three means are taken
    /// across every record belonging to those sensors, mirroring `AggregatedStats`.
    fn analyze(&self, sensor_type: SensorType) -> StatsResult {
        let matching: Vec<&Vec<SensorRecord>> = self
            .storage
            .values()
            .filter(|history| history.iter().any(|r| r.sensor_type == sensor_type))
            .collect();

        let records: Vec<&SensorRecord> = matching.iter().flat_map(|history| history.iter()).collect();

        StatsResult {
            count: matching.len(),
            temperature: mean(records.iter().map(|r| r.temperature).filter(|t| *t > 0.0)),
            humidity: mean(records.iter().map(|r| r.humidity).filter(|h| *h > 0.0)),
            battery_level: mean(records.iter().filter_map(|r| r.battery_percent())),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Spawns the actor task and returns a handle plus its join handle (awaited on shutdown).
pub fn spawn(mailbox_bound: usize) -> (ActorHandle<DataStoreMsg>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(mailbox_bound);
    let handle = ActorHandle::new(tx);

    let join = tokio::spawn(async move {
        let mut state = DataStoreState::new();
        while let Some(msg) = rx.recv().await {
            match msg {
                DataStoreMsg::Ingest(record) => {
                    tracing::debug!(serial = %record.serial, "data store ingest");
                    state.ingest(record);
                }
                DataStoreMsg::Analyze { sensor_type, reply } => {
                    let _ = reply.send(state.analyze(sensor_type));
                }
                DataStoreMsg::Status { reply } => {
                    let _ = reply.send((state.processed, state.storage.len()));
                }
                DataStoreMsg::Shutdown => break,
            }
        }
    });

    (handle, join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::query;

    fn temp_record(serial: &str, temperature: f64) -> SensorRecord {
        SensorRecord { serial: serial.into(), sensor_type: SensorType::Temp, temperature, ..Default::default() }
    }

    #[tokio::test]
    async fn ingests_preserve_fifo_order() {
        let (handle, join) = spawn(16);
        for i in 0..5 {
            handle.send_msg(DataStoreMsg::Ingest(temp_record("111", 20.0 + i as f64))).await.unwrap();
        }
        let (rtx, rrx) = oneshot::channel();
        handle.send_msg(DataStoreMsg::Status { reply: rtx }).await.unwrap();
        let (processed, active) = rrx.await.unwrap();
        assert_eq!(processed, 5);
        assert_eq!(active, 1);

        handle.send_msg(DataStoreMsg::Shutdown).await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn analyze_reports_stats_for_type() {
        let (handle, join) = spawn(16);
        handle.send_msg(DataStoreMsg::Ingest(temp_record("111", 24.5))).await.unwrap();
        handle.send_msg(DataStoreMsg::Ingest(temp_record("333", 31.5))).await.unwrap();

        let (tx, rx) = oneshot::channel();
        let stats = query(
            handle.send_msg(DataStoreMsg::Analyze { sensor_type: SensorType::Temp, reply: tx }),
            rx,
            std::time::Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.temperature, 28.0);

        handle.send_msg(DataStoreMsg::Shutdown).await.unwrap();
        join.await.unwrap();
    }

    /// `Count` tracks distinct sensors, not records: two temp readings from the same
    /// serial must still report `count: 1`.
    #[tokio::test]
    async fn analyze_counts_distinct_sensors_not_records() {
        let (handle, join) = spawn(16);
        handle.send_msg(DataStoreMsg::Ingest(temp_record("111", 20.0))).await.unwrap();
        handle.send_msg(DataStoreMsg::Ingest(temp_record("111", 30.0))).await.unwrap();

        let (tx, rx) = oneshot::channel();
        let stats = query(
            handle.send_msg(DataStoreMsg::Analyze { sensor_type: SensorType::Temp, reply: tx }),
            rx,
            std::time::Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.temperature, 25.0);

        handle.send_msg(DataStoreMsg::Shutdown).await.unwrap();
        join.await.unwrap();
    }

    /// A matching sensor's humidity/battery readings contribute to the reply even
    /// though the query was filtered by temperature type.
    #[tokio::test]
    async fn analyze_reports_all_three_means_regardless_of_query_type() {
        let (handle, join) = spawn(16);
        let record = SensorRecord {
            serial: "111".into(),
            sensor_type: SensorType::Temp,
            temperature: 24.0,
            humidity: 40.0,
            battery_level: 50.0,
            battery_max: 100.0,
            ..Default::default()
        };
        handle.send_msg(DataStoreMsg::Ingest(record)).await.unwrap();

        let (tx, rx) = oneshot::channel();
        let stats = query(
            handle.send_msg(DataStoreMsg::Analyze { sensor_type: SensorType::Temp, reply: tx }),
            rx,
            std::time::Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(stats.temperature, 24.0);
        assert_eq!(stats.humidity, 40.0);
        assert_eq!(stats.battery_level, 50.0);

        handle.send_msg(DataStoreMsg::Shutdown).await.unwrap();
        join.await.unwrap();
    }
}
