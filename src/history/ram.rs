//! In-process buffering history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::sample::{Sample, TypeName};
use crate::storage::Result;

use super::History;

#[derive(Default)]
struct Buffer {
    samples: Vec<Sample>,
    /// Index of the first sample not yet returned by `retrieve_new`.
    retrieved: usize,
}

/// History that keeps every sample in memory, in arrival order.
///
/// Reads return samples ordered by timestamp.
#[derive(Default)]
pub struct RamHistory {
    buffer: RwLock<Buffer>,
}

impl RamHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl History for RamHistory {
    async fn record(&self, sample: Sample) -> Result<()> {
        self.buffer.write().await.samples.push(sample);
        Ok(())
    }

    async fn retrieve_range(
        &self,
        type_name: &TypeName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let buffer = self.buffer.read().await;
        let mut samples: Vec<Sample> = buffer
            .samples
            .iter()
            .filter(|s| s.type_name() == type_name)
            .filter(|s| s.timestamp() >= from && s.timestamp() < to)
            .cloned()
            .collect();
        samples.sort_by_key(Sample::timestamp);
        Ok(samples)
    }

    async fn retrieve_new(&self) -> Result<Vec<Sample>> {
        let mut buffer = self.buffer.write().await;
        let start = buffer.retrieved;
        buffer.retrieved = buffer.samples.len();
        let mut fresh = buffer.samples[start..].to_vec();
        // Stable, so equal timestamps keep arrival order.
        fresh.sort_by_key(Sample::timestamp);
        Ok(fresh)
    }

    async fn size(&self) -> usize {
        self.buffer.read().await.samples.len()
    }

    /// `None` drops everything; `Some(n)` drops the oldest `n` samples.
    async fn clear(&self, start: Option<usize>) {
        let mut buffer = self.buffer.write().await;
        match start {
            None => {
                buffer.samples.clear();
                buffer.retrieved = 0;
            }
            Some(n) => {
                let n = n.min(buffer.samples.len());
                buffer.samples.drain(..n);
                buffer.retrieved = buffer.retrieved.saturating_sub(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    async fn filled(count: i64) -> RamHistory {
        let history = RamHistory::new();
        for i in 0..count {
            history
                .record(Sample::new("Temp", at(i), json!(i)))
                .await
                .unwrap();
        }
        history
    }

    #[tokio::test]
    async fn test_retrieve_new_returns_only_unseen() {
        let history = filled(2).await;
        assert_eq!(history.retrieve_new().await.unwrap().len(), 2);
        assert!(history.retrieve_new().await.unwrap().is_empty());

        history
            .record(Sample::new("Temp", at(5), json!(5)))
            .await
            .unwrap();
        let fresh = history.retrieve_new().await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].value(), &json!(5));
    }

    #[tokio::test]
    async fn test_retrieve_new_orders_by_timestamp() {
        let history = RamHistory::new();
        for (name, secs) in [("Temp", 3), ("Pressure", 2), ("Temp", 1)] {
            history
                .record(Sample::new(name, at(secs), json!(secs)))
                .await
                .unwrap();
        }

        let samples = history.retrieve_new().await.unwrap();

        let temp: Vec<_> = samples
            .iter()
            .filter(|s| s.type_name().as_str() == "Temp")
            .map(Sample::timestamp)
            .collect();
        assert_eq!(temp, vec![at(1), at(3)]);
        assert_eq!(samples.len(), 3);
    }

    #[tokio::test]
    async fn test_retrieve_new_keeps_arrival_order_for_equal_timestamps() {
        let history = RamHistory::new();
        for value in ["first", "second"] {
            history
                .record(Sample::new("Temp", at(1), json!(value)))
                .await
                .unwrap();
        }

        let samples = history.retrieve_new().await.unwrap();

        let values: Vec<_> = samples.iter().map(|s| s.value().clone()).collect();
        assert_eq!(values, vec![json!("first"), json!("second")]);
    }

    #[tokio::test]
    async fn test_size_counts_buffered_samples() {
        let history = filled(3).await;
        assert_eq!(history.size().await, 3);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let history = filled(3).await;
        history.clear(None).await;
        assert_eq!(history.size().await, 0);
        assert!(history.retrieve_new().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_prefix_shifts_read_position() {
        let history = filled(4).await;
        history.retrieve_new().await.unwrap();
        history
            .record(Sample::new("Temp", at(10), json!(10)))
            .await
            .unwrap();

        history.clear(Some(3)).await;

        assert_eq!(history.size().await, 2);
        let fresh = history.retrieve_new().await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].value(), &json!(10));
    }

    #[tokio::test]
    async fn test_clear_beyond_len_empties() {
        let history = filled(2).await;
        history.clear(Some(10)).await;
        assert_eq!(history.size().await, 0);
    }

    #[tokio::test]
    async fn test_retrieve_range_filters_and_sorts() {
        let history = RamHistory::new();
        for (name, secs) in [("Temp", 3), ("Pressure", 2), ("Temp", 1)] {
            history
                .record(Sample::new(name, at(secs), json!(secs)))
                .await
                .unwrap();
        }

        let samples = history
            .retrieve_range(&TypeName::from("Temp"), at(0), at(3))
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp(), at(1));

        let samples = history
            .retrieve_range(&TypeName::from("Temp"), at(0), at(4))
            .await
            .unwrap();
        let times: Vec<_> = samples.iter().map(Sample::timestamp).collect();
        assert_eq!(times, vec![at(1), at(3)]);
    }
}
