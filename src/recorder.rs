//! Shared append-only sample store.

use crate::sample::Sample;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle over the run's sample log.
///
/// Every clone appends into the same log. Lock poisoning is ignored: a
/// panicking writer cannot leave a half-written `Vec` behind, so the data is
/// still consistent.
#[derive(Debug, Clone, Default)]
pub struct SampleRecorder {
    samples: Arc<Mutex<Vec<Sample>>>,
}

impl SampleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample.
    pub fn record(&self, sample: Sample) {
        self.lock().push(sample);
    }

    /// Copy of every sample recorded so far, in completion order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sample>> {
        self.samples.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::HttpMethod;
    use chrono::Utc;
    use std::time::Duration;

    fn sample(i: usize) -> Sample {
        Sample::new(
            Utc::now(),
            HttpMethod::Get,
            format!("/produtos?page={}", i),
            format!("Page {}", i),
            Duration::from_millis(i as u64),
            Some(200),
        )
    }

    #[test]
    fn should_keep_every_sample_when_written_from_many_threads() {
        let recorder = SampleRecorder::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let recorder = recorder.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        recorder.record(sample(t * 1000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.len(), 2000);

        let mut endpoints: Vec<_> = snapshot.iter().map(|s| s.endpoint.clone()).collect();
        endpoints.sort();
        endpoints.dedup();
        assert_eq!(endpoints.len(), 2000, "no sample may be duplicated");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_keep_every_sample_when_written_from_tasks() {
        let recorder = SampleRecorder::new();
        let mut set = tokio::task::JoinSet::new();
        for t in 0..50 {
            let recorder = recorder.clone();
            set.spawn(async move {
                for i in 0..20 {
                    recorder.record(sample(t * 100 + i));
                    tokio::task::yield_now().await;
                }
            });
        }
        while set.join_next().await.is_some() {}

        assert_eq!(recorder.len(), 1000);
    }

    #[test]
    fn should_start_empty() {
        let recorder = SampleRecorder::new();
        assert!(recorder.is_empty());
        assert!(recorder.snapshot().is_empty());
    }

    #[test]
    fn should_preserve_insertion_order_in_snapshot() {
        let recorder = SampleRecorder::new();
        recorder.record(sample(1));
        recorder.record(sample(2));
        let snap = recorder.snapshot();
        assert_eq!(snap[0].endpoint, "/produtos?page=1");
        assert_eq!(snap[1].endpoint, "/produtos?page=2");
    }
}
