//! JobDeduplicationService: bijection between in-flight job ids and
//! idempotency keys, guaranteeing at-most-one in-flight execution per key.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::model::JobId;

#[derive(Default)]
struct DedupMaps {
    key_to_job: HashMap<String, JobId>,
    job_to_key: HashMap<JobId, String>,
}

/// Maintains `idempotencyKey <-> jobId` as one atomic transition: either both
/// maps update together or neither does. A job without an idempotency key is
/// never registered — dedup is opt-in.
pub struct JobDeduplicationService {
    maps: Mutex<DedupMaps>,
}

impl Default for JobDeduplicationService {
    fn default() -> Self {
        Self::new()
    }
}

impl JobDeduplicationService {
    pub fn new() -> Self {
        Self {
            maps: Mutex::new(DedupMaps::default()),
        }
    }

    /// Atomically inserts both directions iff `key` is free. Returns false
    /// when another in-flight job already holds `key`.
    ///
    /// If `job_id` was already registered under a different key (not expected
    /// in normal flow), the stale mapping is removed first to preserve the
    /// bijection.
    pub fn try_reserve(&self, job_id: JobId, key: &str) -> bool {
        let mut maps = self.maps.lock();

        if let Some(existing) = maps.key_to_job.get(key) {
            if *existing != job_id {
                return false;
            }
            // Already reserved by this exact job; idempotent success.
            return true;
        }

        if let Some(old_key) = maps.job_to_key.remove(&job_id) {
            maps.key_to_job.remove(&old_key);
        }

        maps.key_to_job.insert(key.to_string(), job_id);
        maps.job_to_key.insert(job_id, key.to_string());
        true
    }

    /// Removes both directions for `job_id`; no-op if absent.
    pub fn release(&self, job_id: JobId) {
        let mut maps = self.maps.lock();
        if let Some(key) = maps.job_to_key.remove(&job_id) {
            maps.key_to_job.remove(&key);
        }
    }

    /// Looks up the in-flight job id currently holding `key`, if any.
    pub fn lookup_in_flight(&self, key: &str) -> Option<JobId> {
        self.maps.lock().key_to_job.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_and_release_round_trip() {
        let dedup = JobDeduplicationService::new();
        let job = JobId::new();
        assert!(dedup.try_reserve(job, "K"));
        assert_eq!(dedup.lookup_in_flight("K"), Some(job));
        dedup.release(job);
        assert_eq!(dedup.lookup_in_flight("K"), None);
    }

    #[test]
    fn second_reservation_for_same_key_is_rejected() {
        let dedup = JobDeduplicationService::new();
        let a = JobId::new();
        let b = JobId::new();
        assert!(dedup.try_reserve(a, "K"));
        assert!(!dedup.try_reserve(b, "K"));
        assert_eq!(dedup.lookup_in_flight("K"), Some(a));
    }

    #[test]
    fn release_is_noop_for_absent_job() {
        let dedup = JobDeduplicationService::new();
        dedup.release(JobId::new());
    }

    #[test]
    fn reservation_frees_up_after_release() {
        let dedup = JobDeduplicationService::new();
        let a = JobId::new();
        let b = JobId::new();
        assert!(dedup.try_reserve(a, "K"));
        dedup.release(a);
        assert!(dedup.try_reserve(b, "K"));
    }

    #[test]
    fn at_most_one_in_flight_under_concurrent_attempts() {
        use std::sync::Arc;
        let dedup = Arc::new(JobDeduplicationService::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let dedup = dedup.clone();
            handles.push(std::thread::spawn(move || {
                let job = JobId::new();
                dedup.try_reserve(job, "K")
            }));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
    }
}
