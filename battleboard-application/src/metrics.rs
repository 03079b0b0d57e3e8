use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    kill_polls: AtomicU64,
    kill_poll_errors: AtomicU64,
    kills_fetched: AtomicU64,
    kills_saved: AtomicU64,
    kills_skipped: AtomicU64,
    kills_errored: AtomicU64,
    kills_cleaned: AtomicU64,
    battles_discovered: AtomicU64,
    battles_dispatched: AtomicU64,
    battles_processed: AtomicU64,
    battles_duplicate: AtomicU64,
    battles_failed: AtomicU64,
}

impl Metrics {
    pub fn record_poll(&self, fetched: usize) {
        self.kill_polls.fetch_add(1, Ordering::Relaxed);
        self.kills_fetched.fetch_add(fetched as u64, Ordering::Relaxed);
    }

    pub fn record_poll_error(&self) {
        self.kill_poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save(&self, saved: usize, skipped: usize, errored: usize) {
        self.kills_saved.fetch_add(saved as u64, Ordering::Relaxed);
        self.kills_skipped.fetch_add(skipped as u64, Ordering::Relaxed);
        self.kills_errored.fetch_add(errored as u64, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self, deleted: usize) {
        self.kills_cleaned.fetch_add(deleted as u64, Ordering::Relaxed);
    }

    pub fn record_discovered(&self, count: usize) {
        self.battles_discovered.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self, count: usize) {
        self.battles_dispatched.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_battle_processed(&self) {
        self.battles_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_battle_duplicate(&self) {
        self.battles_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_battle_failed(&self) {
        self.battles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn battles_processed(&self) -> u64 {
        self.battles_processed.load(Ordering::Relaxed)
    }

    pub fn battles_failed(&self) -> u64 {
        self.battles_failed.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let counters = [
            ("battleboard_kill_polls_total", &self.kill_polls),
            ("battleboard_kill_poll_errors_total", &self.kill_poll_errors),
            ("battleboard_kills_fetched_total", &self.kills_fetched),
            ("battleboard_kills_saved_total", &self.kills_saved),
            ("battleboard_kills_skipped_total", &self.kills_skipped),
            ("battleboard_kills_errored_total", &self.kills_errored),
            ("battleboard_kills_cleaned_total", &self.kills_cleaned),
            ("battleboard_battles_discovered_total", &self.battles_discovered),
            ("battleboard_battles_dispatched_total", &self.battles_dispatched),
            ("battleboard_battles_processed_total", &self.battles_processed),
            ("battleboard_battles_duplicate_total", &self.battles_duplicate),
            ("battleboard_battles_failed_total", &self.battles_failed),
        ];

        let mut out = String::new();
        for (name, counter) in counters {
            out.push_str(&format!(
                "# TYPE {name} counter\n{name} {}\n",
                counter.load(Ordering::Relaxed)
            ));
        }
        out
    }
}
