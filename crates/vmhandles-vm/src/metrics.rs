use serde::Serialize;
use vmhandles_utils::sync::{AtomicU64, Ordering};

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub operation_table: CacheStat,
    pub conversion_plan: CacheStat,
    pub as_type_memo: CacheStat,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        writeln!(f, "  Operation Tables:   {}", self.operation_table)?;
        writeln!(f, "  Conversion Plans:   {}", self.conversion_plan)?;
        writeln!(f, "  asType Memo:        {}", self.as_type_memo)?;
        Ok(())
    }
}

impl std::fmt::Display for CacheStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {:>8}, misses: {:>8}, hit_rate: {:>6.2}%, size: {:>8}",
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.size
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheSizes {
    pub operation_table_size: usize,
    pub conversion_plan_size: usize,
}

/// Cache hit/miss counters.
///
/// Counters are independent and use `Ordering::Relaxed`.
#[derive(Debug, Default)]
pub struct HandleMetrics {
    enabled: bool,
    pub operation_table_hits: AtomicU64,
    pub operation_table_misses: AtomicU64,
    pub conversion_plan_hits: AtomicU64,
    pub conversion_plan_misses: AtomicU64,
    pub as_type_memo_hits: AtomicU64,
    pub as_type_memo_misses: AtomicU64,
}

impl HandleMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    #[inline]
    fn bump(&self, counter: &AtomicU64) {
        if self.enabled {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_operation_table_hit(&self) {
        self.bump(&self.operation_table_hits);
    }

    #[inline]
    pub fn record_operation_table_miss(&self) {
        self.bump(&self.operation_table_misses);
    }

    #[inline]
    pub fn record_conversion_plan_hit(&self) {
        self.bump(&self.conversion_plan_hits);
    }

    #[inline]
    pub fn record_conversion_plan_miss(&self) {
        self.bump(&self.conversion_plan_misses);
    }

    #[inline]
    pub fn record_as_type_memo_hit(&self) {
        self.bump(&self.as_type_memo_hits);
    }

    #[inline]
    pub fn record_as_type_memo_miss(&self) {
        self.bump(&self.as_type_memo_misses);
    }

    pub fn cache_statistics(&self, sizes: CacheSizes) -> CacheStats {
        CacheStats {
            operation_table: self.stat(
                self.operation_table_hits.load(Ordering::Relaxed),
                self.operation_table_misses.load(Ordering::Relaxed),
                sizes.operation_table_size,
            ),
            conversion_plan: self.stat(
                self.conversion_plan_hits.load(Ordering::Relaxed),
                self.conversion_plan_misses.load(Ordering::Relaxed),
                sizes.conversion_plan_size,
            ),
            as_type_memo: self.stat(
                self.as_type_memo_hits.load(Ordering::Relaxed),
                self.as_type_memo_misses.load(Ordering::Relaxed),
                0,
            ),
        }
    }

    fn stat(&self, hits: u64, misses: u64, size: usize) -> CacheStat {
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        CacheStat {
            hits,
            misses,
            hit_rate,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_metrics_stay_zero() {
        let m = HandleMetrics::new(false);
        m.record_operation_table_hit();
        m.record_conversion_plan_miss();
        let stats = m.cache_statistics(CacheSizes::default());
        assert_eq!(stats.operation_table.hits, 0);
        assert_eq!(stats.conversion_plan.misses, 0);
    }

    #[test]
    fn hit_rate() {
        let m = HandleMetrics::new(true);
        for _ in 0..3 {
            m.record_conversion_plan_hit();
        }
        m.record_conversion_plan_miss();
        let stats = m.cache_statistics(CacheSizes {
            operation_table_size: 2,
            conversion_plan_size: 1,
        });
        assert_eq!(stats.conversion_plan.hits, 3);
        assert!((stats.conversion_plan.hit_rate - 0.75).abs() < f64::EPSILON);
        assert_eq!(stats.operation_table.size, 2);
        assert!(stats.to_string().contains("Conversion Plans"));
    }
}
