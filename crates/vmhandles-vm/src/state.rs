use crate::{
    config::HandleConfig,
    error::HandleError,
    invoke::conversion::ConversionPlan,
    metrics::{CacheSizes, CacheStats, HandleMetrics},
    statics::StaticStorageManager,
    varhandle::table::{OperationTable, TableKey},
};
use dashmap::DashMap;
use vmhandles_types::TypeDescription;
use vmhandles_utils::sync::{Arc, OnceLock};

/// Key of the conversion-plan cache: source type, target type, explicit.
pub type ConversionKey = (TypeDescription, TypeDescription, bool);

/// Process-wide caches shared by every handle.
///
/// Entries are computed outside the map and inserted if absent, so two threads
/// racing on the same key may both compute a value but only the first one to
/// insert is ever observed.
#[derive(Default)]
pub struct GlobalCaches {
    /// Operation tables: (storage shape, element representation, read-only) -> table
    pub operation_tables: DashMap<TableKey, Arc<OperationTable>>,
    /// Conversion plans: (from, to, explicit) -> plan
    pub conversion_plans: DashMap<ConversionKey, Arc<ConversionPlan>>,
}

/// Shared state of the handle runtime.
pub struct SharedGlobalState {
    pub caches: GlobalCaches,
    pub statics: StaticStorageManager,
    pub metrics: HandleMetrics,
    pub config: HandleConfig,
}

impl SharedGlobalState {
    pub fn new(config: HandleConfig) -> Self {
        Self {
            caches: GlobalCaches::default(),
            statics: StaticStorageManager::new(),
            metrics: HandleMetrics::new(config.record_metrics),
            config,
        }
    }

    /// The process-wide instance, configured from the environment on first use.
    pub fn get() -> &'static SharedGlobalState {
        static GLOBAL: OnceLock<SharedGlobalState> = OnceLock::new();
        GLOBAL.get_or_init(|| SharedGlobalState::new(HandleConfig::from_env()))
    }

    pub fn operation_table(&self, key: TableKey) -> Arc<OperationTable> {
        if let Some(table) = self.caches.operation_tables.get(&key) {
            self.metrics.record_operation_table_hit();
            return table.clone();
        }
        self.metrics.record_operation_table_miss();
        let table = Arc::new(OperationTable::build(key));
        tracing::debug!(?key, supported = table.supported_count(), "built operation table");
        self.caches
            .operation_tables
            .entry(key)
            .or_insert(table)
            .clone()
    }

    pub fn conversion_plan(
        &self,
        key: ConversionKey,
        build: impl FnOnce() -> Result<ConversionPlan, HandleError>,
    ) -> Result<Arc<ConversionPlan>, HandleError> {
        if !self.config.cache_conversions {
            return build().map(Arc::new);
        }
        if let Some(plan) = self.caches.conversion_plans.get(&key) {
            self.metrics.record_conversion_plan_hit();
            return Ok(plan.clone());
        }
        self.metrics.record_conversion_plan_miss();
        let plan = Arc::new(build()?);
        tracing::debug!(from = %key.0, to = %key.1, explicit = key.2, plan = ?plan, "planned conversion");
        Ok(self
            .caches
            .conversion_plans
            .entry(key)
            .or_insert(plan)
            .clone())
    }

    pub fn cache_statistics(&self) -> CacheStats {
        self.metrics.cache_statistics(CacheSizes {
            operation_table_size: self.caches.operation_tables.len(),
            conversion_plan_size: self.caches.conversion_plans.len(),
        })
    }
}
