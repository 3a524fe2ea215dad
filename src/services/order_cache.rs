//! 医嘱结果缓存 - 业务能力层
//!
//! 同一病例中，同一类别下完全相同的医嘱文本只请求一次网关，
//! 之后重放第一次的结果。

use std::collections::HashMap;

use crate::models::order::{OrderCategory, OrderKey};

/// 医嘱结果缓存
#[derive(Debug, Clone, Default)]
pub struct OrderCache {
    results: HashMap<OrderKey, String>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: OrderCategory, raw_text: &str) -> Option<&str> {
        self.results
            .get(&OrderKey::new(category, raw_text))
            .map(String::as_str)
    }

    /// 保存结果；已有的键不会被覆盖
    pub fn insert(&mut self, category: OrderCategory, raw_text: &str, result: impl Into<String>) {
        self.results
            .entry(OrderKey::new(category, raw_text))
            .or_insert_with(|| result.into());
    }

    pub fn contains(&self, category: OrderCategory, raw_text: &str) -> bool {
        self.results.contains_key(&OrderKey::new(category, raw_text))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_key_lookup() {
        let mut cache = OrderCache::new();
        cache.insert(OrderCategory::Labs, "CBC", "WBC: 15.2");

        assert_eq!(cache.get(OrderCategory::Labs, "CBC"), Some("WBC: 15.2"));
        assert_eq!(cache.get(OrderCategory::Labs, "cbc"), None);
        assert_eq!(cache.get(OrderCategory::Imaging, "CBC"), None);
    }

    #[test]
    fn test_first_result_wins() {
        let mut cache = OrderCache::new();
        cache.insert(OrderCategory::Imaging, "CXR", "clear");
        cache.insert(OrderCategory::Imaging, "CXR", "consolidation");
        assert_eq!(cache.get(OrderCategory::Imaging, "CXR"), Some("clear"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = OrderCache::new();
        cache.insert(OrderCategory::Management, "Medication: Aspirin", "given");
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(OrderCategory::Management, "Medication: Aspirin"));
    }
}
