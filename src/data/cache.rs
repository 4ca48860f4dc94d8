use super::connectors::DataRequest;
use super::series::PriceSeries;
use super::source::MarketDataSource;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Wraps another source and reuses fetched series until they are older than `ttl`.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    data: Mutex<HashMap<DataRequest, (Instant, PriceSeries)>>,
    capacity: usize,
}

impl<S: MarketDataSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            data: Mutex::new(HashMap::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &DataRequest) -> Option<PriceSeries> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, series)| series.clone())
    }

    fn set(&self, key: DataRequest, value: PriceSeries) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        if data.len() >= self.capacity {
            data.clear();
        }
        data.insert(key, (Instant::now(), value));
    }
}

impl<S: MarketDataSource> MarketDataSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, request: &DataRequest) -> Result<PriceSeries> {
        if let Some(series) = self.get(request) {
            log::debug!("Cache hit for {} {}", request.symbol, request.interval);
            return Ok(series);
        }
        let series = self.inner.fetch(request)?;
        self.set(request.clone(), series.clone());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SeriesOptions;
    use crate::types::Candle;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl MarketDataSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(&self, request: &DataRequest) -> Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let candle = Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 0.0,
            };
            PriceSeries::new(request.symbol.clone(), vec![candle], SeriesOptions::default())
        }
    }

    #[test]
    fn fetches_once_within_ttl() {
        let cached = CachedSource::new(
            CountingSource { calls: AtomicUsize::new(0) },
            Duration::from_secs(300),
            8,
        );
        let request = DataRequest::new("BTC", "1h");
        cached.fetch(&request).unwrap();
        cached.fetch(&request).unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn expired_entries_are_refetched() {
        let cached = CachedSource::new(
            CountingSource { calls: AtomicUsize::new(0) },
            Duration::ZERO,
            8,
        );
        let request = DataRequest::new("BTC", "1h");
        cached.fetch(&request).unwrap();
        cached.fetch(&request).unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }
}
