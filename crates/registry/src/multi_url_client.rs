//! Aggregate client presenting an ordered list of sources as one registry.
//!
//! Single-name lookups and bulk maps deliberately resolve conflicts in
//! opposite directions:
//!
//! - [`StencilClient::get`] returns the hit from the *earliest* source
//!   (`first_match`); later sources only fill gaps.
//! - [`StencilClient::get_all`] and the derived maps overlay every source in
//!   order, so the *latest* source wins a key collision (`overlay`).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use stencil_types::{Descriptor, DescriptorAndTypeName};
use tracing::{debug, warn};

use crate::{DescriptorCacheLoader, StencilClient, StencilConfig, StencilError, UrlStencilClient};

/// [`StencilClient`] over several sources, tried in construction order.
///
/// The member list and the auto-refresh flag are fixed at construction; the
/// aggregate keeps no descriptor data of its own and answers every read from
/// its members.
pub struct MultiUrlStencilClient {
    clients: Vec<Arc<dyn StencilClient>>,
    should_auto_refresh_cache: bool,
}

impl MultiUrlStencilClient {
    /// Build one [`UrlStencilClient`] per URL, preserving order.
    ///
    /// Every member shares `config` and `loader`. Fails with
    /// [`StencilError::NoSources`] when `urls` is empty and with
    /// [`StencilError::InvalidUrl`] for the first URL that cannot be fetched.
    pub fn new<I, S>(urls: I, config: &StencilConfig, loader: Arc<dyn DescriptorCacheLoader>) -> Result<Self, StencilError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let clients = urls
            .into_iter()
            .map(|url| {
                UrlStencilClient::new(url, config, Arc::clone(&loader)).map(|client| Arc::new(client) as Arc<dyn StencilClient>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_clients(clients, config)
    }

    /// Compose already constructed clients, which may themselves be aggregates.
    pub fn from_clients(clients: Vec<Arc<dyn StencilClient>>, config: &StencilConfig) -> Result<Self, StencilError> {
        if clients.is_empty() {
            return Err(StencilError::NoSources);
        }
        debug!(sources = clients.len(), "created multi-source descriptor client");
        Ok(Self {
            clients,
            should_auto_refresh_cache: config.cache_auto_refresh,
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Always `false`; an aggregate has at least one source.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Refresh every member in order and report each outcome.
    pub async fn refresh_members(&self) -> FanOutReport {
        self.fan_out(Lifecycle::Refresh).await
    }

    /// Close every member in order and report each outcome.
    pub async fn close_members(&self) -> FanOutReport {
        self.fan_out(Lifecycle::Close).await
    }

    async fn fan_out(&self, lifecycle: Lifecycle) -> FanOutReport {
        let mut report = FanOutReport::default();
        for (index, client) in self.clients.iter().enumerate() {
            let result = match lifecycle {
                Lifecycle::Refresh => client.refresh().await,
                Lifecycle::Close => client.close().await,
            };
            if let Err(error) = &result {
                warn!(source = index, operation = %lifecycle, %error, "source failed; continuing with remaining sources");
            }
            report.outcomes.push(MemberOutcome { index, result });
        }
        debug!(
            operation = %lifecycle,
            sources = report.len(),
            failed = report.failures().count(),
            "lifecycle fan-out finished"
        );
        report
    }
}

/// Result of a lifecycle call fanned out to every member.
#[derive(Debug, Default)]
pub struct FanOutReport {
    outcomes: Vec<MemberOutcome>,
}

/// Outcome of one member's lifecycle call.
#[derive(Debug)]
pub struct MemberOutcome {
    /// Position of the member in the source list.
    pub index: usize,
    pub result: Result<(), StencilError>,
}

impl FanOutReport {
    pub fn outcomes(&self) -> &[MemberOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &StencilError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|error| (outcome.index, error)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Refresh,
    Close,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Refresh => f.write_str("refresh"),
            Lifecycle::Close => f.write_str("close"),
        }
    }
}

/// First-match-wins lookup: asks each client in order and stops at the
/// first hit.
async fn first_match(clients: &[Arc<dyn StencilClient>], type_name: &str) -> Option<Descriptor> {
    for client in clients {
        if let Some(descriptor) = client.get(type_name).await {
            return Some(descriptor);
        }
    }
    None
}

/// Last-write-wins overlay: later maps overwrite earlier ones key by key.
fn overlay<V>(maps: impl IntoIterator<Item = HashMap<String, V>>) -> HashMap<String, V> {
    let mut merged = HashMap::new();
    for map in maps {
        merged.extend(map);
    }
    merged
}

#[async_trait]
impl StencilClient for MultiUrlStencilClient {
    async fn get(&self, type_name: &str) -> Option<Descriptor> {
        first_match(&self.clients, type_name).await
    }

    async fn get_all(&self) -> HashMap<String, Descriptor> {
        // join_all yields results in input order, so the merge stays ordered.
        overlay(join_all(self.clients.iter().map(|client| client.get_all())).await)
    }

    async fn type_name_to_package_name_map(&self) -> HashMap<String, String> {
        overlay(join_all(self.clients.iter().map(|client| client.type_name_to_package_name_map())).await)
    }

    async fn all_descriptor_and_type_name(&self) -> HashMap<String, DescriptorAndTypeName> {
        overlay(join_all(self.clients.iter().map(|client| client.all_descriptor_and_type_name())).await)
    }

    async fn refresh(&self) -> Result<(), StencilError> {
        self.refresh_members().await;
        Ok(())
    }

    async fn close(&self) -> Result<(), StencilError> {
        self.close_members().await;
        Ok(())
    }

    fn should_auto_refresh_cache(&self) -> bool {
        self.should_auto_refresh_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::DescriptorProto;
    use std::sync::Mutex;
    use stencil_types::DescriptorSet;

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn descriptor(full_name: &str, origin: &str) -> Descriptor {
        Descriptor::new(
            full_name,
            "",
            origin,
            DescriptorProto {
                name: Some(full_name.to_string()),
                ..Default::default()
            },
        )
    }

    /// In-memory source that records every call into a shared log.
    struct FakeSource {
        name: String,
        set: DescriptorSet,
        fail_lifecycle: bool,
        auto_refresh: bool,
        log: CallLog,
    }

    impl FakeSource {
        fn new(name: &str, entries: &[(&str, &Descriptor)], log: &CallLog) -> Self {
            let set = DescriptorSet::from_descriptors(entries.iter().map(|(key, descriptor)| {
                assert_eq!(*key, descriptor.full_name());
                (*descriptor).clone()
            }));
            Self {
                name: name.to_string(),
                set,
                fail_lifecycle: false,
                auto_refresh: false,
                log: Arc::clone(log),
            }
        }

        fn failing(mut self) -> Self {
            self.fail_lifecycle = true;
            self
        }

        fn record(&self, call: &str) {
            self.log.lock().unwrap().push(format!("{}:{call}", self.name));
        }

        fn lifecycle(&self, call: &str) -> Result<(), StencilError> {
            self.record(call);
            if self.fail_lifecycle {
                Err(StencilError::closed(&self.name))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl StencilClient for FakeSource {
        async fn get(&self, type_name: &str) -> Option<Descriptor> {
            self.record("get");
            self.set.get(type_name).cloned()
        }

        async fn get_all(&self) -> HashMap<String, Descriptor> {
            self.set.descriptors().clone()
        }

        async fn type_name_to_package_name_map(&self) -> HashMap<String, String> {
            self.set
                .descriptors()
                .iter()
                .map(|(name, descriptor)| (name.clone(), descriptor.file_name().to_string()))
                .collect()
        }

        async fn all_descriptor_and_type_name(&self) -> HashMap<String, DescriptorAndTypeName> {
            self.set.descriptor_and_type_names()
        }

        async fn refresh(&self) -> Result<(), StencilError> {
            self.lifecycle("refresh")
        }

        async fn close(&self) -> Result<(), StencilError> {
            self.lifecycle("close")
        }

        fn should_auto_refresh_cache(&self) -> bool {
            self.auto_refresh
        }
    }

    fn aggregate(sources: Vec<FakeSource>) -> MultiUrlStencilClient {
        let clients = sources
            .into_iter()
            .map(|source| Arc::new(source) as Arc<dyn StencilClient>)
            .collect();
        MultiUrlStencilClient::from_clients(clients, &StencilConfig::default()).expect("non-empty source list")
    }

    fn calls(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn get_prefers_earliest_source_and_get_all_prefers_latest() {
        let log = CallLog::default();
        let (d0, d1, d2, d3) = (
            descriptor("A", "s0"),
            descriptor("B", "s0"),
            descriptor("B", "s1"),
            descriptor("C", "s1"),
        );
        let client = aggregate(vec![
            FakeSource::new("s0", &[("A", &d0), ("B", &d1)], &log),
            FakeSource::new("s1", &[("B", &d2), ("C", &d3)], &log),
        ]);

        assert_eq!(client.get("B").await, Some(d1.clone()));

        let all = client.get_all().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all["A"], d0);
        assert_eq!(all["B"], d2);
        assert_eq!(all["C"], d3);
    }

    #[tokio::test]
    async fn get_short_circuits_on_first_hit() {
        let log = CallLog::default();
        let d = descriptor("A", "s0");
        let client = aggregate(vec![
            FakeSource::new("s0", &[("A", &d)], &log),
            FakeSource::new("s1", &[("A", &d)], &log),
        ]);

        client.get("A").await.expect("found in s0");
        assert_eq!(calls(&log), vec!["s0:get"]);
    }

    #[tokio::test]
    async fn get_falls_back_to_later_sources() {
        let log = CallLog::default();
        let a = descriptor("A", "s0");
        let c = descriptor("C", "s2");
        let client = aggregate(vec![
            FakeSource::new("s0", &[("A", &a)], &log),
            FakeSource::new("s1", &[], &log),
            FakeSource::new("s2", &[("C", &c)], &log),
        ]);

        assert_eq!(client.get("C").await, Some(c));
        assert_eq!(calls(&log), vec!["s0:get", "s1:get", "s2:get"]);
    }

    #[tokio::test]
    async fn get_misses_when_no_source_has_the_name() {
        let log = CallLog::default();
        let a = descriptor("A", "s0");
        let client = aggregate(vec![FakeSource::new("s0", &[("A", &a)], &log), FakeSource::new("s1", &[], &log)]);

        assert_eq!(client.get("Z").await, None);
    }

    #[tokio::test]
    async fn derived_maps_overlay_in_source_order() {
        let log = CallLog::default();
        let b0 = descriptor("B", "s0");
        let b1 = descriptor("B", "s1");
        let only0 = descriptor("X", "s0");
        let client = aggregate(vec![
            FakeSource::new("s0", &[("B", &b0), ("X", &only0)], &log),
            FakeSource::new("s1", &[("B", &b1)], &log),
        ]);

        let packages = client.type_name_to_package_name_map().await;
        assert_eq!(packages["B"], "s1");
        assert_eq!(packages["X"], "s0");

        let pairs = client.all_descriptor_and_type_name().await;
        assert_eq!(pairs["B"].descriptor, b1);
        assert_eq!(pairs["X"].descriptor, only0);
    }

    #[tokio::test]
    async fn get_all_key_set_is_union_of_sources() {
        let log = CallLog::default();
        let (a, b, c) = (descriptor("A", "s0"), descriptor("B", "s1"), descriptor("C", "s2"));
        let client = aggregate(vec![
            FakeSource::new("s0", &[("A", &a)], &log),
            FakeSource::new("s1", &[("B", &b)], &log),
            FakeSource::new("s2", &[("C", &c)], &log),
        ]);

        let all = client.get_all().await;
        let mut keys: Vec<_> = all.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["A", "B", "C"]);
        assert!(all["B"].ptr_eq(&b), "single-source values pass through untouched");
    }

    #[tokio::test]
    async fn refresh_reaches_every_source_despite_failures() {
        let log = CallLog::default();
        let client = aggregate(vec![
            FakeSource::new("s0", &[], &log).failing(),
            FakeSource::new("s1", &[], &log),
            FakeSource::new("s2", &[], &log).failing(),
        ]);

        let report = client.refresh_members().await;

        assert_eq!(calls(&log), vec!["s0:refresh", "s1:refresh", "s2:refresh"]);
        assert_eq!(report.len(), 3);
        assert!(!report.is_success());
        assert_eq!(report.failures().map(|(index, _)| index).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[tokio::test]
    async fn close_reaches_every_source_and_completes() {
        let log = CallLog::default();
        let client = aggregate(vec![
            FakeSource::new("s0", &[], &log).failing(),
            FakeSource::new("s1", &[], &log),
        ]);

        client.close().await.expect("close is best-effort");

        assert_eq!(calls(&log), vec!["s0:close", "s1:close"]);
    }

    #[tokio::test]
    async fn trait_refresh_never_fails() {
        let log = CallLog::default();
        let client = aggregate(vec![FakeSource::new("s0", &[], &log).failing()]);

        assert!(client.refresh().await.is_ok());
        assert_eq!(calls(&log), vec!["s0:refresh"]);
    }

    #[tokio::test]
    async fn auto_refresh_flag_comes_from_config_not_members() {
        let log = CallLog::default();
        let mut member = FakeSource::new("s0", &[], &log);
        member.auto_refresh = true;
        let config = StencilConfig {
            cache_auto_refresh: false,
            ..Default::default()
        };
        let client = MultiUrlStencilClient::from_clients(vec![Arc::new(member) as Arc<dyn StencilClient>], &config).expect("one source");

        assert!(!client.should_auto_refresh_cache());
        client.refresh().await.expect("refresh");
        client.close().await.expect("close");
        assert!(!client.should_auto_refresh_cache());
    }

    #[tokio::test]
    async fn aggregates_nest() {
        let log = CallLog::default();
        let (inner_a, outer_a, outer_b) = (descriptor("A", "inner"), descriptor("A", "outer"), descriptor("B", "outer"));
        let inner = aggregate(vec![FakeSource::new("inner", &[("A", &inner_a)], &log)]);
        let outer = MultiUrlStencilClient::from_clients(
            vec![
                Arc::new(inner) as Arc<dyn StencilClient>,
                Arc::new(FakeSource::new("outer", &[("A", &outer_a), ("B", &outer_b)], &log)),
            ],
            &StencilConfig::default(),
        )
        .expect("two sources");

        assert_eq!(outer.get("A").await, Some(inner_a));
        assert_eq!(outer.get_all().await["A"], outer_a);
        outer.close().await.expect("close");
        assert!(calls(&log).ends_with(&["inner:close".to_string(), "outer:close".to_string()]));
    }

    #[test]
    fn empty_source_list_is_rejected() {
        let result = MultiUrlStencilClient::from_clients(Vec::new(), &StencilConfig::default());
        assert!(matches!(result, Err(StencilError::NoSources)));
    }

    /// Loader serving empty sets that records which URLs were loaded.
    #[derive(Default)]
    struct LoadTracker(Mutex<Vec<String>>);

    impl LoadTracker {
        fn loaded(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DescriptorCacheLoader for LoadTracker {
        async fn load(&self, url: &str, _previous: Option<&DescriptorSet>) -> Result<DescriptorSet, StencilError> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(DescriptorSet::default())
        }
    }

    #[test]
    fn empty_url_list_is_rejected() {
        let loader = Arc::new(LoadTracker::default());
        let result = MultiUrlStencilClient::new(Vec::<String>::new(), &StencilConfig::default(), loader.clone());
        assert!(matches!(result, Err(StencilError::NoSources)));
        assert!(loader.loaded().is_empty());
    }

    #[test]
    fn invalid_url_fails_construction() {
        let loader = Arc::new(LoadTracker::default());
        let result = MultiUrlStencilClient::new(
            ["https://registry.example.com/a", "::not a url::"],
            &StencilConfig::default(),
            loader,
        );
        assert!(matches!(result, Err(StencilError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn builds_one_member_per_url_in_order() {
        let loader = Arc::new(LoadTracker::default());
        let config = StencilConfig {
            cache_auto_refresh: true,
            ..Default::default()
        };
        let client = MultiUrlStencilClient::new(
            ["https://registry.example.com/a", "https://registry.example.com/b"],
            &config,
            loader.clone(),
        )
        .expect("two sources");

        assert_eq!(client.len(), 2);
        assert!(client.should_auto_refresh_cache());
        assert!(loader.loaded().is_empty(), "members load lazily");

        assert!(client.get("shop.Missing").await.is_none());
        assert_eq!(loader.loaded(), vec!["https://registry.example.com/a", "https://registry.example.com/b"]);
    }
}
