//! Weight propagation over a dependency graph.
//!
//! A unit of mass starts evenly split across the top-level packages. Each
//! package keeps one share and hands the rest to its dependencies in equal
//! parts, level after level, until a share would fall under `epsilon`; at
//! that point the package keeps everything it inherited. Packages listed as
//! non-compensated never keep a share and pass their whole mass through.
//!
//! Cycles are not detected in general: every compensated level divides the
//! mass by at least two, so a positive `epsilon` bounds the traversal. The
//! one shape that never shrinks is a run of no-comp packages with a single
//! dependency each; such a run is cut when it revisits a package.

use crate::registry::{RegistryClient, ResolvedSpec};
use crate::{DepweightError, Result};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Accumulated weight per bare package name.
pub type WeightMap = BTreeMap<String, f64>;

pub fn total_weight(weights: &WeightMap) -> f64 {
    weights.values().sum()
}

#[derive(Debug, Clone)]
pub struct WeightOptions {
    pub epsilon: f64,
    /// Bare names whose mass passes through to their dependencies.
    pub no_comp: BTreeSet<String>,
}

impl WeightOptions {
    pub fn new(epsilon: f64) -> Self {
        WeightOptions {
            epsilon,
            no_comp: BTreeSet::new(),
        }
    }

    pub fn with_no_comp<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.no_comp.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(DepweightError::InvalidEpsilon {
                value: self.epsilon,
            });
        }

        Ok(())
    }

    fn is_no_comp(&self, name: &str) -> bool {
        self.no_comp.contains(name)
    }
}

/// Result of one propagation run, with the bookkeeping behind it.
#[derive(Debug, Clone, Default)]
pub struct Propagation {
    pub weights: WeightMap,
    /// Mass dropped by failed resolutions, no-comp leaves and no-comp
    /// shares below epsilon. `total_weight(&weights) + discarded == 1.0`
    /// whenever at least one top-level package resolved.
    pub discarded: f64,
    pub batches: usize,
    pub fetches: usize,
    pub cache_hits: usize,
}

/// Compute the weight of every package reachable from `top_level`.
pub async fn compute_weights<C: RegistryClient>(
    top_level: &[String],
    client: &C,
    options: &WeightOptions,
) -> Result<WeightMap> {
    propagate(top_level, client, options)
        .await
        .map(|propagation| propagation.weights)
}

pub async fn propagate<C: RegistryClient>(
    top_level: &[String],
    client: &C,
    options: &WeightOptions,
) -> Result<Propagation> {
    options.validate()?;

    if let Some(session) = client.session() {
        session.reset();
    }

    let resolved = join_all(top_level.iter().map(|specifier| client.resolve(specifier))).await;

    let mut roots = Vec::with_capacity(resolved.len());
    for (specifier, result) in top_level.iter().zip(resolved) {
        match result {
            Ok(spec) => roots.push(spec),
            Err(err) => tracing::warn!("skipping top-level package {specifier:?}: {err}"),
        }
    }

    let mut propagation = Propagation::default();

    if roots.is_empty() {
        tracing::info!("no top-level package resolved, nothing to weigh");
        return Ok(propagation);
    }

    let cache = DependencyCache::new();
    let mut queue = vec![WorkItem {
        weight: 1.0 / roots.len() as f64,
        specs: roots,
        pass_through: Vec::new(),
    }];

    while let Some(WorkItem {
        specs,
        weight,
        pass_through,
    }) = queue.pop()
    {
        propagation.batches += 1;
        tracing::debug!(
            "batch {}: {} packages at {:.6} each, {} queued",
            propagation.batches,
            specs.len(),
            weight,
            queue.len()
        );

        let outcomes = join_all(specs.into_iter().map(|spec| {
            process_package(client, &cache, options, spec, weight, &pass_through)
        }))
        .await;

        for outcome in outcomes {
            if let Some((name, share)) = outcome.record {
                *propagation.weights.entry(name).or_insert(0.0) += share;
            }

            if let Some(children) = outcome.children {
                queue.push(children);
            }

            propagation.discarded += outcome.discarded;
        }
    }

    propagation.fetches = cache.fetches.load(Ordering::Relaxed);
    propagation.cache_hits = cache.hits.load(Ordering::Relaxed);

    tracing::info!(
        "weighed {} packages in {} batches ({} fetches, {} cache hits), total {:.6}, discarded {:.6}",
        propagation.weights.len(),
        propagation.batches,
        propagation.fetches,
        propagation.cache_hits,
        total_weight(&propagation.weights),
        propagation.discarded
    );

    Ok(propagation)
}

/// Packages sharing one inherited weight each.
struct WorkItem<S> {
    specs: Vec<S>,
    weight: f64,
    /// No-comp keys this mass went through without being divided.
    pass_through: Vec<String>,
}

struct PackageOutcome<S> {
    record: Option<(String, f64)>,
    children: Option<WorkItem<S>>,
    discarded: f64,
}

impl<S> PackageOutcome<S> {
    fn discard(weight: f64) -> Self {
        PackageOutcome {
            record: None,
            children: None,
            discarded: weight,
        }
    }

    /// Hand `weight` to each of `specs`; an empty set swallows the mass.
    fn split(
        record: Option<(String, f64)>,
        specs: Vec<S>,
        weight: f64,
        pass_through: Vec<String>,
    ) -> Self {
        if specs.is_empty() {
            let discarded = if record.is_none() { weight } else { 0.0 };
            return PackageOutcome {
                record,
                children: None,
                discarded,
            };
        }

        PackageOutcome {
            record,
            children: Some(WorkItem {
                specs,
                weight,
                pass_through,
            }),
            discarded: 0.0,
        }
    }
}

async fn process_package<C: RegistryClient>(
    client: &C,
    cache: &DependencyCache<C::Spec>,
    options: &WeightOptions,
    pkg: C::Spec,
    weight: f64,
    pass_through: &[String],
) -> PackageOutcome<C::Spec> {
    let pkg = match client.resolve(&pkg.to_string()).await {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!("dropping {pkg} and its {weight:.6} share: {err}");
            return PackageOutcome::discard(weight);
        }
    };

    let deps = cache.dependencies(client, &pkg).await;

    let no_comp_deps: Vec<&C::Spec> = deps
        .iter()
        .filter(|dep| options.is_no_comp(dep.name()))
        .collect();

    let grandchildren = join_all(
        no_comp_deps
            .iter()
            .map(|dep| cache.dependencies(client, *dep)),
    )
    .await;

    // No-comp deps with nothing below them would only swallow mass.
    let childless: HashSet<String> = no_comp_deps
        .iter()
        .zip(grandchildren)
        .filter(|(_, below)| below.is_empty())
        .map(|(dep, _)| dep.to_string())
        .collect();

    let filtered: Vec<C::Spec> = deps
        .iter()
        .filter(|dep| !childless.contains(&dep.to_string()))
        .cloned()
        .collect();

    if options.is_no_comp(pkg.name()) {
        let split = weight / filtered.len().max(1) as f64;
        if split < options.epsilon {
            return PackageOutcome::discard(weight);
        }

        if filtered.len() > 1 {
            return PackageOutcome::split(None, filtered, split, Vec::new());
        }

        let key = pkg.to_string();
        if pass_through.contains(&key) {
            tracing::warn!("no-comp cycle through {key}, dropping its {weight:.6} share");
            return PackageOutcome::discard(weight);
        }

        let mut chain = pass_through.to_vec();
        chain.push(key);
        return PackageOutcome::split(None, filtered, split, chain);
    }

    let split = weight / (filtered.len() + 1) as f64;
    if split < options.epsilon {
        let record = Some((pkg.name().to_string(), weight));
        return PackageOutcome::split(record, Vec::new(), weight, Vec::new());
    }

    PackageOutcome::split(Some((pkg.name().to_string(), split)), filtered, split, Vec::new())
}

type DependencyCell<S> = Arc<OnceCell<Arc<[S]>>>;

/// Dependency lists keyed by canonical spec, shared by one run's tasks.
///
/// Concurrent lookups of the same key wait on a single registry call.
struct DependencyCache<S> {
    entries: Mutex<HashMap<String, DependencyCell<S>>>,
    fetches: AtomicUsize,
    hits: AtomicUsize,
}

impl<S: ResolvedSpec> DependencyCache<S> {
    fn new() -> Self {
        DependencyCache {
            entries: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    /// A failed fetch is logged and cached as a leaf for the rest of the run.
    async fn dependencies<C>(&self, client: &C, spec: &S) -> Arc<[S]>
    where
        C: RegistryClient<Spec = S>,
    {
        let key = spec.to_string();

        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(key.clone()).or_default().clone()
        };

        let fetched_flag = AtomicBool::new(false);
        let fetched = &fetched_flag;

        let deps = cell
            .get_or_init(|| async move {
                fetched.store(true, Ordering::Relaxed);
                self.fetches.fetch_add(1, Ordering::Relaxed);

                match client.dependencies(spec).await {
                    Ok(deps) => Arc::from(deps),
                    Err(err) => {
                        tracing::warn!(
                            "could not fetch dependencies of {key}, treating it as a leaf: {err}"
                        );
                        Arc::from(Vec::new())
                    }
                }
            })
            .await
            .clone();

        if !fetched_flag.load(Ordering::Relaxed) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionCache;
    use std::fmt;

    const TOLERANCE: f64 = 1e-9;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct TestSpec {
        name: String,
        range: String,
    }

    impl fmt::Display for TestSpec {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}@{}", self.name, self.range)
        }
    }

    impl ResolvedSpec for TestSpec {
        fn name(&self) -> &str {
            &self.name
        }
    }

    /// In-memory registry: every package has a single version.
    #[derive(Default)]
    struct TestRegistry {
        graph: HashMap<String, Vec<String>>,
        unresolvable: HashSet<String>,
        unfetchable: HashSet<String>,
        with_session: bool,
        suspending: bool,
        fetches: Mutex<HashMap<String, usize>>,
        resolves: AtomicUsize,
        resets: AtomicUsize,
    }

    impl TestRegistry {
        fn new(edges: &[(&str, &[&str])]) -> Self {
            TestRegistry {
                graph: edges
                    .iter()
                    .map(|(name, deps)| {
                        (
                            name.to_string(),
                            deps.iter().map(|dep| dep.to_string()).collect(),
                        )
                    })
                    .collect(),
                ..TestRegistry::default()
            }
        }

        fn unresolvable(mut self, name: &str) -> Self {
            self.unresolvable.insert(name.to_string());
            self
        }

        fn unfetchable(mut self, name: &str) -> Self {
            self.unfetchable.insert(name.to_string());
            self
        }

        fn with_session(mut self) -> Self {
            self.with_session = true;
            self
        }

        /// Yield to the scheduler inside every fetch, so tasks of one batch
        /// interleave the way network-bound lookups do.
        fn suspending(mut self) -> Self {
            self.suspending = true;
            self
        }

        fn fetch_count(&self, key: &str) -> usize {
            self.fetches.lock().unwrap().get(key).copied().unwrap_or(0)
        }
    }

    impl RegistryClient for TestRegistry {
        type Spec = TestSpec;

        async fn resolve(&self, specifier: &str) -> Result<TestSpec> {
            self.resolves.fetch_add(1, Ordering::Relaxed);

            let (name, range) = specifier.split_once('@').unwrap_or((specifier, "*"));

            if name.is_empty() || name.contains(' ') || self.unresolvable.contains(name) {
                return Err(DepweightError::InvalidSpecifier {
                    spec: specifier.to_string(),
                    reason: "not a package".to_string(),
                });
            }

            Ok(TestSpec {
                name: name.to_string(),
                range: range.to_string(),
            })
        }

        async fn dependencies(&self, spec: &TestSpec) -> Result<Vec<TestSpec>> {
            if self.suspending {
                tokio::task::yield_now().await;
            }

            *self
                .fetches
                .lock()
                .unwrap()
                .entry(spec.to_string())
                .or_insert(0) += 1;

            if self.unfetchable.contains(&spec.name) {
                return Err(DepweightError::ResolutionFailed {
                    name: spec.name.clone(),
                    range: spec.range.clone(),
                    reason: "registry unavailable".to_string(),
                });
            }

            Ok(self
                .graph
                .get(&spec.name)
                .map(|deps| {
                    deps.iter()
                        .map(|dep| TestSpec {
                            name: dep.clone(),
                            range: "*".to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        }

        fn session(&self) -> Option<&dyn SessionCache> {
            if self.with_session { Some(self) } else { None }
        }
    }

    impl SessionCache for TestRegistry {
        fn reset(&self) {
            self.resets.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn specs(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn assert_weight(weights: &WeightMap, name: &str, expected: f64) {
        let actual = weights
            .get(name)
            .copied()
            .unwrap_or_else(|| panic!("{name} missing from {weights:?}"));
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "{name}: expected {expected}, got {actual}"
        );
    }

    fn assert_well_formed(propagation: &Propagation, options: &WeightOptions) {
        for (name, weight) in &propagation.weights {
            assert!(*weight >= 0.0, "{name} has negative weight {weight}");
            assert!(!options.no_comp.contains(name), "no-comp {name} was weighted");
        }
    }

    fn assert_conserved(propagation: &Propagation) {
        let total = total_weight(&propagation.weights) + propagation.discarded;
        assert!((total - 1.0).abs() < TOLERANCE, "mass not conserved: {total}");
    }

    fn funding_graph() -> TestRegistry {
        TestRegistry::new(&[
            ("js-deep-equals", &["murmurhash"]),
            ("web-app-thing", &["react"]),
            ("react", &["murmurhash"]),
            ("murmurhash", &[]),
        ])
    }

    #[tokio::test]
    async fn no_comp_mass_flows_to_shared_leaf() {
        let registry = funding_graph();
        let options = WeightOptions::new(0.01).with_no_comp(["react"]);

        let propagation = propagate(
            &specs(&["js-deep-equals", "web-app-thing"]),
            &registry,
            &options,
        )
        .await
        .unwrap();

        assert_eq!(propagation.weights.len(), 3);
        assert_weight(&propagation.weights, "js-deep-equals", 0.25);
        assert_weight(&propagation.weights, "web-app-thing", 0.25);
        assert_weight(&propagation.weights, "murmurhash", 0.5);
        assert!(!propagation.weights.contains_key("react"));
        assert_well_formed(&propagation, &options);
        assert_conserved(&propagation);
    }

    #[tokio::test]
    async fn large_epsilon_stops_before_first_split() {
        let registry = funding_graph();
        let options = WeightOptions::new(0.5).with_no_comp(["react"]);

        let weights = compute_weights(
            &specs(&["js-deep-equals", "web-app-thing"]),
            &registry,
            &options,
        )
        .await
        .unwrap();

        assert_eq!(weights.len(), 2);
        assert_weight(&weights, "js-deep-equals", 0.5);
        assert_weight(&weights, "web-app-thing", 0.5);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_map() {
        let registry = funding_graph().with_session();

        let weights = compute_weights(&[], &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        assert!(weights.is_empty());
        assert_eq!(registry.resets.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn session_is_reset_once_per_run() {
        let registry = funding_graph().with_session();
        let options = WeightOptions::new(0.01);

        compute_weights(&specs(&["js-deep-equals"]), &registry, &options)
            .await
            .unwrap();
        assert_eq!(registry.resets.load(Ordering::Relaxed), 1);

        compute_weights(&specs(&["web-app-thing"]), &registry, &options)
            .await
            .unwrap();
        assert_eq!(registry.resets.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn unresolvable_top_level_is_excluded_from_denominator() {
        let registry = TestRegistry::new(&[("solo", &[])]);

        let weights = compute_weights(
            &specs(&["not a package", "solo"]),
            &registry,
            &WeightOptions::new(0.01),
        )
        .await
        .unwrap();

        assert_eq!(weights.len(), 1);
        assert_weight(&weights, "solo", 1.0);
    }

    #[tokio::test]
    async fn all_top_level_failures_yield_empty_map() {
        let registry = TestRegistry::new(&[]).unresolvable("gone");

        let weights = compute_weights(
            &specs(&["gone", "also bad"]),
            &registry,
            &WeightOptions::new(0.01),
        )
        .await
        .unwrap();

        assert!(weights.is_empty());
    }

    #[tokio::test]
    async fn full_traversal_sums_to_one() {
        let registry = TestRegistry::new(&[
            ("a", &["b", "c"]),
            ("b", &["d"]),
            ("c", &["d", "e"]),
            ("d", &[]),
            ("e", &["f"]),
            ("f", &[]),
            ("g", &["a", "f"]),
        ]);
        let options = WeightOptions::new(1e-9);

        let propagation = propagate(&specs(&["a", "g"]), &registry, &options)
            .await
            .unwrap();

        assert_eq!(propagation.weights.len(), 7);
        assert!((total_weight(&propagation.weights) - 1.0).abs() < TOLERANCE);
        assert_eq!(propagation.discarded, 0.0);
        assert_well_formed(&propagation, &options);
    }

    #[tokio::test]
    async fn diamond_contributions_are_summed() {
        let registry = TestRegistry::new(&[("x", &["leaf"]), ("y", &["leaf"]), ("leaf", &[])]);

        let weights = compute_weights(&specs(&["x", "y"]), &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        assert_weight(&weights, "x", 0.25);
        assert_weight(&weights, "y", 0.25);
        assert_weight(&weights, "leaf", 0.5);
    }

    #[tokio::test]
    async fn duplicate_entries_in_one_batch_accumulate() {
        let registry = TestRegistry::new(&[("a", &["leaf", "leaf"]), ("leaf", &[])]);

        let weights = compute_weights(&specs(&["a"]), &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        assert_weight(&weights, "a", 1.0 / 3.0);
        assert_weight(&weights, "leaf", 2.0 / 3.0);
    }

    #[tokio::test]
    async fn shared_dependencies_are_fetched_once() {
        let registry = TestRegistry::new(&[
            ("x", &["shared"]),
            ("y", &["shared"]),
            ("shared", &["deep"]),
            ("deep", &[]),
        ]);

        let propagation = propagate(&specs(&["x", "y"]), &registry, &WeightOptions::new(1e-6))
            .await
            .unwrap();

        assert_eq!(registry.fetch_count("shared@*"), 1);
        assert_eq!(registry.fetch_count("deep@*"), 1);
        assert!(propagation.cache_hits >= 2);
        assert_weight(&propagation.weights, "deep", 0.25);
    }

    #[tokio::test]
    async fn concurrent_lookups_of_one_key_share_a_fetch() {
        let registry = TestRegistry::new(&[("a", &["leaf", "leaf"]), ("leaf", &[])]).suspending();

        let propagation = propagate(&specs(&["a"]), &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        assert_eq!(registry.fetch_count("leaf@*"), 1);
        assert_eq!(propagation.fetches, 2);
        assert_eq!(propagation.cache_hits, 1);
        assert_weight(&propagation.weights, "a", 1.0 / 3.0);
        assert_weight(&propagation.weights, "leaf", 2.0 / 3.0);
    }

    #[tokio::test]
    async fn grandchild_lookup_overlapping_a_sibling_shares_a_fetch() {
        let registry =
            TestRegistry::new(&[("x", &["nc"]), ("nc", &["leaf"]), ("leaf", &[])]).suspending();
        let options = WeightOptions::new(0.01).with_no_comp(["nc"]);

        let propagation = propagate(&specs(&["x", "nc"]), &registry, &options)
            .await
            .unwrap();

        assert_eq!(registry.fetch_count("nc@*"), 1);
        assert_eq!(registry.fetch_count("leaf@*"), 1);
        assert_weight(&propagation.weights, "x", 0.25);
        assert_weight(&propagation.weights, "leaf", 0.75);
        assert_well_formed(&propagation, &options);
        assert_conserved(&propagation);
    }

    #[tokio::test]
    async fn duplicate_top_level_specifiers_each_take_a_share() {
        let registry = TestRegistry::new(&[("x", &["y"]), ("y", &[])]);

        let propagation = propagate(&specs(&["x", "x"]), &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        // Each copy is seeded at 0.5 and splits it with `y`.
        assert_weight(&propagation.weights, "x", 0.5);
        assert_weight(&propagation.weights, "y", 0.5);
        assert_eq!(registry.fetch_count("x@*"), 1);
        assert_eq!(propagation.batches, 3);
        assert_conserved(&propagation);
    }

    #[tokio::test]
    async fn childless_no_comp_dependency_does_not_dilute_siblings() {
        let registry = TestRegistry::new(&[("a", &["nc", "b"]), ("nc", &[]), ("b", &[])]);
        let options = WeightOptions::new(0.01).with_no_comp(["nc"]);

        let propagation = propagate(&specs(&["a"]), &registry, &options)
            .await
            .unwrap();

        assert_eq!(propagation.weights.len(), 2);
        assert_weight(&propagation.weights, "a", 0.5);
        assert_weight(&propagation.weights, "b", 0.5);
        assert_well_formed(&propagation, &options);
        assert_conserved(&propagation);
    }

    #[tokio::test]
    async fn childless_no_comp_top_level_discards_its_mass() {
        let registry = TestRegistry::new(&[("nc", &[]), ("other", &[])]);
        let options = WeightOptions::new(0.01).with_no_comp(["nc"]);

        let propagation = propagate(&specs(&["nc", "other"]), &registry, &options)
            .await
            .unwrap();

        assert_eq!(propagation.weights.len(), 1);
        assert_weight(&propagation.weights, "other", 0.5);
        assert!((propagation.discarded - 0.5).abs() < TOLERANCE);
    }

    #[tokio::test]
    async fn chained_no_comp_packages_pass_mass_down() {
        let registry = TestRegistry::new(&[
            ("a", &["nc1"]),
            ("nc1", &["nc2"]),
            ("nc2", &["leaf"]),
            ("leaf", &[]),
        ]);
        let options = WeightOptions::new(0.01).with_no_comp(["nc1", "nc2"]);

        let propagation = propagate(&specs(&["a"]), &registry, &options)
            .await
            .unwrap();

        assert_weight(&propagation.weights, "a", 0.5);
        assert_weight(&propagation.weights, "leaf", 0.5);
        assert_well_formed(&propagation, &options);
        assert_conserved(&propagation);
    }

    #[tokio::test]
    async fn no_comp_share_below_epsilon_is_discarded() {
        let registry = TestRegistry::new(&[
            ("a", &["nc"]),
            ("nc", &["b", "c", "d", "e"]),
            ("b", &[]),
            ("c", &[]),
            ("d", &[]),
            ("e", &[]),
        ]);
        let options = WeightOptions::new(0.2).with_no_comp(["nc"]);

        let propagation = propagate(&specs(&["a"]), &registry, &options)
            .await
            .unwrap();

        assert_eq!(propagation.weights.len(), 1);
        assert_weight(&propagation.weights, "a", 0.5);
        assert!((propagation.discarded - 0.5).abs() < TOLERANCE);
    }

    #[tokio::test]
    async fn raising_epsilon_gives_suppressed_package_its_full_share() {
        let registry = TestRegistry::new(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        let top = specs(&["a"]);

        let fine = compute_weights(&top, &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();
        let coarse = compute_weights(&top, &registry, &WeightOptions::new(0.3))
            .await
            .unwrap();

        assert_weight(&fine, "a", 0.5);
        assert_weight(&fine, "b", 0.25);
        assert_weight(&fine, "c", 0.25);

        assert!(coarse.len() <= fine.len());
        assert_weight(&coarse, "a", 0.5);
        assert_weight(&coarse, "b", 0.5);
        assert!(!coarse.contains_key("c"));
    }

    #[tokio::test]
    async fn cycles_terminate_through_epsilon() {
        let registry = TestRegistry::new(&[("self-ref", &["self-ref"]), ("a", &["b"]), ("b", &["a"])]);
        let options = WeightOptions::new(0.001);

        let propagation = propagate(&specs(&["self-ref", "a"]), &registry, &options)
            .await
            .unwrap();

        assert_weight(&propagation.weights, "self-ref", 0.5);
        assert!((total_weight(&propagation.weights) - 1.0).abs() < TOLERANCE);
        assert!(propagation.weights["a"] > propagation.weights["b"]);
    }

    #[tokio::test]
    async fn undivided_no_comp_cycle_is_cut() {
        let registry = TestRegistry::new(&[
            ("a", &["nc1"]),
            ("nc1", &["nc2"]),
            ("nc2", &["nc1"]),
        ]);
        let options = WeightOptions::new(0.01).with_no_comp(["nc1", "nc2"]);

        let propagation = propagate(&specs(&["a"]), &registry, &options)
            .await
            .unwrap();

        assert_eq!(propagation.weights.len(), 1);
        assert_weight(&propagation.weights, "a", 0.5);
        assert!((propagation.discarded - 0.5).abs() < TOLERANCE);
    }

    #[tokio::test]
    async fn failed_fetch_turns_package_into_leaf() {
        let registry =
            TestRegistry::new(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]).unfetchable("b");

        let propagation = propagate(&specs(&["a"]), &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        assert_weight(&propagation.weights, "a", 0.5);
        assert_weight(&propagation.weights, "b", 0.5);
        assert!(!propagation.weights.contains_key("c"));
        assert_conserved(&propagation);
    }

    #[tokio::test]
    async fn failed_reresolution_discards_only_that_package() {
        let registry = TestRegistry::new(&[("a", &["broken", "fine"]), ("fine", &[])])
            .unresolvable("broken");

        let propagation = propagate(&specs(&["a"]), &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        let third = 1.0 / 3.0;
        assert_weight(&propagation.weights, "a", third);
        assert_weight(&propagation.weights, "fine", third);
        assert!(!propagation.weights.contains_key("broken"));
        assert!((propagation.discarded - third).abs() < TOLERANCE);
        assert_conserved(&propagation);
    }

    #[tokio::test]
    async fn every_package_is_re_resolved() {
        let registry = TestRegistry::new(&[("a", &["b", "c"]), ("b", &[]), ("c", &[])]);

        compute_weights(&specs(&["a"]), &registry, &WeightOptions::new(0.01))
            .await
            .unwrap();

        // One top-level resolution, then one per processed package.
        assert_eq!(registry.resolves.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn rejects_non_positive_epsilon_before_touching_the_client() {
        let registry = funding_graph().with_session();

        for epsilon in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let result =
                compute_weights(&specs(&["js-deep-equals"]), &registry, &WeightOptions::new(epsilon))
                    .await;
            assert!(matches!(result, Err(DepweightError::InvalidEpsilon { .. })));
        }

        assert_eq!(registry.resets.load(Ordering::Relaxed), 0);
        assert_eq!(registry.resolves.load(Ordering::Relaxed), 0);
    }
}
