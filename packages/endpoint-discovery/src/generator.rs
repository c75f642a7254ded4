//! Pattern generator: synthesizes candidate endpoint paths.
//!
//! The search space is the cross product of
//! `{prefix} x {stem, singular and plural} x {"", "/{id}", "/{id}/{sub}"} x {methods}`
//! plus explicit seed paths under every prefix. Generation is pure: no I/O,
//! no shared state. Duplicates are dropped within a pass.

use indexmap::IndexSet;
use std::collections::HashSet;

use crate::types::candidate::{Candidate, EndpointKey, Method};
use crate::types::config::DiscoveryConfig;

/// Candidate generator built from a config snapshot.
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    prefixes: Vec<String>,
    stems: Vec<String>,
    ids: Vec<u64>,
    extra_paths: Vec<String>,
    sub_resources: Vec<String>,
    methods: Vec<Method>,
}

impl PatternGenerator {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        let prefixes: IndexSet<String> = config
            .api_version_prefixes
            .iter()
            .map(|p| normalize_prefix(p))
            .collect();

        let stems: IndexSet<String> = config
            .resource_stems
            .iter()
            .map(|s| s.trim().trim_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .flat_map(stem_variants)
            .collect();

        let sub_resources: IndexSet<String> = config
            .sub_resources
            .iter()
            .map(|s| s.trim().trim_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let extra_paths: IndexSet<String> = config
            .extra_paths
            .iter()
            .map(|p| normalize_path(p))
            .filter(|p| p != "/")
            .collect();

        let mut methods: IndexSet<Method> = IndexSet::new();
        methods.insert(Method::Get);
        methods.extend(config.extra_methods.iter().copied());

        Self {
            prefixes: prefixes.into_iter().collect(),
            stems: stems.into_iter().collect(),
            ids: config.all_known_ids(),
            extra_paths: extra_paths.into_iter().collect(),
            sub_resources: sub_resources.into_iter().collect(),
            methods: methods.into_iter().collect(),
        }
    }

    /// Methods probed for every path; GET always comes first.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Lazily yield depth-0 candidates, without duplicate `(method, path)` pairs.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        let mut seen: HashSet<EndpointKey> = HashSet::new();
        self.paths()
            .flat_map(move |path| {
                self.methods
                    .iter()
                    .map(move |&method| Candidate::new(method, path.clone(), 0))
            })
            .filter(move |candidate| seen.insert(candidate.key()))
    }

    /// Collect the full depth-0 candidate set.
    pub fn generate(&self) -> Vec<Candidate> {
        self.candidates().collect()
    }

    /// Candidates for a child ID discovered under `parent_path`.
    ///
    /// Yields `{parent}/{id}` and `{parent}/{id}/{sub}` for each configured
    /// sub-resource, for every enabled method.
    pub fn child_candidates(&self, parent_path: &str, id: u64, depth: usize) -> Vec<Candidate> {
        let base = format!("{}/{}", parent_path.trim_end_matches('/'), id);
        let paths = std::iter::once(base.clone()).chain(
            self.sub_resources
                .iter()
                .map(move |sub| format!("{}/{}", base, sub)),
        );

        let mut seen: HashSet<EndpointKey> = HashSet::new();
        paths
            .flat_map(|path| {
                self.methods
                    .iter()
                    .map(move |&method| Candidate::new(method, path.clone(), depth))
            })
            .filter(|candidate| seen.insert(candidate.key()))
            .collect()
    }

    fn paths(&self) -> impl Iterator<Item = String> + '_ {
        self.prefixes.iter().flat_map(move |prefix| {
            let resources = self.stems.iter().flat_map(move |stem| {
                let collection = format!("{}/{}", prefix, stem);
                std::iter::once(collection.clone()).chain(self.id_paths(collection))
            });
            let seeds = self
                .extra_paths
                .iter()
                .map(move |path| format!("{}{}", prefix, path));
            resources.chain(seeds)
        })
    }

    fn id_paths(&self, collection: String) -> impl Iterator<Item = String> + '_ {
        self.ids.iter().flat_map(move |id| {
            let item = format!("{}/{}", collection, id);
            std::iter::once(item.clone()).chain(
                self.sub_resources
                    .iter()
                    .map(move |sub| format!("{}/{}", item, sub)),
            )
        })
    }
}

/// "/api/" -> "/api", "api" -> "/api", "" -> "".
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Ensure a single leading slash and no trailing slash.
fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim().trim_matches('/'))
}

/// A stem plus its singular/plural counterpart, e.g. "project" -> ["project", "projects"].
pub fn stem_variants(stem: String) -> Vec<String> {
    let counterpart = if let Some(base) = stem.strip_suffix("ies") {
        format!("{}y", base)
    } else if stem.ends_with("ses")
        || stem.ends_with("xes")
        || stem.ends_with("ches")
        || stem.ends_with("shes")
    {
        stem[..stem.len() - 2].to_string()
    } else if stem.ends_with("ss") {
        format!("{}es", stem)
    } else if let Some(base) = stem.strip_suffix('s') {
        base.to_string()
    } else if stem.ends_with('y') && !ends_with_vowel_y(&stem) {
        format!("{}ies", &stem[..stem.len() - 1])
    } else if stem.ends_with('x') || stem.ends_with("ch") || stem.ends_with("sh") {
        format!("{}es", stem)
    } else {
        format!("{}s", stem)
    };

    if counterpart.is_empty() || counterpart == stem {
        vec![stem]
    } else {
        vec![stem, counterpart]
    }
}

fn ends_with_vowel_y(stem: &str) -> bool {
    let mut chars = stem.chars().rev();
    chars.next();
    matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}
