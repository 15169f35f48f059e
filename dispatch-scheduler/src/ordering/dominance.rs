//! The pattern dominance graph.
//!
//! Each location has a stopping signature: the set of services calling there,
//! each with its travel time relative to the first of them. A signature that
//! contains another's services with the same relative timing dominates it:
//! any conflict between those services at the smaller location is repeated
//! at the larger one. Checking signatures from the bottom up lets a search
//! reject a candidate dispatch at the smallest location that exposes it.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::Seconds;
use crate::graph::LocationId;
use crate::problem::{SchedulingProblem, ServiceIdx};

use super::sequence::dispatch_is_too_late;

/// Services calling at a location with their travel times relative to the
/// lowest-indexed one. Entries are sorted by service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(Vec<(ServiceIdx, Seconds)>);

impl Signature {
    fn at(location: &LocationId, problem: &SchedulingProblem<'_>) -> Option<Self> {
        let mut entries: Vec<_> = problem
            .passing_through(location.as_str())
            .iter()
            .filter_map(|&s| {
                let travel = problem.service(s).travel_time_to(location.as_str())?;
                Some((s, travel))
            })
            .collect();
        entries.sort();
        let base = entries.first()?.1;
        for entry in &mut entries {
            entry.1 -= base;
        }
        Some(Signature(entries))
    }

    pub fn contains(&self, service: ServiceIdx) -> bool {
        self.relative_time(service).is_some()
    }

    /// Travel time of `service` relative to the signature's first service.
    pub fn relative_time(&self, service: ServiceIdx) -> Option<Seconds> {
        self.0
            .binary_search_by(|(s, _)| s.cmp(&service))
            .ok()
            .map(|i| self.0[i].1)
    }

    pub fn services(&self) -> impl Iterator<Item = ServiceIdx> + '_ {
        self.0.iter().map(|(s, _)| *s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `self` has strictly more services than `other`, including all
    /// of `other`'s, with the same relative timing between them.
    pub fn dominates(&self, other: &Signature) -> bool {
        if self.len() <= other.len() {
            return false;
        }
        let Some(&(anchor, _)) = other.0.first() else {
            return true;
        };
        let Some(anchor_time) = self.relative_time(anchor) else {
            return false;
        };
        other.0.iter().all(|&(service, time)| {
            self.relative_time(service)
                .is_some_and(|t| t - anchor_time == time)
        })
    }

    /// True if the services of `sequence` on this signature, dispatched since
    /// `candidate` last was, already span more than `candidate`'s headway.
    ///
    /// Only services calling here are counted, so this never rejects a
    /// sequence the full check would accept.
    pub fn rejects(
        &self,
        sequence: &[ServiceIdx],
        candidate: ServiceIdx,
        problem: &SchedulingProblem<'_>,
    ) -> bool {
        if !self.contains(candidate) {
            return false;
        }
        let restricted: Vec<ServiceIdx> = sequence
            .iter()
            .copied()
            .filter(|&s| self.contains(s))
            .collect();
        dispatch_is_too_late(&restricted, candidate, problem)
    }
}

/// Signatures of every location with a working-set service, linked from each
/// signature to the nearest signatures it dominates.
#[derive(Debug, Clone)]
pub struct DominanceGraph {
    signatures: Vec<Signature>,
    locations: Vec<BTreeSet<LocationId>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl DominanceGraph {
    pub fn build(problem: &SchedulingProblem<'_>) -> Self {
        let mut index: BTreeMap<Signature, usize> = BTreeMap::new();
        let mut signatures = Vec::new();
        let mut locations: Vec<BTreeSet<LocationId>> = Vec::new();

        for location in problem.locations() {
            let Some(signature) = Signature::at(location, problem) else {
                continue;
            };
            let i = *index.entry(signature.clone()).or_insert_with(|| {
                signatures.push(signature);
                locations.push(BTreeSet::new());
                signatures.len() - 1
            });
            locations[i].insert(location.clone());
        }

        let n = signatures.len();
        let mut children = vec![Vec::new(); n];
        let mut has_parent = vec![false; n];

        for child in 0..n {
            let dominators: Vec<usize> = (0..n)
                .filter(|&d| signatures[d].dominates(&signatures[child]))
                .collect();
            // Only the nearest dominators become parents.
            for &parent in &dominators {
                let nearest = !dominators
                    .iter()
                    .any(|&other| signatures[parent].dominates(&signatures[other]));
                if nearest {
                    children[parent].push(child);
                    has_parent[child] = true;
                }
            }
        }

        let roots = (0..n).filter(|&i| !has_parent[i]).collect();

        Self {
            signatures,
            locations,
            children,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Locations sharing each signature.
    pub fn locations(&self, node: usize) -> &BTreeSet<LocationId> {
        &self.locations[node]
    }

    /// Signatures no other signature dominates.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    /// Evaluate `accepts` over the graph bottom-up.
    ///
    /// A signature is only evaluated once all its dominated signatures have
    /// passed, and each signature is evaluated at most once. Returns true if
    /// every root passes.
    pub fn accepts(&self, mut accepts: impl FnMut(&Signature) -> bool) -> bool {
        let mut memo = vec![None; self.signatures.len()];
        self.roots
            .iter()
            .all(|&root| self.visit(root, &mut accepts, &mut memo))
    }

    fn visit(
        &self,
        node: usize,
        accepts: &mut impl FnMut(&Signature) -> bool,
        memo: &mut [Option<bool>],
    ) -> bool {
        if let Some(result) = memo[node] {
            return result;
        }
        let result = self.children[node]
            .iter()
            .all(|&child| self.visit(child, accepts, memo))
            && accepts(&self.signatures[node]);
        memo[node] = Some(result);
        result
    }
}
