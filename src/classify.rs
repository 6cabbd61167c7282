//! Structural properties of a kernel that only depend on which transitions
//! have positive probability.

use std::collections::VecDeque;

use hashbrown::HashSet;
use itertools::Itertools;
use petgraph::algo::tarjan_scc;
use petgraph::visit::EdgeRef;

use crate::prelude::*;

/// Sets of mutually reachable states, each sorted, ordered by smallest member.
pub fn communication_classes(kernel: &Kernel) -> Vec<Vec<StateIndex>> {
    let graph = kernel.graph();
    tarjan_scc(&graph)
        .into_iter()
        .map(|component| {
            component
                .into_iter()
                .map(|node| graph[node])
                .sorted()
                .collect::<Vec<_>>()
        })
        .sorted()
        .collect()
}

/// Communication classes that cannot be left once entered.
pub fn recurrent_classes(kernel: &Kernel) -> Vec<Vec<StateIndex>> {
    communication_classes(kernel)
        .into_iter()
        .filter(|class| {
            let members = class.iter().copied().collect::<HashSet<_>>();
            class.iter().all(|state| {
                kernel
                    .as_array()
                    .row(state.to_usize())
                    .iter()
                    .enumerate()
                    .all(|(next, probability)| {
                        *probability <= 0. || members.contains(&StateIndex::from(next))
                    })
            })
        })
        .collect()
}

pub fn is_irreducible(kernel: &Kernel) -> bool {
    communication_classes(kernel).len() == 1
}

/// Period of an irreducible kernel, `None` if the kernel is reducible.
///
/// Uses breadth-first levels from state 0: the period is the gcd of
/// `level(u) + 1 - level(v)` over all edges `u -> v`.
pub fn period(kernel: &Kernel) -> Option<usize> {
    if !is_irreducible(kernel) {
        return None;
    }
    let graph = kernel.graph();
    let mut levels = vec![None; graph.node_count()];
    let mut queue = VecDeque::new();
    let start = graph.node_indices().next()?;
    levels[start.index()] = Some(0usize);
    queue.push_back(start);
    let mut period = 0;
    while let Some(node) = queue.pop_front() {
        let level = levels[node.index()]?;
        for edge in graph.edges(node) {
            let target = edge.target();
            match levels[target.index()] {
                None => {
                    levels[target.index()] = Some(level + 1);
                    queue.push_back(target);
                }
                Some(target_level) => {
                    period = gcd(period, (level + 1).abs_diff(target_level));
                }
            }
        }
    }
    Some(period.max(1))
}

pub fn is_aperiodic(kernel: &Kernel) -> bool {
    period(kernel) == Some(1)
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
