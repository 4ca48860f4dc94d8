use crate::engines::generation::genome::Genome;
use crate::engines::metrics::PerformanceMetrics;
use crate::types::GenomeId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EliteStrategy {
    pub genome: Genome,
    pub fitness: f64,
    pub metrics: PerformanceMetrics,
    /// Generation in which this entry was first recorded
    pub generation: usize,
}

/// Best distinct genomes seen across the whole run
pub struct HallOfFame {
    strategies: Vec<EliteStrategy>,
    max_size: usize,
    seen_ids: HashSet<GenomeId>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            strategies: Vec::new(),
            max_size,
            seen_ids: HashSet::new(),
        }
    }

    /// Attempt to add a strategy. Elites carried over between generations keep
    /// their id and are only recorded once.
    pub fn try_add(&mut self, strategy: EliteStrategy) -> bool {
        if self.max_size == 0 || !strategy.fitness.is_finite() {
            return false;
        }
        if self.seen_ids.contains(&strategy.genome.id()) {
            return false;
        }
        if self.strategies.len() >= self.max_size
            && self.strategies.last().is_some_and(|worst| worst.fitness >= strategy.fitness)
        {
            return false;
        }

        self.seen_ids.insert(strategy.genome.id());
        self.strategies.push(strategy);
        self.sort_and_trim();
        true
    }

    fn sort_and_trim(&mut self) {
        self.strategies.sort_by(|a, b| {
            b.fitness.partial_cmp(&a.fitness).unwrap_or(std::cmp::Ordering::Equal)
        });

        while self.strategies.len() > self.max_size {
            if let Some(removed) = self.strategies.pop() {
                self.seen_ids.remove(&removed.genome.id());
            }
        }
    }

    pub fn best(&self) -> Option<&EliteStrategy> {
        self.strategies.first()
    }

    pub fn get_all(&self) -> &[EliteStrategy] {
        &self.strategies
    }

    pub fn get_top_n(&self, n: usize) -> &[EliteStrategy] {
        &self.strategies[..n.min(self.strategies.len())]
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
