use crate::config::DiversityConfig;
use crate::engines::generation::genome::{GeneSpec, Genome};

/// Detects a population that has collapsed onto one gene vector
pub struct DiversityValidator {
    similarity_tolerance: f64,
    collapse_fraction: f64,
}

impl DiversityValidator {
    pub fn new(config: &DiversityConfig) -> Self {
        Self {
            similarity_tolerance: config.similarity_tolerance,
            collapse_fraction: config.collapse_fraction,
        }
    }

    /// Largest per-gene distance between `a` and `b`, each gene scaled by its range.
    /// 0 means identical, 1 means at opposite ends of some gene's range.
    pub fn distance(spec: &GeneSpec, a: &Genome, b: &Genome) -> f64 {
        a.genes()
            .iter()
            .zip(b.genes())
            .zip(spec.genes())
            .map(|((x, y), def)| {
                let (min, max) = def.bounds();
                let range = max - min;
                if range > 0.0 {
                    ((x - y) / range).abs()
                } else {
                    0.0
                }
            })
            .fold(0.0, f64::max)
    }

    /// Size of the largest group of genomes within tolerance of a single member
    pub fn largest_cluster(&self, spec: &GeneSpec, genomes: &[Genome]) -> usize {
        genomes
            .iter()
            .map(|center| {
                genomes
                    .iter()
                    .filter(|other| Self::distance(spec, center, other) <= self.similarity_tolerance)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    pub fn is_collapsed(&self, spec: &GeneSpec, genomes: &[Genome]) -> bool {
        if genomes.len() < 2 {
            return false;
        }
        let cluster = self.largest_cluster(spec, genomes);
        cluster as f64 > self.collapse_fraction * genomes.len() as f64
    }
}
