//! Genome representation for the strategy search
//!
//! A genome is an ordered vector of typed genes. The `GeneSpec` says how many genes
//! there are and which range each one may take; the backtester decodes the vector into
//! a `RuleStrategy` (see `engines::evaluation::strategy`).
//!
//! Genomes are immutable: mutation and crossover always build new individuals with a
//! fresh id, so lineage only ever points backwards in time. Identity is the id, not the
//! gene vector.
use crate::error::{AetraderError, Result};
use crate::types::GenomeId;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GeneKind {
    Float { min: f64, max: f64 },
    Integer { min: i64, max: i64 },
    /// One of `options` discrete choices, encoded as `0..options`
    Choice { options: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneDef {
    pub name: String,
    pub kind: GeneKind,
}

impl GeneDef {
    pub fn float(name: &str, min: f64, max: f64) -> Self {
        Self { name: name.to_string(), kind: GeneKind::Float { min, max } }
    }

    pub fn integer(name: &str, min: i64, max: i64) -> Self {
        Self { name: name.to_string(), kind: GeneKind::Integer { min, max } }
    }

    pub fn choice(name: &str, options: u32) -> Self {
        Self { name: name.to_string(), kind: GeneKind::Choice { options } }
    }

    /// Inclusive bounds as floats
    pub fn bounds(&self) -> (f64, f64) {
        match self.kind {
            GeneKind::Float { min, max } => (min, max),
            GeneKind::Integer { min, max } => (min as f64, max as f64),
            GeneKind::Choice { options } => (0.0, options.saturating_sub(1) as f64),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        let (min, max) = self.bounds();
        if !value.is_finite() || value < min || value > max {
            return false;
        }
        match self.kind {
            GeneKind::Float { .. } => true,
            GeneKind::Integer { .. } | GeneKind::Choice { .. } => value.fract() == 0.0,
        }
    }

    /// Nearest legal value. Non-finite input maps to the lower bound.
    pub fn clamp(&self, value: f64) -> f64 {
        let (min, max) = self.bounds();
        if !value.is_finite() {
            return min;
        }
        match self.kind {
            GeneKind::Float { .. } => value.clamp(min, max),
            GeneKind::Integer { .. } | GeneKind::Choice { .. } => value.round().clamp(min, max),
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match self.kind {
            GeneKind::Float { min, max } if max > min => rng.gen_range(min..=max),
            GeneKind::Float { min, .. } => min,
            GeneKind::Integer { min, max } => rng.gen_range(min..=max.max(min)) as f64,
            GeneKind::Choice { options } => rng.gen_range(0..options.max(1)) as f64,
        }
    }

    /// Random legal neighbour of `value`
    pub fn perturb<R: Rng>(&self, value: f64, rng: &mut R) -> f64 {
        match self.kind {
            GeneKind::Float { min, max } => {
                let step = (max - min) * 0.1;
                self.clamp(value + rng.gen_range(-1.0..=1.0) * step)
            }
            GeneKind::Integer { min, max } => {
                let step = (((max - min) as f64) * 0.1).round().max(1.0) as i64;
                let mut delta = rng.gen_range(-step..=step);
                if delta == 0 {
                    delta = if rng.gen_bool(0.5) { 1 } else { -1 };
                }
                self.clamp(value + delta as f64)
            }
            GeneKind::Choice { options } if options > 1 => {
                let current = self.clamp(value) as u32;
                let shift = rng.gen_range(1..options);
                ((current + shift) % options) as f64
            }
            GeneKind::Choice { .. } => 0.0,
        }
    }

    fn validate(&self) -> Result<()> {
        let ok = match self.kind {
            GeneKind::Float { min, max } => min.is_finite() && max.is_finite() && min <= max,
            GeneKind::Integer { min, max } => min <= max,
            GeneKind::Choice { options } => options > 0,
        };
        if ok {
            Ok(())
        } else {
            Err(AetraderError::ConfigurationInvalid(format!(
                "gene '{}' has an empty range",
                self.name
            )))
        }
    }
}

/// Ordered gene layout shared by every genome in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneSpec {
    genes: Vec<GeneDef>,
}

impl GeneSpec {
    pub fn new(genes: Vec<GeneDef>) -> Result<Self> {
        if genes.is_empty() {
            return Err(AetraderError::ConfigurationInvalid("gene spec is empty".to_string()));
        }
        for gene in &genes {
            gene.validate()?;
        }
        Ok(Self { genes })
    }

    pub fn genes(&self) -> &[GeneDef] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    id: GenomeId,
    genes: Vec<f64>,
    generation_born: usize,
    parents: Vec<GenomeId>,
}

impl PartialEq for Genome {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Genome {}

impl std::hash::Hash for Genome {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Genome {
    /// Builds a genome from an explicit gene vector. Used for offspring and when
    /// restoring persisted genomes; callers are expected to `repair` untrusted input.
    pub fn from_parts(
        id: GenomeId,
        genes: Vec<f64>,
        generation_born: usize,
        parents: Vec<GenomeId>,
    ) -> Result<Self> {
        if parents.len() > 2 {
            return Err(AetraderError::InvalidGenome(format!(
                "genome {} lists {} parents",
                id,
                parents.len()
            )));
        }
        if parents.contains(&id) {
            return Err(AetraderError::InvalidGenome(format!("genome {} is its own parent", id)));
        }
        Ok(Self { id, genes, generation_born, parents })
    }

    pub(crate) fn offspring<R: Rng>(
        rng: &mut R,
        genes: Vec<f64>,
        generation: usize,
        parents: Vec<GenomeId>,
    ) -> Self {
        Self {
            id: GenomeId(rng.gen()),
            genes,
            generation_born: generation,
            parents,
        }
    }

    pub fn create_random<R: Rng>(rng: &mut R, spec: &GeneSpec, generation: usize) -> Self {
        let genes = spec.genes().iter().map(|g| g.sample(rng)).collect();
        Self::offspring(rng, genes, generation, Vec::new())
    }

    /// Mutated copy. Each gene is perturbed with probability `rate`; the result is
    /// always inside the spec.
    pub fn mutate<R: Rng>(
        &self,
        rng: &mut R,
        spec: &GeneSpec,
        rate: f64,
        generation: usize,
    ) -> Result<Self> {
        self.check_length(spec)?;
        let genes = mutate_genes(&self.genes, spec, rate, rng);
        Ok(Self::offspring(rng, genes, generation, vec![self.id]))
    }

    /// Uniform crossover: two children, each gene taken from one parent and the other
    /// child receiving the complementary gene.
    pub fn crossover<R: Rng>(
        a: &Genome,
        b: &Genome,
        rng: &mut R,
        generation: usize,
    ) -> Result<(Genome, Genome)> {
        if a.genes.len() != b.genes.len() {
            return Err(AetraderError::InvalidGenome(format!(
                "cannot cross {} ({} genes) with {} ({} genes)",
                a.id,
                a.genes.len(),
                b.id,
                b.genes.len()
            )));
        }
        let (genes_a, genes_b) = uniform_crossover(&a.genes, &b.genes, rng);
        let parents = vec![a.id, b.id];
        Ok((
            Self::offspring(rng, genes_a, generation, parents.clone()),
            Self::offspring(rng, genes_b, generation, parents),
        ))
    }

    /// Copy with every gene moved to its nearest legal value. Keeps the id: the repaired
    /// genome is the same individual.
    pub fn repair(&self, spec: &GeneSpec) -> Result<Self> {
        self.check_length(spec)?;
        let genes = self
            .genes
            .iter()
            .zip(spec.genes())
            .map(|(value, def)| def.clamp(*value))
            .collect();
        let repaired = Self { genes, ..self.clone() };
        repaired.validate(spec)?;
        Ok(repaired)
    }

    pub fn validate(&self, spec: &GeneSpec) -> Result<()> {
        self.check_length(spec)?;
        for (value, def) in self.genes.iter().zip(spec.genes()) {
            if !def.contains(*value) {
                return Err(AetraderError::InvalidGenome(format!(
                    "genome {}: gene '{}' = {} outside {:?}",
                    self.id, def.name, value, def.bounds()
                )));
            }
        }
        Ok(())
    }

    fn check_length(&self, spec: &GeneSpec) -> Result<()> {
        if self.genes.len() != spec.len() {
            return Err(AetraderError::InvalidGenome(format!(
                "genome {} has {} genes, spec expects {}",
                self.id,
                self.genes.len(),
                spec.len()
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> GenomeId {
        self.id
    }

    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    pub fn generation_born(&self) -> usize {
        self.generation_born
    }

    pub fn parents(&self) -> &[GenomeId] {
        &self.parents
    }
}

/// Gene-level mutation, shared by `Genome::mutate` and offspring production
pub fn mutate_genes<R: Rng>(genes: &[f64], spec: &GeneSpec, rate: f64, rng: &mut R) -> Vec<f64> {
    genes
        .iter()
        .zip(spec.genes())
        .map(|(value, def)| {
            if rng.gen::<f64>() < rate {
                def.perturb(*value, rng)
            } else {
                def.clamp(*value)
            }
        })
        .collect()
}

/// Gene-level uniform crossover
pub fn uniform_crossover<R: Rng>(a: &[f64], b: &[f64], rng: &mut R) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .map(|(x, y)| if rng.gen_bool(0.5) { (*x, *y) } else { (*y, *x) })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec() -> GeneSpec {
        GeneSpec::new(vec![
            GeneDef::float("threshold", -1.0, 1.0),
            GeneDef::integer("window", 2, 50),
            GeneDef::choice("combinator", 4),
        ])
        .unwrap()
    }

    #[test]
    fn random_genome_is_valid() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let genome = Genome::create_random(&mut rng, &spec(), 0);
            assert!(genome.validate(&spec()).is_ok());
            assert!(genome.parents().is_empty());
        }
    }

    #[test]
    fn mutate_builds_new_individual() {
        let mut rng = StdRng::seed_from_u64(2);
        let parent = Genome::create_random(&mut rng, &spec(), 0);
        let child = parent.mutate(&mut rng, &spec(), 1.0, 1).unwrap();

        assert_ne!(child.id(), parent.id());
        assert_eq!(child.parents(), &[parent.id()]);
        assert_eq!(child.generation_born(), 1);
        assert!(child.validate(&spec()).is_ok());
    }

    #[test]
    fn identity_is_by_id() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = Genome::create_random(&mut rng, &spec(), 0);
        let twin = Genome::from_parts(GenomeId(a.id().0 + 1), a.genes().to_vec(), 0, vec![]).unwrap();
        assert_ne!(a, twin);
        assert_eq!(a, a.repair(&spec()).unwrap());
    }

    #[test]
    fn crossover_yields_two_children_with_both_parents() {
        let mut rng = StdRng::seed_from_u64(4);
        let a = Genome::create_random(&mut rng, &spec(), 0);
        let b = Genome::create_random(&mut rng, &spec(), 0);
        let (c, d) = Genome::crossover(&a, &b, &mut rng, 1).unwrap();

        assert_eq!(c.parents(), &[a.id(), b.id()]);
        assert_eq!(d.parents(), &[a.id(), b.id()]);
        for i in 0..spec().len() {
            let pair = (c.genes()[i], d.genes()[i]);
            assert!(
                pair == (a.genes()[i], b.genes()[i]) || pair == (b.genes()[i], a.genes()[i]),
                "gene {} not complementary",
                i
            );
        }
    }

    #[test]
    fn repair_clamps_and_rounds() {
        let broken = Genome::from_parts(GenomeId(9), vec![3.5, 7.6, f64::NAN], 0, vec![]).unwrap();
        let repaired = broken.repair(&spec()).unwrap();
        assert_eq!(repaired.genes(), &[1.0, 8.0, 0.0]);
    }

    #[test]
    fn repair_rejects_wrong_length() {
        let short = Genome::from_parts(GenomeId(9), vec![0.0], 0, vec![]).unwrap();
        assert!(matches!(short.repair(&spec()), Err(AetraderError::InvalidGenome(_))));
    }

    #[test]
    fn lineage_is_bounded_and_acyclic() {
        let ids = vec![GenomeId(1), GenomeId(2), GenomeId(3)];
        assert!(Genome::from_parts(GenomeId(4), vec![0.0, 2.0, 0.0], 0, ids).is_err());
        assert!(Genome::from_parts(GenomeId(4), vec![0.0, 2.0, 0.0], 0, vec![GenomeId(4)]).is_err());
    }

    #[test]
    fn serde_round_trip_keeps_lineage() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = Genome::create_random(&mut rng, &spec(), 0);
        let child = a.mutate(&mut rng, &spec(), 0.5, 3).unwrap();
        let json = serde_json::to_string(&child).unwrap();
        let restored: Genome = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id(), child.id());
        assert_eq!(restored.genes(), child.genes());
        assert_eq!(restored.parents(), child.parents());
        assert_eq!(restored.generation_born(), 3);
    }
}
