use super::traits::{invalid, ConfigSection};
use crate::error::AetraderError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub max_generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub tournament_size: usize,
    pub elite_count: usize,
    /// Minimum improvement of the best fitness that counts as progress
    pub convergence_epsilon: f64,
    /// Generations without progress before the run is declared converged
    pub patience: usize,
    pub hall_of_fame_size: usize,
    pub seed: Option<u64>,
    pub diversity: DiversityConfig,
}

/// Diversity floor: when too much of the population collapses onto one gene
/// vector, part of the offspring is replaced by fresh random genomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    pub enabled: bool,
    /// Max normalized per-gene distance for two genomes to count as near-identical
    pub similarity_tolerance: f64,
    pub collapse_fraction: f64,
    pub replace_fraction: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 40,
            mutation_rate: 0.15,
            crossover_rate: 0.85,
            tournament_size: 3,
            elite_count: 2,
            convergence_epsilon: 1e-6,
            patience: 8,
            hall_of_fame_size: 10,
            seed: None,
            diversity: DiversityConfig::default(),
        }
    }
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_tolerance: 0.01,
            collapse_fraction: 0.6,
            replace_fraction: 0.2,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), AetraderError> {
        if self.population_size < 2 {
            return Err(invalid::<Self>("population_size must be at least 2"));
        }
        if self.max_generations == 0 {
            return Err(invalid::<Self>("max_generations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(invalid::<Self>("mutation_rate must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(invalid::<Self>("crossover_rate must be between 0 and 1"));
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(invalid::<Self>(
                "tournament_size must be between 1 and population_size",
            ));
        }
        if self.elite_count >= self.population_size {
            return Err(invalid::<Self>("elite_count must be below population_size"));
        }
        if !(self.convergence_epsilon >= 0.0) {
            return Err(invalid::<Self>("convergence_epsilon must be non-negative"));
        }
        if self.patience == 0 {
            return Err(invalid::<Self>("patience must be at least 1"));
        }
        let d = &self.diversity;
        if !(d.similarity_tolerance >= 0.0)
            || !(0.0..=1.0).contains(&d.collapse_fraction)
            || !(0.0..=1.0).contains(&d.replace_fraction)
        {
            return Err(invalid::<Self>(
                "diversity fractions must be in [0, 1] and tolerance non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn elite_count_must_leave_room_for_offspring() {
        let config = EvolutionConfig {
            population_size: 4,
            elite_count: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AetraderError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn tournament_larger_than_population_is_rejected() {
        let config = EvolutionConfig {
            population_size: 5,
            tournament_size: 6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
