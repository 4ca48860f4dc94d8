pub mod diversity_validator;
pub mod evolution_engine;
pub mod genome;
pub mod hall_of_fame;
pub mod operators;
pub mod population;
pub mod progress;

pub use diversity_validator::DiversityValidator;
pub use evolution_engine::{
    champion, ControllerState, Evaluation, EvolutionEngine, EvolutionResult, GenerationSummary,
    GenomeEvaluator, ProgressCallback,
};
pub use genome::{GeneDef, GeneKind, GeneSpec, Genome};
pub use hall_of_fame::{EliteStrategy, HallOfFame};
pub use population::{Population, PopulationManager};
pub use progress::{ChannelProgressCallback, LoggingProgressCallback, NoopProgressCallback, ProgressMessage};
