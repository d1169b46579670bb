pub mod evo2_integration;
pub mod scorer;

pub use evo2_integration::Evo2Worker;
pub use scorer::LikelihoodScorer;
