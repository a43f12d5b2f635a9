pub mod crawler;
pub mod hydrator;

pub use crawler::{Candidate, Crawler};
pub use hydrator::Hydrator;
