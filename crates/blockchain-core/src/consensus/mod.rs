pub mod sampler;

pub use sampler::{Sampler, Vote};
