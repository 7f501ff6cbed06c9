pub mod cli;
pub mod env;
pub mod evolution;
pub mod neat;
pub mod visualize;
