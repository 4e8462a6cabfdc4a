pub mod resolver_config;
pub mod validation;

pub use resolver_config::*;
pub use validation::*;
