mod bounds;
mod fizzle_args;
mod logging;

pub use bounds::BoundingRect;
pub use fizzle_args::FizzleArgs;

pub use tracing;
