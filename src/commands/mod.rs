//! # CLI Command Implementations
//!
//! One module per subcommand of `gradle-relocate`. Each holds a clap `Args`
//! struct and an `execute` function that turns the arguments into library
//! calls and prints operator-facing output.

pub mod aggregate;
pub mod inspect;
pub mod migrate;
