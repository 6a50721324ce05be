pub mod fitness_record;

pub use fitness_record::{FitnessKind, FitnessRecord};
