mod run;

pub use run::{hint, run};
