pub mod prompt;
pub mod protected;
pub mod public;
