pub mod choices;
pub mod executor;
pub mod layout;
pub mod pipeline;
pub mod preflight;
pub mod script;
pub mod sizing;
