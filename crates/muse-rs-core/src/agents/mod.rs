//! Agent prompt builders around the completion gateway.
//!
//! Each agent assembles a prompt from iteration-store context, calls the
//! gateway, and parses the free-text response into the structured record
//! types. The agents own no state beyond learned feedback; the store is
//! the single source of truth.

mod creator;
mod evaluator;
mod feedback;

pub use creator::ContentCreator;
pub use evaluator::Evaluator;
pub use feedback::FeedbackSynthesizer;
