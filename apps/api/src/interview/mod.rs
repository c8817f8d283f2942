// Structured screening interview.
// The pure core (catalog, models, sanitizer, reconcile, completion) has no I/O.
// The store, extractor and orchestrator wire it to storage and the model.
// The fixed-question mode is separate and only shares the store and locks.

pub mod catalog;
pub mod completion;
pub mod edits;
pub mod extractor;
pub mod fixed;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod reconcile;
pub mod sanitizer;
pub mod store;

#[cfg(test)]
pub mod test_support;
