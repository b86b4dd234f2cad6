/// Harness for driving an application from tests.
pub mod harness;
/// Recording scene and journal.
pub mod probe;
