pub mod batch;
pub mod method;
pub mod pipet;
pub mod project;
pub mod sample;

pub use batch::Batch;
pub use method::TestMethod;
pub use pipet::Pipet;
pub use project::Project;
pub use sample::Sample;
pub use test::Test;
