pub mod fps;
pub mod tracing;
