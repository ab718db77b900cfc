/*!
 * Monitoring
 * Tracing setup and timed spans for resource lifecycles
 */

mod tracer;

pub use tracer::{init_tracing, LifecycleSpan};
