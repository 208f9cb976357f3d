// Board pipeline stages, in the order a render runs them.

pub mod period;
pub mod metrics;
pub mod recency;
pub mod sampler;
pub mod employees;
pub mod dashboard;
