// Domain layer: request/record models and the ports (transport, clock, storage) the core runs against.

pub mod model;
pub mod ports;
