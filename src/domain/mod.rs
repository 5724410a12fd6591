// Domain layer: concept models and ports. Adapters live under `config` and `store`.

pub mod model;
pub mod ports;
