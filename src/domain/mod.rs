// Domain layer: registration entities and the ports to the outside world.

pub mod model;
pub mod ports;
