mod least_connections;
mod random;
mod round_robin;
mod weighted;

pub use least_connections::LeastConnections;
pub use random::Random;
pub use round_robin::RoundRobin;
pub use weighted::Weighted;
