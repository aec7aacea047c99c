//! Injectable networking and randomness collaborators for the failure
//! detector: real implementations for production, fakes for tests.

mod rng;
mod udp;

pub use rng::{ChaChaRng, FakeRng, Rng};
pub use udp::{MioNet, Net, UdpEndpoint};
