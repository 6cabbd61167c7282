pub use crate::classify::*;
pub use crate::distribution::*;
pub use crate::error::*;
pub use crate::kernel::*;
pub use crate::linalg::*;
pub use crate::marginal::*;
pub use crate::path::*;
pub use crate::sampler::*;
pub use crate::simulation::*;
pub use crate::stationary::*;
pub use crate::units::*;
pub use crate::PROBABILITY_TOLERANCE;
