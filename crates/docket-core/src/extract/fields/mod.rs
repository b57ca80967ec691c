//! Per-field pattern extractors.

pub mod container;
pub mod dates;
pub mod parties;
pub mod references;
pub mod voyage;
pub mod weights;

pub use container::{iso6346_check_digit, validate_container, ContainerExtractor};
pub use dates::{DateExtractor, DateLabel, LabeledDateExtractor};
pub use parties::{PartyExtractor, PartyRole};
pub use references::{is_ched, BlNumberExtractor, CertificateNumberExtractor, TracesExtractor};
pub use voyage::{PortExtractor, PortRole, VesselExtractor, VoyageExtractor};
pub use weights::{parse_quantity, WeightExtractor, WeightKind};
