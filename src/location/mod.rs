pub mod acceptance;
pub mod fix;

pub use acceptance::{AcceptancePolicy, AggregatedAcceptance, NativeAcceptance, ProviderKind};
pub use fix::{AcceptedLocation, LocationFix};
