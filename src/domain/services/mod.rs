mod address_classifier;
mod client_address;
mod policy_engine;

pub use address_classifier::{AddressClassifier, AddressError};
pub use client_address::ClientAddressResolver;
pub use policy_engine::{Policy, PolicyEngine};
