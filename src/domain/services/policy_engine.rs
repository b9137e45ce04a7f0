//! Policy Engine
//!
//! Pure domain logic turning a classified address and an optional lookup
//! outcome into a verdict. Every ambiguous branch denies.

use crate::domain::ports::ResolutionError;
use crate::domain::value_objects::{AddressClass, CountryCode, Decision, VerdictReason};
use std::collections::HashSet;

/// The access policy: who may pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub allowed_countries: HashSet<CountryCode>,
    pub allow_local_requests: bool,
}

impl Policy {
    pub fn new(
        allowed_countries: impl IntoIterator<Item = CountryCode>,
        allow_local_requests: bool,
    ) -> Self {
        Self {
            allowed_countries: allowed_countries.into_iter().collect(),
            allow_local_requests,
        }
    }

    pub fn allows_country(&self, country: &CountryCode) -> bool {
        self.allowed_countries.contains(country)
    }
}

pub struct PolicyEngine;

impl PolicyEngine {
    /// Decide one candidate address.
    ///
    /// `lookup` is the country resolution for a public address; it is
    /// ignored for invalid and private ones. A public address without a
    /// lookup outcome is treated as a failed lookup.
    pub fn decide(
        class: &AddressClass,
        lookup: Option<&Result<CountryCode, ResolutionError>>,
        policy: &Policy,
    ) -> Decision {
        match class {
            AddressClass::Invalid => Decision::deny(VerdictReason::InvalidAddress),
            AddressClass::Private(_) if policy.allow_local_requests => {
                Decision::allow(VerdictReason::LocalAllowed)
            }
            AddressClass::Private(_) => Decision::deny(VerdictReason::LocalDenied),
            AddressClass::Public(_) => match lookup {
                Some(Ok(country)) if policy.allows_country(country) => {
                    Decision::allow(VerdictReason::CountryAllowed)
                }
                Some(Ok(_)) => Decision::deny(VerdictReason::CountryDenied),
                Some(Err(_)) | None => Decision::deny(VerdictReason::LookupFailed),
            },
        }
    }
}
