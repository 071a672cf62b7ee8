//! Built-in intelligence providers.
//!
//! Status policy differs per provider and is kept local to each one:
//!
//! | id            | known empty | failure flag in 200 body |
//! |---------------|-------------|--------------------------|
//! | greynoise     | 404         | -                        |
//! | ipapi         | -           | -                        |
//! | ipwhois       | -           | `success == false`       |
//! | shodan        | 404         | -                        |
//! | stopforumspam | -           | `success != 1`           |
//!
//! Registration is explicit: call `register_builtin` on a registry.

mod greynoise;
mod ipapi;
mod ipwhois;
mod shodan;
mod stopforumspam;

pub use greynoise::{GreyNoise, GreyNoiseResponse};
pub use ipapi::{IpApi, IpApiResponse};
pub use ipwhois::{IpWhois, IpWhoisResponse};
pub use shodan::{Shodan, ShodanResponse};
pub use stopforumspam::{StopForumSpam, StopForumSpamResponse};

use std::sync::Arc;

use crate::errors::Result;
use crate::registry::SourceRegistry;
use crate::sources::Source;

/// Every built-in provider, freshly constructed.
pub fn builtin() -> Result<Vec<Arc<dyn Source>>> {
    Ok(vec![
        Arc::new(GreyNoise::new()?),
        Arc::new(IpApi::new()?),
        Arc::new(IpWhois::new()?),
        Arc::new(Shodan::new()?),
        Arc::new(StopForumSpam::new()?),
    ])
}

/// Add every built-in provider to `registry`.
pub fn register_builtin(registry: &SourceRegistry) -> Result<()> {
    for source in builtin()? {
        registry.register_arc(source)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IpEnrichError;

    #[test]
    fn builtin_ids_are_stable() {
        let registry = SourceRegistry::new();
        register_builtin(&registry).unwrap();
        assert_eq!(
            registry.ids(),
            ["greynoise", "ipapi", "ipwhois", "shodan", "stopforumspam"]
        );
    }

    #[test]
    fn registering_twice_is_rejected() {
        let registry = SourceRegistry::new();
        register_builtin(&registry).unwrap();
        let err = register_builtin(&registry).unwrap_err();
        assert!(matches!(err, IpEnrichError::DuplicateSource { .. }));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn builtins_extend_a_built_registry() {
        let registry = SourceRegistry::builder()
            .with_source(Shodan::new().unwrap())
            .build()
            .unwrap();
        let err = register_builtin(&registry).unwrap_err();
        assert!(matches!(err, IpEnrichError::DuplicateSource { ref id } if id == "shodan"));

        let fresh = SourceRegistry::builder().build().unwrap();
        register_builtin(&fresh).unwrap();
        assert_eq!(fresh.len(), 5);
    }
}
