//! Evidence reference → content address → gateway URL

use crate::config::GatewayConfig;
use crate::error::LocatorError;

/// Characters that cannot appear in a URL host label
const FORBIDDEN: &[char] = &['/', '?', '#', '@', ':', '\\'];

/// Where a piece of evidence lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEvidence {
    pub cid: String,
    pub url: String,
}

/// Pure string transformation, no network access.
///
/// CID syntax is not validated here; an unresolvable address fails at
/// fetch time.
#[derive(Debug, Clone)]
pub struct ContentLocator {
    prefix: String,
    gateway_domain: String,
}

impl ContentLocator {
    pub fn new(prefix: impl Into<String>, gateway_domain: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            gateway_domain: gateway_domain.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.evidence_prefix, &config.domain)
    }

    /// Strip the backend prefix, if present
    pub fn cid<'a>(&self, evidence: &'a str) -> Result<&'a str, LocatorError> {
        let evidence = evidence.trim();
        if evidence.is_empty() {
            return Err(LocatorError::Empty);
        }

        let cid = if self.prefix.is_empty() {
            evidence
        } else {
            evidence.strip_prefix(self.prefix.as_str()).unwrap_or(evidence)
        };

        if cid.is_empty()
            || cid.chars().any(|c| c.is_whitespace() || FORBIDDEN.contains(&c))
        {
            return Err(LocatorError::InvalidShape(evidence.to_string()));
        }
        Ok(cid)
    }

    /// Gateway URL for a CID
    pub fn url_for(&self, cid: &str) -> String {
        format!("https://{}.{}", cid, self.gateway_domain)
    }

    pub fn resolve(&self, evidence: &str) -> Result<ResolvedEvidence, LocatorError> {
        let cid = self.cid(evidence)?;
        Ok(ResolvedEvidence {
            cid: cid.to_string(),
            url: self.url_for(cid),
        })
    }
}

impl Default for ContentLocator {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prefix() {
        let locator = ContentLocator::default();
        let resolved = locator.resolve("storj-bafybeigdyr...===").unwrap();
        assert_eq!(resolved.cid, "bafybeigdyr...===");
        assert!(!resolved.cid.starts_with("storj-"));
        assert_eq!(resolved.url, "https://bafybeigdyr...===.ipfs.w3s.link");
    }

    #[test]
    fn test_strips_prefix_once() {
        let locator = ContentLocator::default();
        assert_eq!(locator.cid("storj-storj-abc").unwrap(), "storj-abc");
    }

    #[test]
    fn test_unprefixed_reference_is_the_cid() {
        let locator = ContentLocator::default();
        let resolved = locator.resolve("bafkreiabc").unwrap();
        assert_eq!(resolved.cid, "bafkreiabc");
        assert_eq!(resolved.url, "https://bafkreiabc.ipfs.w3s.link");
    }

    #[test]
    fn test_custom_gateway() {
        let locator = ContentLocator::new("ipfs://", "gw.example.org");
        let resolved = locator.resolve("ipfs://CIDXYZ").unwrap();
        assert_eq!(resolved.url, "https://CIDXYZ.gw.example.org");
    }

    #[test]
    fn test_rejects_unusable_references() {
        let locator = ContentLocator::default();
        assert_eq!(locator.resolve(""), Err(LocatorError::Empty));
        assert_eq!(locator.resolve("   "), Err(LocatorError::Empty));
        assert!(matches!(
            locator.resolve("storj-"),
            Err(LocatorError::InvalidShape(_))
        ));
        assert!(matches!(
            locator.resolve("storj-abc/def"),
            Err(LocatorError::InvalidShape(_))
        ));
        assert!(matches!(
            locator.resolve("https://evil.example/x"),
            Err(LocatorError::InvalidShape(_))
        ));
        assert!(matches!(
            locator.resolve("storj-a b"),
            Err(LocatorError::InvalidShape(_))
        ));
    }
}
