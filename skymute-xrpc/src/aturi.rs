use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A parsed `at://` URI.
///
/// Only the shape the workspace needs is modeled: an authority (a DID or
/// handle) optionally followed by a collection NSID and a record key, e.g.
/// `at://did:plc:abc123/app.bsky.graph.list/3kxyz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUri {
    /// The repository the URI addresses, usually a DID.
    pub authority: String,
    pub collection: Option<String>,
    pub rkey: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtUriError {
    #[error("at-uri must start with \"at://\"")]
    MissingScheme,
    #[error("at-uri has an empty authority")]
    EmptyAuthority,
    #[error("at-uri has an empty path segment")]
    EmptySegment,
}

impl FromStr for AtUri {
    type Err = AtUriError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let rest = input.strip_prefix("at://").ok_or(AtUriError::MissingScheme)?;
        let mut segments = rest.splitn(3, '/');

        let authority = segments.next().unwrap_or_default();
        if authority.is_empty() {
            return Err(AtUriError::EmptyAuthority);
        }

        let collection = segments.next().map(str::to_string);
        let rkey = segments.next().map(str::to_string);
        if collection.as_deref() == Some("") || rkey.as_deref() == Some("") {
            return Err(AtUriError::EmptySegment);
        }

        Ok(AtUri {
            authority: authority.to_string(),
            collection,
            rkey,
        })
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}", self.authority)?;
        if let Some(collection) = &self.collection {
            write!(f, "/{collection}")?;
        }
        if let Some(rkey) = &self.rkey {
            write!(f, "/{rkey}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_record_uri() {
        let uri: AtUri = "at://did:plc:abc123/app.bsky.graph.list/3kxyz"
            .parse()
            .unwrap();
        assert_eq!(uri.authority, "did:plc:abc123");
        assert_eq!(uri.collection.as_deref(), Some("app.bsky.graph.list"));
        assert_eq!(uri.rkey.as_deref(), Some("3kxyz"));
    }

    #[test]
    fn parses_bare_authority() {
        let uri: AtUri = "at://did:plc:abc123".parse().unwrap();
        assert_eq!(uri.authority, "did:plc:abc123");
        assert_eq!(uri.collection, None);
        assert_eq!(uri.rkey, None);
    }

    #[test]
    fn display_round_trips() {
        let raw = "at://did:plc:abc123/app.bsky.graph.list/3kxyz";
        let uri: AtUri = raw.parse().unwrap();
        assert_eq!(uri.to_string(), raw);
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(
            "https://example.com".parse::<AtUri>(),
            Err(AtUriError::MissingScheme)
        );
    }

    #[test]
    fn rejects_empty_authority_and_segments() {
        assert_eq!("at://".parse::<AtUri>(), Err(AtUriError::EmptyAuthority));
        assert_eq!(
            "at://did:plc:abc//rkey".parse::<AtUri>(),
            Err(AtUriError::EmptySegment)
        );
    }
}
