use fl_core::{NetworkSource, SourceMatch};

use crate::{PlayerError, Result};

/// The `SOURCE` part of an advertised `MACHINE (SOURCE)` name.
pub fn source_name_of(full_name: &str) -> Option<&str> {
    let close = full_name.rfind(')')?;
    let open = full_name[..close].rfind(" (")?;
    Some(&full_name[open + 2..close])
}

pub fn matches(policy: SourceMatch, advertised: &str, wanted: &str) -> bool {
    match policy {
        SourceMatch::SourceName => source_name_of(advertised) == Some(wanted),
        SourceMatch::FullName => advertised == wanted,
    }
}

/// First advertised source the wanted name resolves to.
pub fn find_source<'a>(
    sources: &'a [NetworkSource],
    wanted: &str,
    policy: SourceMatch,
) -> Option<&'a NetworkSource> {
    sources.iter().find(|source| matches(policy, &source.name, wanted))
}

/// Split `<scheme>://<source name>`, accepting only `scheme`.
pub fn parse_url<'a>(url: &'a str, scheme: &str) -> Result<&'a str> {
    let (found, location) = url
        .split_once("://")
        .ok_or_else(|| PlayerError::MalformedUrl(url.to_string()))?;

    if found != scheme {
        return Err(PlayerError::UnsupportedScheme(found.to_string()));
    }
    if location.is_empty() {
        return Err(PlayerError::MalformedUrl(url.to_string()));
    }

    Ok(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_extraction() {
        assert_eq!(source_name_of("STUDIO-PC (Camera 1)"), Some("Camera 1"));
        assert_eq!(source_name_of("A (B) (C)"), Some("C"));
        assert_eq!(source_name_of("HOST (out (left))"), Some("left)"));
        assert_eq!(source_name_of("HOST ()"), Some(""));
        assert_eq!(source_name_of("no parens"), None);
        assert_eq!(source_name_of("HOST(cam)"), None);
    }

    #[test]
    fn test_match_policies() {
        assert!(matches(SourceMatch::SourceName, "HOST (cam)", "cam"));
        assert!(!matches(SourceMatch::SourceName, "HOST (cam)", "HOST (cam)"));
        assert!(matches(SourceMatch::FullName, "HOST (cam)", "HOST (cam)"));
        assert!(!matches(SourceMatch::FullName, "HOST (cam)", "cam"));
        assert!(!matches(SourceMatch::SourceName, "HOST (Cam)", "cam"));
    }

    #[test]
    fn test_find_source_takes_first_match() {
        let sources = vec![
            NetworkSource::new("A (other)"),
            NetworkSource::new("A (cam)").with_address("10.0.0.1:5960"),
            NetworkSource::new("B (cam)"),
        ];

        let found = find_source(&sources, "cam", SourceMatch::SourceName).unwrap();
        assert_eq!(found.name, "A (cam)");
        assert!(find_source(&sources, "missing", SourceMatch::SourceName).is_none());
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(parse_url("ndimediain://Camera 1", "ndimediain").unwrap(), "Camera 1");
        assert_eq!(parse_url("ndimediain://a://b", "ndimediain").unwrap(), "a://b");
        assert!(matches!(
            parse_url("file://movie.mp4", "ndimediain"),
            Err(PlayerError::UnsupportedScheme(_))
        ));
        assert!(matches!(parse_url("Camera 1", "ndimediain"), Err(PlayerError::MalformedUrl(_))));
        assert!(matches!(parse_url("ndimediain://", "ndimediain"), Err(PlayerError::MalformedUrl(_))));
    }
}
