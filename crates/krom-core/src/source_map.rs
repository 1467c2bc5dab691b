use indexmap::IndexMap;

/// Placeholder substituted with the session's web root.
pub const WEB_ROOT_PATTERN: &str = "${webRoot}";

/// Ordered table of source-map URL patterns to local path patterns. Order is
/// significant: the engine uses the first matching entry.
pub type SourceMapPathOverrides = IndexMap<String, String>;

/// Result of resolving `${webRoot}` in an override table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOverrides {
    pub overrides: SourceMapPathOverrides,
    /// Configuration problems noticed while resolving. Each one is also
    /// logged.
    pub warnings: Vec<String>,
}

/// Overrides applied when the launch configuration does not carry its own
/// table. They cover the virtual URL schemes emitted by common bundlers.
pub fn default_source_map_path_overrides() -> SourceMapPathOverrides {
    [
        ("webpack:///./~/*", "${webRoot}/node_modules/*"),
        ("webpack:///./*", "${webRoot}/*"),
        ("webpack:///*", "*"),
        ("webpack:///src/*", "${webRoot}/*"),
        ("meteor://💻app/*", "${webRoot}/*"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (pattern.to_owned(), replacement.to_owned()))
    .collect()
}

/// Resolve the table a session should use: the caller's own table when given
/// (warning about a missing web root), the defaults otherwise.
pub fn resolve_source_map_path_overrides(
    web_root: Option<&str>,
    supplied: Option<&SourceMapPathOverrides>,
) -> ResolvedOverrides {
    match supplied {
        Some(overrides) => resolve_web_root_pattern(web_root, overrides, true),
        None => resolve_web_root_pattern(web_root, &default_source_map_path_overrides(), false),
    }
}

/// Returns a copy of `overrides` with a leading `${webRoot}` substituted in
/// every value.
///
/// `${webRoot}` is only meaningful at the start of a value; anywhere else the
/// entry is kept verbatim and a warning is recorded.
pub fn resolve_web_root_pattern(
    web_root: Option<&str>,
    overrides: &SourceMapPathOverrides,
    warn_on_missing: bool,
) -> ResolvedOverrides {
    let web_root = web_root.filter(|root| !root.is_empty());
    let mut resolved = ResolvedOverrides::default();

    for (pattern, replacement) in overrides {
        let value = match replacement.find(WEB_ROOT_PATTERN) {
            Some(0) => match web_root {
                Some(root) => format!("{root}{}", &replacement[WEB_ROOT_PATTERN.len()..]),
                None => {
                    if warn_on_missing {
                        resolved.warnings.push(format!(
                            "sourceMapPathOverrides entry {pattern:?} contains ${{webRoot}}, but webRoot is not set"
                        ));
                    }
                    replacement.clone()
                }
            },
            Some(_) => {
                resolved.warnings.push(format!(
                    "in sourceMapPathOverrides entry {pattern:?}, ${{webRoot}} is only valid at the beginning of the path"
                ));
                replacement.clone()
            }
            None => replacement.clone(),
        };
        resolved.overrides.insert(pattern.clone(), value);
    }

    for warning in &resolved.warnings {
        tracing::warn!(target: "krom.source_map", "{warning}");
    }

    resolved
}
