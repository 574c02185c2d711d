use crate::registry::{RegistryPackage, RegistryVersion};
use crate::{DepweightError, Result};
use depweight_semver::{LooseVersion, RangeSet, Version};

/// Pick the version of `package` that npm would install for `range`.
///
/// Dist-tags win, then exact versions, then the `latest` tag if it satisfies
/// the range, then the highest satisfying version.
pub fn select_version<'a>(
    name: &str,
    range: &str,
    package: &'a RegistryPackage,
) -> Result<&'a RegistryVersion> {
    let trimmed = match range.trim() {
        "" => "latest",
        other => other,
    };

    if let Some(tag_version) = package.dist_tags.get(trimmed) {
        return package
            .versions
            .get(tag_version)
            .ok_or_else(|| DepweightError::ResolutionFailed {
                name: name.to_string(),
                range: range.to_string(),
                reason: format!("dist-tag {trimmed} points to missing version {tag_version}"),
            });
    }

    if let Some(exact) = LooseVersion::parse(trimmed) {
        return package
            .versions
            .get(&exact.version())
            .ok_or_else(|| DepweightError::ResolutionFailed {
                name: name.to_string(),
                range: range.to_string(),
                reason: format!("version {} is not published", exact.version()),
            });
    }

    let ranges = parse_range_set(name, trimmed)?;

    if let Some(latest) = package
        .dist_tags
        .get("latest")
        .and_then(|tag| package.versions.get(tag))
        && let Ok(ver) = Version::parse(&latest.version)
        && ranges.matches(&ver)
    {
        return Ok(latest);
    }

    let mut selected: Option<(Version, &RegistryVersion)> = None;

    for (version_str, meta) in package.versions.iter() {
        let Ok(ver) = Version::parse(version_str) else {
            continue;
        };

        if !ranges.matches(&ver) {
            continue;
        }

        match &selected {
            Some((best, _)) if ver <= *best => {}
            _ => selected = Some((ver, meta)),
        }
    }

    selected
        .map(|(_, meta)| meta)
        .ok_or_else(|| DepweightError::ResolutionFailed {
            name: name.to_string(),
            range: range.to_string(),
            reason: "Version not found matching range".to_string(),
        })
}

pub fn parse_range_set(name: &str, original: &str) -> Result<RangeSet> {
    RangeSet::parse(original).map_err(|err| DepweightError::Semver {
        value: format!("{}@{}", name, original),
        reason: err.to_string(),
    })
}
