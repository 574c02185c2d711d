use semver::VersionReq;
use std::error::Error as StdError;
use std::fmt;

/// Longest version string the loose parser will look at.
pub const MAX_VERSION_LENGTH: usize = 256;

#[derive(Debug, Clone)]
pub struct RangeSet {
    ranges: Vec<VersionReq>,
}

#[derive(Debug, Clone)]
pub struct Error {
    input: String,
    message: String,
}

impl Error {
    pub fn new(input: String, message: String) -> Self {
        Self { input, message }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.input)
    }
}

impl StdError for Error {}

impl RangeSet {
    pub fn parse(original: &str) -> Result<Self, Error> {
        let mut s = original.trim();

        if s.is_empty() || s == "latest" {
            s = "*";
        }

        let mut ranges = Vec::new();

        for part in s.split("||") {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let normalized = normalize_and_part(part);

            let req = VersionReq::parse(&normalized)
                .map_err(|err| Error::new(original.to_string(), err.to_string()))?;

            ranges.push(req);
        }

        if ranges.is_empty() {
            let req = VersionReq::parse("*")
                .map_err(|err| Error::new(original.to_string(), err.to_string()))?;
            ranges.push(req);
        }

        Ok(RangeSet { ranges })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.ranges.iter().any(|r| r.matches(version))
    }
}

fn normalize_and_part(part: &str) -> String {
    let tokens: Vec<&str> = part.split_whitespace().collect();

    if tokens.len() <= 1 {
        return part.to_string();
    }

    if tokens.len() == 3 && tokens[1] == "-" {
        return format!(">={}, <={}", tokens[0], tokens[2]);
    }

    let mut result = String::new();

    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            let prev = tokens[i - 1];
            if matches!(prev, "=" | ">" | ">=" | "<" | "<=" | "~" | "^") {
                result.push(' ');
            } else {
                result.push_str(", ");
            }
        }

        result.push_str(token);
    }
    result
}

/// A version accepted by npm's loose parser: `v1.2.3`, `=1.2.3`, `4.2.0foo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Vec<String>,
    pub build: Vec<String>,
}

impl LooseVersion {
    pub fn parse(input: &str) -> Option<Self> {
        if input.len() > MAX_VERSION_LENGTH {
            return None;
        }

        let rest = input.trim_start_matches(|c: char| c == 'v' || c == '=' || c.is_whitespace());

        let (major, rest) = take_number(rest)?;
        let rest = rest.strip_prefix('.')?;
        let (minor, rest) = take_number(rest)?;
        let rest = rest.strip_prefix('.')?;
        let (patch, rest) = take_number(rest)?;

        let (pre, build) = match rest.split_once('+') {
            Some((pre, build)) => (pre, Some(build)),
            None => (rest, None),
        };

        let pre_release = if pre.is_empty() {
            Vec::new()
        } else if let Some(stripped) = pre.strip_prefix('-')
            && is_identifier_list(stripped)
        {
            normalize_pre_release(stripped)
        } else if is_identifier_list(pre) {
            normalize_pre_release(pre)
        } else {
            return None;
        };

        let build = match build {
            Some(build) if is_identifier_list(build) => {
                build.split('.').map(|id| id.to_string()).collect()
            }
            Some(_) => return None,
            None => Vec::new(),
        };

        Some(LooseVersion {
            major,
            minor,
            patch,
            pre_release,
            build,
        })
    }

    /// Canonical `major.minor.patch[-pre]` form, without build metadata.
    pub fn version(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if !self.pre_release.is_empty() {
            out.push('-');
            out.push_str(&self.pre_release.join("."));
        }
        out
    }
}

pub fn is_valid_loose(input: &str) -> bool {
    LooseVersion::parse(input).is_some()
}

fn take_number(input: &str) -> Option<(u64, &str)> {
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());

    if end == 0 {
        return None;
    }

    let value = input[..end].parse::<u32>().ok()?;
    Some((u64::from(value), &input[end..]))
}

fn is_identifier_list(input: &str) -> bool {
    !input.is_empty()
        && input.split('.').all(|id| {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn normalize_pre_release(input: &str) -> Vec<String> {
    input
        .split('.')
        .map(|id| match id.parse::<u64>() {
            Ok(num) => num.to_string(),
            Err(_) => id.to_string(),
        })
        .collect()
}

pub use semver::Version;
