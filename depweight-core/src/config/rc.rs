use super::DEFAULT_REGISTRY;
use directories::BaseDirs;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::{env, fs, path::Path};

const RC_FILES: [&str; 2] = [".npmrc", ".depweightrc"];

/// Registry settings gathered from rc files, lowest precedence first.
#[derive(Debug, Clone)]
pub struct RcSettings {
    pub default_registry: String,
    pub scoped_registries: BTreeMap<String, String>,
    pub registry_auth: BTreeMap<String, String>,
    pub default_auth_token: Option<String>,
    pub default_auth_basic: bool,
}

impl Default for RcSettings {
    fn default() -> Self {
        RcSettings {
            default_registry: DEFAULT_REGISTRY.to_string(),
            scoped_registries: BTreeMap::new(),
            registry_auth: BTreeMap::new(),
            default_auth_token: None,
            default_auth_basic: false,
        }
    }
}

pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::new();
    let mut i = 0;
    let bytes = text.as_bytes();

    while i < bytes.len() {
        if bytes[i] == b'$' {
            if i + 1 < bytes.len()
                && bytes[i + 1] == b'{'
                && let Some(end) = text[i + 2..].find('}')
            {
                let var = &text[i + 2..i + 2 + end];
                out.push_str(&env::var(var).unwrap_or_default());
                i += 2 + end + 1;
                continue;
            }

            let mut j = i + 1;
            while j < bytes.len() && (bytes[j] == b'_' || bytes[j].is_ascii_alphanumeric()) {
                j += 1;
            }

            let var = &text[i + 1..j];
            if !var.is_empty() {
                out.push_str(&env::var(var).unwrap_or_default());
                i = j;
                continue;
            }

            out.push('$');
            i += 1;
        } else {
            let ch = text[i..].chars().next().unwrap_or_default();
            out.push(ch);
            i += ch.len_utf8().max(1);
        }
    }

    out
}

pub fn normalize_registry_url(value: &str) -> String {
    let mut url = if value.starts_with("//") {
        format!("https:{}", value)
    } else {
        value.to_string()
    };

    while url.ends_with('/') {
        url.pop();
    }

    let (scheme, rest) = if let Some(r) = url.strip_prefix("https://") {
        ("https", r)
    } else if let Some(r) = url.strip_prefix("http://") {
        ("http", r)
    } else {
        return url;
    };

    let mut parts = rest.splitn(2, '/');
    let hostport = parts.next().unwrap_or("").to_ascii_lowercase();
    let suffix = parts.next().unwrap_or("");

    let mut host = hostport.clone();
    if let Some((host_part, port_part)) = hostport.split_once(':') {
        let default_https = scheme == "https" && port_part == "443";
        let default_http = scheme == "http" && port_part == "80";
        if default_https || default_http {
            host = host_part.to_string();
        }
    }

    if suffix.is_empty() {
        format!("{}://{}", scheme, host)
    } else {
        format!("{}://{}/{}", scheme, host, suffix)
    }
}

pub fn read_list_from_env(key: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();

    if let Ok(value) = env::var(key) {
        for part in value.split(',') {
            let name = part.trim();
            if !name.is_empty() {
                set.insert(name.to_string());
            }
        }
    }

    set
}

pub fn read_rc_settings() -> RcSettings {
    let mut settings = RcSettings::default();

    if let Some(base) = BaseDirs::new() {
        let home = base.home_dir();
        for rc_name in RC_FILES.iter() {
            apply_rc_file(&home.join(rc_name), &mut settings);
        }
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // Closer directories override farther ones, so apply from the root down.
    let mut chain: Vec<PathBuf> = cwd.ancestors().map(Path::to_path_buf).collect();
    chain.reverse();

    for dir in chain {
        for rc_name in RC_FILES.iter() {
            apply_rc_file(&dir.join(rc_name), &mut settings);
        }
    }

    settings
}

pub fn apply_rc_file(path: &Path, settings: &mut RcSettings) {
    if !path.is_file() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(data) => apply_rc_text(&data, settings),
        Err(err) => tracing::debug!("skipping unreadable rc file {}: {err}", path.display()),
    }
}

pub fn apply_rc_text(data: &str, settings: &mut RcSettings) {
    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let Some(equals_index) = trimmed.find('=') else {
            continue;
        };

        let (key, value) = trimmed.split_at(equals_index);
        let key = key.trim();
        let mut value = expand_env_vars(value[1..].trim());

        if value.ends_with('/') && !key.starts_with("//") {
            value.pop();
        }

        if key == "registry" {
            if !value.is_empty() {
                settings.default_registry = normalize_registry_url(&value);
            }
        } else if let Some(scope) = key.strip_suffix(":registry") {
            let scope = scope.trim();
            if !scope.is_empty() && !value.is_empty() {
                settings
                    .scoped_registries
                    .insert(scope.to_string(), normalize_registry_url(&value));
            }
        } else if let Some(rest) = key.strip_prefix("//") {
            let host_and_path = rest
                .strip_suffix("/:_authToken")
                .or_else(|| rest.strip_suffix(":_authToken"))
                .unwrap_or("");

            let raw_host = host_and_path.split('/').next().unwrap_or("").trim();

            let mut host = raw_host.to_ascii_lowercase();
            if let Some((split_host, split_port)) = host.split_once(':')
                && (split_port == "443" || split_port == "80")
            {
                host = split_host.to_string();
            }

            if !host.is_empty() && !value.is_empty() {
                settings.registry_auth.insert(host, value);
            }
        } else if key == "_authToken" {
            if !value.is_empty() {
                settings.default_auth_token = Some(value);
                settings.default_auth_basic = false;
            }
        } else if key == "_auth" && !value.is_empty() {
            settings.default_auth_token = Some(value);
            settings.default_auth_basic = true;
        }
    }
}

pub(crate) fn host_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let is_https = trimmed.starts_with("https://");
    let is_http = trimmed.starts_with("http://");

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let hostport = without_scheme.split('/').next().unwrap_or("").trim();

    if hostport.is_empty() {
        return None;
    }

    let mut host = hostport.to_ascii_lowercase();

    if let Some((split_host, split_port)) = host.split_once(':') {
        let default_https = is_https && split_port == "443";
        let default_http = is_http && split_port == "80";
        if default_https || default_http {
            host = split_host.to_string();
        }
    }

    if host.is_empty() { None } else { Some(host) }
}
