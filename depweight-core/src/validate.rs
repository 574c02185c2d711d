use serde::Serialize;

pub const MAX_NAME_LENGTH: usize = 214;

const UNSAFE_NAMES: [&str; 2] = ["node_modules", "favicon.ico"];

const NODE_BUILTINS: [&str; 41] = [
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Outcome of checking a name against npm's publishing rules.
///
/// Names with warnings only were accepted by older registries and still
/// resolve; names with errors never existed on the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid_for_new_packages: bool,
    pub valid_for_old_packages: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

pub fn validate_package_name(name: &str) -> ValidationResult {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push("name length must be greater than zero".to_string());
        return build_result(warnings, errors);
    }

    if name.starts_with('.') {
        errors.push("name cannot start with a period".to_string());
    }

    if name.starts_with('_') {
        errors.push("name cannot start with an underscore".to_string());
    }

    if name.trim() != name {
        errors.push("name cannot contain leading or trailing spaces".to_string());
    }

    let lower = name.to_lowercase();

    for unsafe_name in UNSAFE_NAMES {
        if lower == unsafe_name {
            errors.push(format!("{unsafe_name} is an unsafe name"));
        }
    }

    for builtin in NODE_BUILTINS {
        if lower == builtin {
            warnings.push(format!("{builtin} is a core module name"));
        }
    }

    if name.len() > MAX_NAME_LENGTH {
        warnings.push(format!(
            "name can no longer contain more than {MAX_NAME_LENGTH} characters"
        ));
    }

    if lower != name {
        warnings.push("name can no longer contain capital letters".to_string());
    }

    let unscoped = name.rsplit('/').next().unwrap_or(name);
    if unscoped.contains(['~', '\'', '!', '(', ')', '*']) {
        warnings.push("name can no longer contain special characters (\"~\\'!()*\")".to_string());
    }

    if !is_url_friendly(name) {
        errors.push("name can only contain URL-friendly characters".to_string());
    }

    build_result(warnings, errors)
}

fn build_result(warnings: Vec<String>, errors: Vec<String>) -> ValidationResult {
    ValidationResult {
        valid_for_new_packages: errors.is_empty() && warnings.is_empty(),
        valid_for_old_packages: errors.is_empty(),
        warnings,
        errors,
    }
}

fn is_url_friendly(name: &str) -> bool {
    if escape(name) == name {
        return true;
    }

    // `@scope/name` is the only shape allowed to carry `@` and `/`.
    let Some(scoped) = name.strip_prefix('@') else {
        return false;
    };

    match scoped.split_once('/') {
        Some((user, pkg)) if !user.is_empty() && !pkg.is_empty() && !pkg.contains('/') => {
            escape(user) == user && escape(pkg) == pkg
        }
        _ => false,
    }
}

fn escape(input: &str) -> String {
    urlencoding::encode(input)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}
