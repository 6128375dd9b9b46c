use url::Url;

use crate::model::fs::FSError;

// Stored form is either empty or `segment/segment/`, so keys are always
// `prefix + logical path`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }

    format!("{}/", trimmed)
}

pub fn apply_prefix(prefix: &str, path: &str) -> String {
    format!("{}{}", prefix, path.trim_start_matches('/'))
}

pub fn remove_prefix(prefix: &str, key: &str) -> String {
    key.strip_prefix(prefix).unwrap_or(key).to_string()
}

pub fn is_dir_key(key: &str) -> bool {
    key.ends_with('/')
}

pub fn dir_key(dirname: &str) -> String {
    format!("{}/", dirname.trim_matches('/'))
}

pub fn concat_path_to_url(url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn normalize_host(
    endpoint: &str,
    bucket: &str,
    bucket_endpoint: bool,
) -> Result<String, FSError> {
    let endpoint = if endpoint.starts_with("http") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    let parsed = Url::parse(&endpoint).map_err(|err| FSError::Config {
        message: format!("failed to parse endpoint: {}, {}", endpoint, err),
    })?;

    let host = parsed.host_str().ok_or_else(|| FSError::Config {
        message: format!("endpoint has no host: {}", endpoint),
    })?;

    let domain = if bucket_endpoint {
        host.to_string()
    } else {
        format!("{}.{}", bucket, host)
    };

    Ok(format!("{}://{}/", parsed.scheme(), domain))
}

// Swaps scheme, host and port onto a signed URL, keeping path and query
// intact.
pub fn replace_base_url(signed: &str, base: &str) -> Result<String, FSError> {
    let mut url = Url::parse(signed).map_err(|err| FSError::Config {
        message: format!("failed to parse signed url: {}, {}", signed, err),
    })?;

    let base = Url::parse(base).map_err(|err| FSError::Config {
        message: format!("failed to parse base url: {}, {}", base, err),
    })?;

    let host = base
        .host_str()
        .ok_or_else(|| FSError::Config {
            message: format!("base url has no host: {}", base),
        })?
        .to_string();

    url.set_scheme(base.scheme()).map_err(|_| FSError::Config {
        message: format!("failed to set scheme: {}", base.scheme()),
    })?;
    url.set_host(Some(&host)).map_err(|err| FSError::Config {
        message: format!("failed to set host: {}, {}", host, err),
    })?;
    url.set_port(base.port()).map_err(|_| FSError::Config {
        message: format!("failed to set port on: {}", host),
    })?;

    Ok(url.to_string())
}
