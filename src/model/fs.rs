use std::time::SystemTime;

use thiserror::Error;

pub const PUBLIC_GRANT_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

#[derive(Debug, Error)]
pub enum FSError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("{message}")]
    Vendor { message: String },

    #[error("{message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

#[derive(Clone, Debug)]
pub struct FSObject {
    pub key: String,
    pub size: i64,
    pub modified_time: SystemTime,
}

#[derive(Clone, Debug)]
pub struct FSStat {
    pub key: String,
    pub size: i64,
    pub mimetype: Option<String>,
    pub storage_class: Option<String>,
    pub modified_time: SystemTime,
}

// One page of a delimiter listing. An absent `next_marker` means the vendor
// has no more pages.
#[derive(Clone, Debug, Default)]
pub struct FSPage {
    pub objects: Vec<FSObject>,
    pub common_prefixes: Vec<String>,
    pub next_marker: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct FSListing {
    pub objects: Vec<FSObject>,
    pub prefixes: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct FSGrant {
    pub grantee_uri: Option<String>,
    pub permission: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    File {
        path: String,
        size: i64,
        mimetype: Option<String>,
        timestamp: i64,
    },
    Dir {
        path: String,
    },
}

impl Entry {
    pub fn path(&self) -> &str {
        match self {
            Entry::File { path, .. } => path,
            Entry::Dir { path } => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Dir { .. })
    }
}

// Per-call write options, merged over the adapter-wide defaults. `expires`
// and `storage_class` are the pass-through metadata keys the vendor accepts
// on a put.
#[derive(Clone, Debug, Default)]
pub struct WriteConfig {
    pub visibility: Option<Visibility>,
    pub mimetype: Option<String>,
    pub expires: Option<i64>,
    pub storage_class: Option<String>,
}

impl WriteConfig {
    pub fn merged_over(&self, defaults: &WriteConfig) -> WriteConfig {
        WriteConfig {
            visibility: self.visibility.or(defaults.visibility),
            mimetype: self.mimetype.clone().or_else(|| defaults.mimetype.clone()),
            expires: self.expires.or(defaults.expires),
            storage_class: self
                .storage_class
                .clone()
                .or_else(|| defaults.storage_class.clone()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AdapterOptions {
    pub url: Option<String>,
    pub bucket_endpoint: bool,
    pub temporary_url: Option<String>,
    pub defaults: WriteConfig,
}

#[derive(Clone, Copy, Debug)]
pub enum Expiry {
    At(SystemTime),
    In(u64),
}

impl Expiry {
    // The vendor signing call wants a relative second count.
    pub fn relative_secs(&self) -> u64 {
        match self {
            Expiry::At(when) => when
                .duration_since(SystemTime::now())
                .map(|d| d.as_secs())
                .unwrap_or(0),
            Expiry::In(secs) => *secs,
        }
    }
}
