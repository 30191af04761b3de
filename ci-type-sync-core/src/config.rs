use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Locator kind whose pattern rules are published.
pub const DEFAULT_LOCATOR_KIND: &str = "NXS";

/// Title of the Confluence page that is replaced.
pub const DEFAULT_PAGE_TITLE: &str = "CI_TYPE_GROUPS and CI_TYPES";

/// Connection to the Confluence page store plus the page to overwrite.
#[derive(Clone)]
pub struct PageStoreConfig {
    /// Base URL including any context path, e.g. `https://host/wiki`.
    pub base_url: String,
    pub user: String,
    pub password: Option<String>,
    pub page_title: String,
}

impl fmt::Debug for PageStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStoreConfig")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("page_title", &self.page_title)
            .finish()
    }
}

/// Where the rendered page goes.
#[derive(Debug, Clone)]
pub enum Destination {
    /// Write the text to a local file; the page store is never contacted.
    LocalFile(PathBuf),
    Page(PageStoreConfig),
}

/// Everything one synchronisation run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub mvn_prefix: String,
    pub locator_kind: String,
    pub destination: Destination,
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        match &self.destination {
            Destination::LocalFile(path) => info!(
                mvn_prefix = %self.mvn_prefix,
                locator_kind = %self.locator_kind,
                out = %path.display(),
                "Loaded SyncConfig with local output"
            ),
            Destination::Page(page) => info!(
                mvn_prefix = %self.mvn_prefix,
                locator_kind = %self.locator_kind,
                wiki_url = %page.base_url,
                wiki_user = %page.user,
                wiki_password = if page.password.is_some() { "***" } else { "NOT SET" },
                page_title = %page.page_title,
                "Loaded SyncConfig with page store output"
            ),
        }
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
