//! The rating prompt the gateway opens.
//!
//! Opening a store page or a native review dialog is platform work and lives
//! outside this crate. Hosts implement [`RatingView`]; the gateway only calls
//! it and never looks at the outcome, so implementations swallow their own
//! failures.

use async_trait::async_trait;
use tracing::{info, warn};

/// Something that can ask the user for a rating.
#[async_trait]
pub trait RatingView: Send + Sync {
    /// Try to open the rating page. Best effort.
    fn try_open_rating_page(&self);

    /// Async variant for views that wait on a native dialog.
    /// Defaults to the synchronous call
    async fn try_open_rating_page_async(&self) {
        self.try_open_rating_page();
    }
}

type OpenHook = Box<dyn Fn() + Send + Sync>;

/// The default view: a store-navigation stub.
///
/// Without a hook it only logs, since this crate knows no store. Hosts that
/// have a way to open their store page (a URL opener, a JNI call) pass it
/// with [`StoreRatingView::with_hook`].
#[derive(Default)]
pub struct StoreRatingView {
    store_url: Option<String>,
    hook: Option<OpenHook>,
}

impl StoreRatingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store page address, included in the log line
    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = Some(url.into());
        self
    }

    /// Run `hook` whenever the page should open
    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn store_url(&self) -> Option<&str> {
        self.store_url.as_deref()
    }
}

impl std::fmt::Debug for StoreRatingView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRatingView")
            .field("store_url", &self.store_url)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl RatingView for StoreRatingView {
    fn try_open_rating_page(&self) {
        match &self.hook {
            Some(hook) => {
                info!(
                    "Opening rating page{}",
                    self.store_url
                        .as_deref()
                        .map(|url| format!(" at {}", url))
                        .unwrap_or_default()
                );
                hook();
            }
            None => warn!("Rating prompt requested but no store integration is configured"),
        }
    }
}
