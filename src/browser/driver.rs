use crate::errors::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Primitive browser operations the retrieval workflow sequences.
///
/// One implementor owns one browser process; the workflow borrows the driver
/// for the duration of a single attempt and never shares it. All operations
/// block the caller until the browser acknowledges them or a timeout fires.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Ephemeral handle to a located DOM node. Valid only within the session
    /// that produced it; never persisted across steps that re-render the page.
    type Element: Clone + Send + Sync;

    /// Load a URL, blocking until navigation is committed (not full load).
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Single-shot DOM query. Fails with `ElementNotFound` if no node matches
    /// at query time; performs no implicit wait.
    async fn find(&self, selector: &str) -> Result<Self::Element>;

    /// Query descendants of an already-located element.
    async fn find_all(&self, scope: &Self::Element, selector: &str)
        -> Result<Vec<Self::Element>>;

    /// Poll until the element is visible, failing with `TimeoutExceeded` once
    /// the budget elapses. Visibility means rendered geometry plus computed
    /// style that does not hide the node.
    async fn wait_visible(&self, element: &Self::Element, timeout: Duration) -> Result<()>;

    /// Click a previously located element. Callers must have confirmed
    /// visibility first.
    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Type text into a previously located, visible element.
    async fn send_keys(&self, element: &Self::Element, text: &str) -> Result<()>;

    /// Read an attribute value, `None` when the attribute is absent.
    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Tear down the browser process. Safe to call more than once; every
    /// attempt must end with a terminate on all exit paths.
    async fn terminate(&mut self) -> Result<()>;
}
