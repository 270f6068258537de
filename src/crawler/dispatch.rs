//! Result dispatcher: fans each page result out to the caller's sinks

use crate::crawler::types::CrawlResult;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Synchronous function invoked once per page result
pub type ResultCallback = Arc<dyn Fn(&CrawlResult) + Send + Sync>;

/// The set of sinks a crawl reports to
///
/// Either, both, or neither sink may be set. With no sink configured,
/// results are dropped.
#[derive(Clone, Default)]
pub struct ResultSinks {
    channel: Option<mpsc::Sender<CrawlResult>>,
    callback: Option<ResultCallback>,
}

impl ResultSinks {
    /// Creates a dispatcher with no sinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the channel results are sent to
    pub fn set_channel(&mut self, channel: mpsc::Sender<CrawlResult>) {
        self.channel = Some(channel);
    }

    /// Sets the callback invoked per result
    pub fn set_callback(&mut self, callback: ResultCallback) {
        self.callback = Some(callback);
    }

    /// Returns true if no sink is configured
    pub fn is_empty(&self) -> bool {
        self.channel.is_none() && self.callback.is_none()
    }

    /// Delivers one result to every configured sink
    ///
    /// The callback sees the result first; the channel then receives it by
    /// value, waiting for capacity. A closed channel is not an error.
    pub async fn dispatch(&self, result: CrawlResult) {
        if let Some(callback) = &self.callback {
            callback(&result);
        }

        if let Some(channel) = &self.channel {
            if let Err(e) = channel.send(result).await {
                tracing::debug!("Result channel closed, dropping result for {}", e.0.uri);
            }
        }
    }
}

impl fmt::Debug for ResultSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSinks")
            .field("channel", &self.channel.is_some())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
