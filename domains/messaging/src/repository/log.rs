//! Paged read view over a pair's conversation
//!
//! `ConversationLog::stream` yields every message after `since` in sequence
//! order, fetching one page at a time. Each call starts a fresh stream from
//! `since`, so a consumer that fails part way can simply call it again.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use duet_common::Result;

use super::ConversationStore;
use crate::domain::entities::{Message, PairCode};

pub const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct ConversationLog {
    store: Arc<dyn ConversationStore>,
    pair_id: PairCode,
    since: i64,
    page_size: i64,
}

struct Cursor {
    after: i64,
    exhausted: bool,
}

impl ConversationLog {
    pub fn new(store: Arc<dyn ConversationStore>, pair_id: PairCode, since: Option<i64>) -> Self {
        Self {
            store,
            pair_id,
            since: since.unwrap_or(0).max(0),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Lazy, finite stream of messages after `since`
    pub fn stream(&self) -> BoxStream<'static, Result<Message>> {
        let store = Arc::clone(&self.store);
        let pair_id = self.pair_id.clone();
        let page_size = self.page_size;
        let start = Cursor {
            after: self.since,
            exhausted: false,
        };

        stream::try_unfold(start, move |cursor| {
            let store = Arc::clone(&store);
            let pair_id = pair_id.clone();
            async move {
                if cursor.exhausted {
                    return Ok(None);
                }

                let page = store.list_page(&pair_id, cursor.after, page_size).await?;
                let next = Cursor {
                    after: page.last().map(|m| m.sequence).unwrap_or(cursor.after),
                    exhausted: (page.len() as i64) < page_size,
                };

                let items = page.into_iter().map(Ok::<Message, duet_common::Error>);
                Ok::<_, duet_common::Error>(Some((stream::iter(items), next)))
            }
        })
        .try_flatten()
        .boxed()
    }

    /// Drain the stream into a vector
    pub async fn collect(&self) -> Result<Vec<Message>> {
        self.stream().try_collect().await
    }
}
