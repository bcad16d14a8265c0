//! Set sources backed by a PDS.
//!
//! Each source holds a shared transport and evaluates by paginating the
//! relevant XRPC listing end-to-end. Entries the server elides or that are
//! not of the expected record type are skipped rather than failing the
//! snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use skymute_xrpc::api;
use skymute_xrpc::{collect_pages, reduce_pages, Page, XrpcError, XrpcTransport};

use crate::set::{Did, DidSet};
use crate::source::{SetError, SetSource};

const PAGE_LIMIT: u32 = 100;

/// The accounts blocked by the authenticated session's account.
///
/// Evaluation resolves the session DID first, then pages through the
/// repo's `app.bsky.graph.block` records.
pub struct BlockedUsers<C> {
    client: Arc<C>,
}

impl<C> BlockedUsers<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

fn block_subject(value: &Value) -> Option<Did> {
    if value.get("$type").and_then(Value::as_str) != Some("app.bsky.graph.block") {
        return None;
    }
    value
        .get("subject")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl<C: XrpcTransport> SetSource for BlockedUsers<C> {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        let session = api::get_session(self.client.as_ref())
            .await
            .map_err(SetError::from)?;

        let entries = reduce_pages(
            DidSet::new(),
            |cursor| {
                let repo = session.did.clone();
                async move {
                    let page = api::list_records(
                        self.client.as_ref(),
                        &repo,
                        "app.bsky.graph.block",
                        PAGE_LIMIT,
                        cursor,
                    )
                    .await?;
                    Ok::<_, XrpcError>(Page {
                        items: page.records,
                        cursor: page.cursor,
                    })
                }
            },
            |mut acc, records| {
                acc.extend(records.iter().filter_map(|r| block_subject(&r.value)));
                acc
            },
        )
        .await
        .map_err(SetError::from)?;

        tracing::debug!(count = entries.len(), "fetched blocked users");
        Ok(entries)
    }
}

/// The followers of a given actor.
pub struct FollowersOf<C> {
    client: Arc<C>,
    actor: String,
}

impl<C> FollowersOf<C> {
    pub fn new(client: Arc<C>, actor: impl Into<String>) -> Self {
        Self {
            client,
            actor: actor.into(),
        }
    }
}

#[async_trait]
impl<C: XrpcTransport> SetSource for FollowersOf<C> {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        let entries: DidSet = collect_pages(|cursor| {
            let actor = self.actor.clone();
            async move {
                let page =
                    api::get_followers(self.client.as_ref(), &actor, PAGE_LIMIT, cursor).await?;
                Ok::<_, XrpcError>(Page {
                    items: page.followers,
                    cursor: page.cursor,
                })
            }
        })
        .await
        .map_err(SetError::from)?
        .into_iter()
        .map(|profile| profile.did)
        .collect();

        tracing::debug!(actor = %self.actor, count = entries.len(), "fetched followers");
        Ok(entries)
    }
}

/// The members of an `app.bsky.graph.list`.
pub struct ListMembers<C> {
    client: Arc<C>,
    list: String,
}

impl<C> ListMembers<C> {
    /// `list` is the list's `at://` URI.
    pub fn new(client: Arc<C>, list: impl Into<String>) -> Self {
        Self {
            client,
            list: list.into(),
        }
    }
}

#[async_trait]
impl<C: XrpcTransport> SetSource for ListMembers<C> {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        let entries = reduce_pages(
            DidSet::new(),
            |cursor| {
                let list = self.list.clone();
                async move {
                    let page =
                        api::get_list(self.client.as_ref(), &list, PAGE_LIMIT, cursor).await?;
                    Ok::<_, XrpcError>(Page {
                        items: page.items,
                        cursor: page.cursor,
                    })
                }
            },
            |mut acc, items| {
                acc.extend(items.into_iter().filter_map(|item| item.subject.map(|s| s.did)));
                acc
            },
        )
        .await
        .map_err(SetError::from)?;

        tracing::debug!(list = %self.list, count = entries.len(), "fetched list members");
        Ok(entries)
    }
}
