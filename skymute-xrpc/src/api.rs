//! Typed bindings for the XRPC methods the workspace consumes.
//!
//! Each function is generic over [`XrpcTransport`] and does nothing beyond
//! naming the method, serializing its parameters, and decoding the
//! response. Response types keep optional what the server may omit, so a
//! malformed entry degrades to a skippable item instead of failing the
//! whole page.

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::aturi::AtUri;
use crate::client::XrpcTransport;
use crate::error::XrpcError;

pub(crate) fn decode<T: DeserializeOwned>(nsid: &str, value: Value) -> Result<T, XrpcError> {
    serde_json::from_value(value).map_err(|source| XrpcError::Decode {
        nsid: nsid.to_string(),
        source,
    })
}

/// The authenticated account, as reported by `com.atproto.server.getSession`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
}

/// A minimal actor profile as embedded in graph responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub did: String,
    #[serde(default)]
    pub handle: Option<String>,
}

/// One entry of an `app.bsky.graph.getList` page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemView {
    pub uri: String,
    /// Absent when the server elides the subject; such entries are skipped.
    #[serde(default)]
    pub subject: Option<ProfileView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    #[serde(default)]
    pub items: Vec<ListItemView>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowersPage {
    #[serde(default)]
    pub followers: Vec<ProfileView>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// A record with its value left as raw JSON; callers pick out the fields
/// they understand and skip the rest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEnvelope {
    pub uri: String,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsPage {
    #[serde(default)]
    pub records: Vec<RecordEnvelope>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Fetches the session behind the client's credentials.
pub async fn get_session<C>(client: &C) -> Result<Session, XrpcError>
where
    C: XrpcTransport + ?Sized,
{
    const NSID: &str = "com.atproto.server.getSession";
    decode(NSID, client.query(NSID, &[]).await?)
}

/// Fetches one page of an `app.bsky.graph.list`'s members.
pub async fn get_list<C>(
    client: &C,
    list: &str,
    limit: u32,
    cursor: Option<String>,
) -> Result<ListPage, XrpcError>
where
    C: XrpcTransport + ?Sized,
{
    const NSID: &str = "app.bsky.graph.getList";
    let mut params = vec![("list", list.to_string()), ("limit", limit.to_string())];
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor));
    }
    decode(NSID, client.query(NSID, &params).await?)
}

/// Fetches one page of an actor's followers.
pub async fn get_followers<C>(
    client: &C,
    actor: &str,
    limit: u32,
    cursor: Option<String>,
) -> Result<FollowersPage, XrpcError>
where
    C: XrpcTransport + ?Sized,
{
    const NSID: &str = "app.bsky.graph.getFollowers";
    let mut params = vec![("actor", actor.to_string()), ("limit", limit.to_string())];
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor));
    }
    decode(NSID, client.query(NSID, &params).await?)
}

/// Fetches one page of the records of `collection` in `repo`.
pub async fn list_records<C>(
    client: &C,
    repo: &str,
    collection: &str,
    limit: u32,
    cursor: Option<String>,
) -> Result<RecordsPage, XrpcError>
where
    C: XrpcTransport + ?Sized,
{
    const NSID: &str = "com.atproto.repo.listRecords";
    let mut params = vec![
        ("repo", repo.to_string()),
        ("collection", collection.to_string()),
        ("limit", limit.to_string()),
    ];
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor));
    }
    decode(NSID, client.query(NSID, &params).await?)
}

/// Appends `subject` to the list addressed by `list` by creating an
/// `app.bsky.graph.listitem` record in the list owner's repo.
pub async fn create_list_item<C>(client: &C, list: &AtUri, subject: &str) -> Result<(), XrpcError>
where
    C: XrpcTransport + ?Sized,
{
    const NSID: &str = "com.atproto.repo.createRecord";
    let input = json!({
        "repo": list.authority,
        "collection": "app.bsky.graph.listitem",
        "record": {
            "$type": "app.bsky.graph.listitem",
            "list": list.to_string(),
            "subject": subject,
            "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    });
    client.procedure(NSID, &input).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_page_tolerates_missing_subject() {
        let page: ListPage = decode(
            "app.bsky.graph.getList",
            json!({
                "items": [
                    {"uri": "at://did:plc:a/app.bsky.graph.listitem/1",
                     "subject": {"did": "did:plc:x", "handle": "x.example"}},
                    {"uri": "at://did:plc:a/app.bsky.graph.listitem/2"},
                ],
                "cursor": "next",
            }),
        )
        .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].subject.as_ref().unwrap().did, "did:plc:x");
        assert!(page.items[1].subject.is_none());
        assert_eq!(page.cursor.as_deref(), Some("next"));
    }

    #[test]
    fn records_page_keeps_raw_values() {
        let page: RecordsPage = decode(
            "com.atproto.repo.listRecords",
            json!({
                "records": [
                    {"uri": "at://did:plc:a/app.bsky.graph.block/1",
                     "value": {"$type": "app.bsky.graph.block", "subject": "did:plc:y"}},
                ],
            }),
        )
        .unwrap();

        assert_eq!(page.records.len(), 1);
        assert_eq!(
            page.records[0].value.get("subject").and_then(Value::as_str),
            Some("did:plc:y")
        );
        assert!(page.cursor.is_none());
    }
}
