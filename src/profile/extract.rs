use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ExtractionError;

/// Normalized profile metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub biography: String,
    #[serde(rename = "followers_count")]
    pub follower_count: u64,
    pub following_count: u64,
    pub full_name: String,
    pub id: String,
    pub is_business_account: bool,
    pub is_joined_recently: bool,
    pub is_private: bool,
    #[serde(rename = "posts_count")]
    pub post_count: u64,
    pub profile_pic_url: String,
}

/// The document emitted per target.
///
/// Serializes as `{"GraphProfileInfo": {"info": {...}, "username": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileReport {
    #[serde(rename = "GraphProfileInfo")]
    pub profile_info: ProfileInfo,
}

/// Body of a [`ProfileReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub info: ProfileRecord,
    pub username: String,
}

impl ProfileReport {
    #[must_use]
    pub fn new(username: impl Into<String>, info: ProfileRecord) -> Self {
        Self {
            profile_info: ProfileInfo {
                info,
                username: username.into(),
            },
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.profile_info.username
    }

    #[must_use]
    pub fn record(&self) -> &ProfileRecord {
        &self.profile_info.info
    }
}

// Wire schema: only the keys that are projected. Unknown keys are ignored.

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    graphql: GraphQl,
}

#[derive(Debug, Deserialize)]
struct GraphQl {
    user: UserNode,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    biography: String,
    edge_followed_by: EdgeCount,
    edge_follow: EdgeCount,
    full_name: String,
    id: String,
    is_business_account: bool,
    is_joined_recently: bool,
    is_private: bool,
    edge_owner_to_timeline_media: EdgeCount,
    profile_pic_url: String,
}

#[derive(Debug, Deserialize)]
struct EdgeCount {
    count: u64,
}

impl From<UserNode> for ProfileRecord {
    fn from(user: UserNode) -> Self {
        Self {
            biography: user.biography,
            follower_count: user.edge_followed_by.count,
            following_count: user.edge_follow.count,
            full_name: user.full_name,
            id: user.id,
            is_business_account: user.is_business_account,
            is_joined_recently: user.is_joined_recently,
            is_private: user.is_private,
            post_count: user.edge_owner_to_timeline_media.count,
            profile_pic_url: user.profile_pic_url,
        }
    }
}

/// Projects a profile response body into a [`ProfileRecord`].
///
/// The body is parsed in two passes so that malformed JSON and a
/// well-formed document with the wrong shape are reported separately.
/// Either way no partial record is produced.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidJson`] when the body does not parse and
/// [`ExtractionError::Schema`] when a required key is missing or mistyped.
pub fn extract(body: &[u8], subject: &str) -> Result<ProfileRecord, ExtractionError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|source| ExtractionError::InvalidJson {
            subject: subject.to_string(),
            source,
        })?;

    let envelope: ProfileEnvelope =
        serde_json::from_value(value).map_err(|source| ExtractionError::Schema {
            subject: subject.to_string(),
            source,
        })?;

    let record = ProfileRecord::from(envelope.graphql.user);
    debug!(subject, id = %record.id, "profile extracted");
    Ok(record)
}
