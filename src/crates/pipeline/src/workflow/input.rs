//! Input document handed to a workflow run

use serde::{Deserialize, Serialize};

use crate::db::Post;

const MAX_RUN_NAME: usize = 80;

/// Execution input; every task state reads its parameters from here.
///
/// `description` is always serialized (possibly `null`) so path lookups in
/// the definition never hit a missing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInput {
    pub post_id: String,
    pub website_id: String,
    pub blog_title: String,
    pub description: Option<String>,
}

impl From<&Post> for WorkflowInput {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.post_id.clone(),
            website_id: post.website_id.clone(),
            blog_title: post.blog_title.clone(),
            description: post.description.clone(),
        }
    }
}

/// Unique, service-safe run name: `<post-id>-<random>`
pub fn run_name(post_id: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let safe: String = post_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .take(MAX_RUN_NAME - suffix.len() - 1)
        .collect();
    format!("{}-{}", safe, suffix)
}
