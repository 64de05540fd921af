//! Values passed between steps and stored on the post record

use serde::{Deserialize, Serialize};

/// One image prompt produced by the image-prompt step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrompt {
    /// 1-based position, also used to order images in the final document
    pub index: u32,
    pub prompt: String,
    /// URL-safe file stem
    pub slug: String,
}

/// Pointer to one generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub index: u32,
    pub image_uri: String,
}

/// SEO metadata for a post
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    pub meta_title: String,
    pub meta_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}
