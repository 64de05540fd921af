//! Object key layout under a post's prefix

use super::{BlobUri, StorageError, StorageResult};

pub const RESEARCH_ARTICLE: &str = "research_article.md";
pub const REFINED_ARTICLE: &str = "refined_article.md";
pub const FINAL_DOCUMENT: &str = "final.md";
pub const IMAGES_DIR: &str = "images";

/// `<website_id>/<post_id>/` prefix every artifact of a post lives under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPrefix {
    website_id: String,
    post_id: String,
}

impl PostPrefix {
    pub fn new(website_id: &str, post_id: &str) -> StorageResult<Self> {
        for part in [website_id, post_id] {
            if part.is_empty() || part.contains('/') || part == "." || part == ".." {
                return Err(StorageError::InvalidKey(format!("{}/{}", website_id, post_id)));
            }
        }
        Ok(Self {
            website_id: website_id.to_string(),
            post_id: post_id.to_string(),
        })
    }

    pub fn as_str(&self) -> String {
        format!("{}/{}/", self.website_id, self.post_id)
    }

    pub fn research_article(&self) -> String {
        format!("{}{}", self.as_str(), RESEARCH_ARTICLE)
    }

    pub fn refined_article(&self) -> String {
        format!("{}{}", self.as_str(), REFINED_ARTICLE)
    }

    pub fn final_document(&self) -> String {
        format!("{}{}", self.as_str(), FINAL_DOCUMENT)
    }

    /// `images/<NN>-<slug>.png`, deterministic per prompt index
    pub fn image(&self, index: u32, slug: &str) -> String {
        format!("{}{}", self.as_str(), image_file_path(index, slug))
    }

    /// Whether a pointer lives under this prefix
    pub fn contains(&self, uri: &BlobUri) -> bool {
        uri.key.starts_with(&self.as_str())
    }

    /// Path of an object relative to the prefix, used for links between
    /// artifacts of the same post
    pub fn relative<'a>(&self, uri: &'a BlobUri) -> Option<&'a str> {
        let prefix = self.as_str();
        uri.key.strip_prefix(prefix.as_str())
    }
}

/// Relative image path inside the post prefix
pub fn image_file_path(index: u32, slug: &str) -> String {
    let slug = if slug.is_empty() { "image" } else { slug };
    format!("{}/{:02}-{}.png", IMAGES_DIR, index, slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_keys() {
        let prefix = PostPrefix::new("site-1", "post-9").unwrap();
        assert_eq!(prefix.as_str(), "site-1/post-9/");
        assert_eq!(prefix.research_article(), "site-1/post-9/research_article.md");
        assert_eq!(prefix.refined_article(), "site-1/post-9/refined_article.md");
        assert_eq!(prefix.final_document(), "site-1/post-9/final.md");
        assert_eq!(prefix.image(3, "rock-pool"), "site-1/post-9/images/03-rock-pool.png");
    }

    #[test]
    fn test_prefix_rejects_path_tricks() {
        assert!(PostPrefix::new("site/1", "post").is_err());
        assert!(PostPrefix::new("site", "..").is_err());
        assert!(PostPrefix::new("", "post").is_err());
    }

    #[test]
    fn test_contains_and_relative() {
        let prefix = PostPrefix::new("site-1", "post-9").unwrap();
        let inside = BlobUri::new("mem", "b", "site-1/post-9/images/01-a.png");
        let outside = BlobUri::new("mem", "b", "site-1/post-10/images/01-a.png");

        assert!(prefix.contains(&inside));
        assert!(!prefix.contains(&outside));
        assert_eq!(prefix.relative(&inside), Some("images/01-a.png"));
        assert_eq!(prefix.relative(&outside), None);
    }
}
