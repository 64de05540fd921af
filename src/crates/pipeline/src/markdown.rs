//! Final document assembly
//!
//! [`assemble_markdown`] is pure: the same input always yields the same
//! bytes. It never reads the clock; the date comes from the post record.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::types::PostMetadata;

/// Layout switches parsed from a site's formatting notes.
///
/// Notes are free text. Lines of the form `title_heading: true` or
/// `image_captions: yes` are directives; every other line is prose guidance
/// for the refine prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattingNotes {
    /// Prepend `# <title>` when the body has no level-1 heading
    pub title_heading: bool,
    /// Add an italic caption line under each image
    pub image_captions: bool,
    pub guidance: Vec<String>,
}

impl FormattingNotes {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut notes = FormattingNotes::default();
        let Some(raw) = raw else {
            return notes;
        };

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let directive = line.split_once(':').and_then(|(key, value)| {
                let flag = parse_flag(value.trim())?;
                match key.trim().to_ascii_lowercase().as_str() {
                    "title_heading" => Some(("title_heading", flag)),
                    "image_captions" => Some(("image_captions", flag)),
                    _ => None,
                }
            });

            match directive {
                Some(("title_heading", flag)) => notes.title_heading = flag,
                Some((_, flag)) => notes.image_captions = flag,
                None => notes.guidance.push(line.to_string()),
            }
        }
        notes
    }

    /// Prose guidance joined back into one block, if any
    pub fn guidance_text(&self) -> Option<String> {
        (!self.guidance.is_empty()).then(|| self.guidance.join("\n"))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// One image to place, already resolved to a link relative to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedImage {
    pub index: u32,
    /// e.g. `images/01-rock-pool.png`
    pub path: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct MarkdownInput<'a> {
    pub blog_title: &'a str,
    pub metadata: &'a PostMetadata,
    pub body: &'a str,
    pub images: Vec<PlacedImage>,
    /// `YYYY-MM-DD`
    pub date: Option<&'a str>,
    pub notes: &'a FormattingNotes,
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    keywords: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<&'a str>,
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("static regex"))
}

/// Split on blank lines, dropping empty paragraphs
pub fn split_paragraphs(body: &str) -> Vec<String> {
    let normalized = body.replace("\r\n", "\n");
    paragraph_break()
        .split(normalized.trim())
        .map(|p| p.trim_matches('\n').trim_end())
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// `rock-pool-crab` becomes `Rock pool crab`
pub fn humanize_slug(slug: &str) -> String {
    let words: Vec<&str> = slug.split(['-', '_']).filter(|w| !w.is_empty()).collect();
    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn alt_text(image: &PlacedImage, title: &str) -> String {
    let generic = format!("image-{}", image.index);
    if image.slug.is_empty() || image.slug == generic {
        return format!("{} illustration {}", title, image.index);
    }
    humanize_slug(&image.slug)
}

fn image_block(image: &PlacedImage, title: &str, captions: bool) -> String {
    let alt = alt_text(image, title).replace(['[', ']'], "");
    if captions {
        format!("![{}]({})\n*{}*", alt, image.path, alt)
    } else {
        format!("![{}]({})", alt, image.path)
    }
}

/// Paragraph indices (0-based) after which an image goes, one per image.
///
/// Images beyond the returned positions are appended after the body.
pub fn placement_slots(paragraphs: usize, images: usize) -> Vec<usize> {
    if images == 0 || paragraphs < 2 {
        return Vec::new();
    }
    let interval = ((paragraphs - 1) / (images + 1)).max(1);
    (1..paragraphs)
        .filter(|i| (i + 1) % interval == 0)
        .take(images)
        .collect()
}

/// Build the final markdown document
pub fn assemble_markdown(input: &MarkdownInput<'_>) -> String {
    let title = if input.metadata.meta_title.trim().is_empty() {
        input.blog_title
    } else {
        input.metadata.meta_title.trim()
    };

    let mut images = input.images.clone();
    images.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));

    let paragraphs = split_paragraphs(input.body);
    let slots = placement_slots(paragraphs.len(), images.len());
    let captions = input.notes.image_captions;

    let mut blocks: Vec<String> = Vec::with_capacity(paragraphs.len() + images.len() + 1);
    if input.notes.title_heading && !paragraphs.iter().any(|p| p.starts_with("# ")) {
        blocks.push(format!("# {}", title));
    }

    let mut pending = images.iter();
    let mut slot_iter = slots.iter().peekable();
    for (i, paragraph) in paragraphs.iter().enumerate() {
        blocks.push(paragraph.clone());
        if slot_iter.peek() == Some(&&i) {
            slot_iter.next();
            if let Some(image) = pending.next() {
                blocks.push(image_block(image, title, captions));
            }
        }
    }
    blocks.extend(pending.map(|image| image_block(image, title, captions)));

    let front_matter = FrontMatter {
        title,
        description: input.metadata.meta_description.trim(),
        keywords: &input.metadata.keywords,
        date: input.date,
    };
    // Serializing a struct of strings cannot fail; fall back to a bare title.
    let yaml = serde_yaml::to_string(&front_matter)
        .unwrap_or_else(|_| format!("title: {:?}\n", title));

    let mut out = format!("---\n{}---\n\n", yaml);
    out.push_str(blocks.join("\n\n").trim_end());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> PostMetadata {
        PostMetadata {
            meta_title: "Tide Pools 101".to_string(),
            meta_description: "A field guide.".to_string(),
            keywords: vec!["tide pools".to_string(), "crabs".to_string()],
        }
    }

    fn image(index: u32, slug: &str) -> PlacedImage {
        PlacedImage {
            index,
            path: format!("images/{:02}-{}.png", index, slug),
            slug: slug.to_string(),
        }
    }

    #[test]
    fn test_notes_directives_and_guidance() {
        let notes = FormattingNotes::parse(Some(
            "title_heading: true\nUse short paragraphs.\nimage_captions: yes\nTone: playful",
        ));
        assert!(notes.title_heading);
        assert!(notes.image_captions);
        assert_eq!(notes.guidance, vec!["Use short paragraphs.", "Tone: playful"]);
        assert_eq!(FormattingNotes::parse(None), FormattingNotes::default());
    }

    #[test]
    fn test_placement_slots() {
        // 10 paragraphs, 3 images: interval 2, after paragraphs 1, 3, 5
        assert_eq!(placement_slots(10, 3), vec![1, 3, 5]);
        // interval clamps to 1
        assert_eq!(placement_slots(3, 5), vec![1, 2]);
        assert!(placement_slots(1, 2).is_empty());
        assert!(placement_slots(8, 0).is_empty());
    }

    #[test]
    fn test_front_matter_and_single_trailing_newline() {
        let notes = FormattingNotes::default();
        let meta = metadata();
        let out = assemble_markdown(&MarkdownInput {
            blog_title: "Tide pools",
            metadata: &meta,
            body: "First.\n\nSecond.\n\n\n",
            images: vec![],
            date: Some("2026-03-01"),
            notes: &notes,
        });

        assert!(out.starts_with("---\ntitle: Tide Pools 101\ndescription: A field guide.\n"));
        assert!(out.contains("keywords:\n- tide pools\n- crabs\n"));
        assert!(out.contains("date: 2026-03-01\n---\n\nFirst.\n\nSecond.\n"));
        assert!(out.ends_with("Second.\n"));
        assert!(!out.ends_with("\n\n"));
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let notes = FormattingNotes::default();
        let meta = PostMetadata::default();
        let out = assemble_markdown(&MarkdownInput {
            blog_title: "Tide pools",
            metadata: &meta,
            body: "Only.",
            images: vec![],
            date: None,
            notes: &notes,
        });
        assert_eq!(out, "---\ntitle: Tide pools\n---\n\nOnly.\n");
    }

    #[test]
    fn test_image_order_does_not_matter() {
        let notes = FormattingNotes::default();
        let meta = metadata();
        let body = "P1\n\nP2\n\nP3\n\nP4\n\nP5";
        let build = |images: Vec<PlacedImage>| {
            assemble_markdown(&MarkdownInput {
                blog_title: "Tide pools",
                metadata: &meta,
                body,
                images,
                date: None,
                notes: &notes,
            })
        };

        let a = build(vec![image(1, "crab"), image(2, "anemone")]);
        let b = build(vec![image(2, "anemone"), image(1, "crab")]);
        assert_eq!(a, b);
        assert!(a.contains("P2\n\n![Crab](images/01-crab.png)\n\nP3"));
        assert!(a.contains("P3\n\n![Anemone](images/02-anemone.png)\n\nP4"));
    }

    #[test]
    fn test_leftover_images_are_appended() {
        let notes = FormattingNotes::default();
        let meta = metadata();
        let out = assemble_markdown(&MarkdownInput {
            blog_title: "Tide pools",
            metadata: &meta,
            body: "Only paragraph.",
            images: vec![image(1, "crab"), image(2, "image-2")],
            date: None,
            notes: &notes,
        });
        assert!(out.ends_with(
            "Only paragraph.\n\n![Crab](images/01-crab.png)\n\n![Tide Pools 101 illustration 2](images/02-image-2.png)\n"
        ));
    }

    #[test]
    fn test_title_heading_and_captions() {
        let notes = FormattingNotes::parse(Some("title_heading: true\nimage_captions: true"));
        let meta = metadata();
        let out = assemble_markdown(&MarkdownInput {
            blog_title: "Tide pools",
            metadata: &meta,
            body: "Intro\n\nMore\n\nEnd",
            images: vec![image(1, "rock-pool")],
            date: None,
            notes: &notes,
        });
        assert!(out.contains("---\n\n# Tide Pools 101\n\nIntro"));
        assert!(out.contains("![Rock pool](images/01-rock-pool.png)\n*Rock pool*"));

        let with_h1 = assemble_markdown(&MarkdownInput {
            blog_title: "Tide pools",
            metadata: &meta,
            body: "# Existing\n\nText",
            images: vec![],
            date: None,
            notes: &notes,
        });
        assert!(!with_h1.contains("# Tide Pools 101"));
    }

    #[test]
    fn test_humanize_slug() {
        assert_eq!(humanize_slug("rock-pool-crab"), "Rock pool crab");
        assert_eq!(humanize_slug("--"), "");
    }
}
