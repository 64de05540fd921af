//! Prompt construction for the AI-backed steps
//!
//! Builders are pure: they take the post's title plus site settings and
//! return the chat messages. Sampling temperatures live next to them.

use llm::{ChatRequest, ImageQuality, ImageRequest, Message};

use crate::db::WebsiteSettings;
use crate::markdown::FormattingNotes;
use crate::types::ImagePrompt;

pub const RESEARCH_TEMPERATURE: f32 = 0.7;
pub const REFINE_TEMPERATURE: f32 = 0.6;
pub const IMAGE_PROMPT_TEMPERATURE: f32 = 0.8;
pub const SLUG_TEMPERATURE: f32 = 0.2;
pub const METADATA_TEMPERATURE: f32 = 0.5;

/// Article text sent to the image-prompt and metadata calls is cut here
pub const ARTICLE_SNIPPET_CHARS: usize = 8000;

const DEFAULT_IMAGE_STYLE: &str = "realistic photo";

/// First `max` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}

fn keyword_line(settings: &WebsiteSettings) -> String {
    let keywords = settings.keywords();
    if keywords.is_empty() {
        "N/A".to_string()
    } else {
        keywords.join(", ")
    }
}

pub fn research(
    blog_title: &str,
    description: Option<&str>,
    settings: &WebsiteSettings,
) -> ChatRequest {
    let mut user = format!(
        "Write a comprehensive, well-researched draft article on the topic \"{title}\".\n\n\
         Website context:\n\
         - Description: {site}\n\
         - Target audience: {audience}\n\
         - Core keywords: {keywords}\n",
        title = blog_title,
        site = or_default(settings.website_description.as_deref(), "N/A"),
        audience = or_default(settings.target_audience.as_deref(), "a general audience"),
        keywords = keyword_line(settings),
    );
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        user.push_str(&format!("- Brief for this article: {}\n", description));
    }
    user.push_str(
        "\nInstructions:\n\
         - Cover the essential aspects: background, key concepts, examples, current state and likely developments.\n\
         - Organise the article with clear headings and subheadings.\n\
         - Prioritise depth and factual accuracy over polish; this is a first draft.\n\
         - Never leave placeholder text.\n\
         - Output only the article, starting with its title.\n",
    );

    ChatRequest::new(vec![
        Message::system("You are a research writer producing thorough first drafts."),
        Message::human(user),
    ])
    .with_temperature(RESEARCH_TEMPERATURE)
}

pub fn refine(blog_title: &str, draft: &str, settings: &WebsiteSettings) -> ChatRequest {
    let (min, max) = settings.length_bounds();
    let tone = or_default(settings.brand_tone.as_deref(), "neutral and informative");
    let audience = or_default(settings.target_audience.as_deref(), "a general audience");
    let notes = FormattingNotes::parse(settings.formatting_notes.as_deref());

    let mut user = format!(
        "Rewrite the draft below on \"{title}\" to fit the brand guidelines and length.\n\n\
         Brand guidelines:\n\
         - Tone: {tone}\n\
         - Target audience: {audience}\n\n\
         Constraints:\n\
         - Keep every key fact, concept and argument from the draft.\n\
         - The article must be between {min} and {max} words.\n\
         - Fix grammar, spelling and awkward phrasing.\n\
         - Keep or add headings for structure.\n\
         - Separate paragraphs with a blank line.\n\
         - Output only the article, with the title as the first line.\n",
        title = blog_title,
    );
    if let Some(guidance) = notes.guidance_text() {
        user.push_str(&format!("\nFormatting notes:\n{}\n", guidance));
    }
    user.push_str(&format!(
        "\n--- START OF DRAFT ---\n{}\n--- END OF DRAFT ---\n",
        draft
    ));

    ChatRequest::new(vec![
        Message::system(format!(
            "You are an editor rewriting content to a brand tone ({}) and a length of {}-{} words.",
            tone, min, max
        )),
        Message::human(user),
    ])
    .with_temperature(REFINE_TEMPERATURE)
}

pub fn image_prompts(blog_title: &str, article: &str, settings: &WebsiteSettings) -> ChatRequest {
    let count = settings.image_count();
    let style = or_default(settings.image_style.as_deref(), DEFAULT_IMAGE_STYLE);

    let mut palette = String::new();
    if let Some(primary) = settings.primary_color.as_deref().filter(|c| !c.trim().is_empty()) {
        palette.push_str(&format!("- Primary brand colour: {}\n", primary.trim()));
    }
    if let Some(secondary) = settings.secondary_color.as_deref().filter(|c| !c.trim().is_empty()) {
        palette.push_str(&format!("- Secondary brand colour: {}\n", secondary.trim()));
    }

    let user = format!(
        "Read the article about \"{title}\" and write exactly {count} distinct prompts for an \
         image generation model.\n\n\
         Each prompt:\n\
         - shows a different concept from the article\n\
         - describes subject, setting, mood and composition\n\
         - mentions the style \"{style}\"\n\
         {palette}\n\
         Respond with a JSON object {{\"prompts\": [\"...\", \"...\"]}} holding exactly {count} strings.\n\n\
         --- START OF ARTICLE ---\n{article}\n--- END OF ARTICLE ---\n",
        title = blog_title,
        article = truncate_chars(article, ARTICLE_SNIPPET_CHARS),
    );

    ChatRequest::new(vec![
        Message::system(format!(
            "You are an art director writing image prompts as JSON. Desired style: '{}'.",
            style
        )),
        Message::human(user),
    ])
    .with_temperature(IMAGE_PROMPT_TEMPERATURE)
    .with_json_output()
}

pub fn slugs(prompts: &[String]) -> ChatRequest {
    let listing: Vec<String> = prompts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}", i + 1, p))
        .collect();

    let user = format!(
        "For each of the {n} image prompts below, write a short URL-safe slug (2-5 words, \
         lowercase letters, digits and hyphens only, no articles) naming its main subject. \
         Keep the order.\n\n\
         Respond with a JSON object {{\"slugs\": [\"...\"]}} holding exactly {n} strings.\n\n\
         {listing}\n",
        n = prompts.len(),
        listing = listing.join("\n"),
    );

    ChatRequest::new(vec![
        Message::system("You generate URL slugs for image files as JSON."),
        Message::human(user),
    ])
    .with_temperature(SLUG_TEMPERATURE)
    .with_json_output()
}

pub fn metadata(blog_title: &str, article: &str, settings: &WebsiteSettings) -> ChatRequest {
    let user = format!(
        "Write SEO metadata for the article about \"{title}\".\n\n\
         Context:\n\
         - Core website keywords: {keywords}\n\
         - SEO instructions: {seo}\n\n\
         Produce:\n\
         - metaTitle: 50-60 characters, includes the primary keyword\n\
         - metaDescription: 150-160 characters, summarises the article\n\
         - keywords: 5-10 keywords or keyphrases taken from the article\n\n\
         Respond with a JSON object with exactly the keys \"metaTitle\", \"metaDescription\" \
         and \"keywords\" (a list of strings).\n\n\
         --- START OF ARTICLE ---\n{article}\n--- END OF ARTICLE ---\n",
        title = blog_title,
        keywords = keyword_line(settings),
        seo = or_default(settings.seo_instructions.as_deref(), "Generate standard SEO metadata."),
        article = truncate_chars(article, ARTICLE_SNIPPET_CHARS),
    );

    ChatRequest::new(vec![
        Message::system("You are an SEO specialist returning metadata as a JSON object."),
        Message::human(user),
    ])
    .with_temperature(METADATA_TEMPERATURE)
    .with_json_output()
}

/// Image request for one prompt, sized and styled from the site settings
pub fn image(prompt: &ImagePrompt, settings: &WebsiteSettings, default_model: &str) -> ImageRequest {
    ImageRequest::new(prompt.prompt.trim())
        .with_size(settings.image_size())
        .with_quality(ImageQuality::Standard)
        .with_style(settings.image_style_preference())
        .with_model(settings.image_model_or(default_model))
}
