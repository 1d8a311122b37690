//! Rendering of a filtered feed into one digest message.

use crate::feed::Entry;
use crate::feed::Feed;

/// Embed accent color.
pub const DIGEST_COLOR: u32 = 0xd8b437;

/// Link used for entries without one.
pub const FALLBACK_ENTRY_URL: &str = "https://letterboxd.com/";

/// Reviews longer than this many characters are cut.
pub const REVIEW_CHAR_LIMIT: usize = 300;

pub const SPOILER_PLACEHOLDER: &str = "This review may contain spoilers.";

/// Discord refuses embeds whose description is longer than this.
pub const DESCRIPTION_CHAR_LIMIT: usize = 4096;

/// A rendered digest, independent of the delivery channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestPayload {
    pub author_name: String,
    pub author_url: String,
    pub author_icon_url: String,
    pub color: u32,
    pub description: String,
    /// First non-empty poster of the digest, or empty.
    pub thumbnail_url: String,
}

pub struct DigestBuilder<'a> {
    feed: &'a Feed,
}

impl<'a> DigestBuilder<'a> {
    pub fn new(feed: &'a Feed) -> Self {
        Self { feed }
    }

    pub fn build(&self) -> DigestPayload {
        let feed = self.feed;

        // Whole entries only, newest first, until the description is full.
        // An entry too long on its own is cut rather than sending nothing.
        let mut description = String::new();
        let mut description_chars = 0;
        let mut thumbnail_url = "";
        for entry in &feed.entries {
            let block = Self::render_entry(entry);
            let block_chars = block.chars().count();
            let fits = description_chars + block_chars <= DESCRIPTION_CHAR_LIMIT;
            if !fits && !description.is_empty() {
                break;
            }

            if thumbnail_url.is_empty() {
                thumbnail_url = entry.poster.as_str();
            }
            if !fits {
                description = block.chars().take(DESCRIPTION_CHAR_LIMIT).collect();
                break;
            }
            description.push_str(&block);
            description_chars += block_chars;
        }

        DigestPayload {
            author_name: feed.display_name.clone(),
            author_url: format!("https://letterboxd.com/{}/films/diary/", feed.username),
            author_icon_url: feed.icon_url.clone(),
            color: DIGEST_COLOR,
            description,
            thumbnail_url: thumbnail_url.to_string(),
        }
    }

    /// Three lines per entry: linked title, date with stars and rewatch
    /// marker, then the review block.
    fn render_entry(entry: &Entry) -> String {
        let url = if entry.url.is_empty() {
            FALLBACK_ENTRY_URL
        } else {
            entry.url.as_str()
        };
        let watched_date = entry
            .watched_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let rewatch = if entry.rewatch { "↺" } else { "" };

        let review = Self::render_review(entry);
        let review = if review.is_empty() {
            review
        } else {
            format!("```{review}```")
        };

        format!(
            "**[{} ({})]({url})**\n**{watched_date}** {} {rewatch}\n{review}\n",
            entry.title,
            entry.year,
            stars(entry.rating),
        )
    }

    fn render_review(entry: &Entry) -> String {
        if entry.spoiler {
            return SPOILER_PLACEHOLDER.to_string();
        }
        match entry.review.char_indices().nth(REVIEW_CHAR_LIMIT) {
            Some((cut, _)) => format!("{}...", &entry.review[..cut]),
            None => entry.review.clone(),
        }
    }
}

/// `45` -> `★★★★½`. Unrated entries have no stars.
pub fn stars(rating: i32) -> String {
    if rating < 0 {
        return String::new();
    }
    let mut out = "★".repeat((rating / 10) as usize);
    if rating % 10 == 5 {
        out.push('½');
    }
    out
}
