//! Extraction of normalized [`Entry`] values from raw feed items.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::feed::Entry;
use crate::feed::RawItem;
use crate::feed::UNRATED;
use crate::feed::error::ExtractError;
use crate::feed::sanitize::strip_tags;

/// Host every poster URL must be rooted at.
pub const POSTER_HOST_PREFIX: &str = "https://a.ltrbxd.com/resized/";

/// Suffix Letterboxd appends to the item title of spoiler reviews.
pub const SPOILER_TITLE_SUFFIX: &str = " (contains spoilers)";

/// Sentence prepended to the description of spoiler reviews.
pub const SPOILER_DESCRIPTION: &str = " <p><em>This review may contain spoilers.</em></p> ";

/// Format of the long-form date inside the "Watched on" sentence.
pub const WATCHED_ON_DATE_FORMAT: &str = "%A %B %-d, %Y";

const UNSET_WATCHED_ON_DATE: &str = "Monday January 1, 0001";

static POSTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^ <p><img src="https://a\.ltrbxd\.com/resized/([^"<>\s]+)"/></p> "#)
        .expect("poster pattern is valid")
});

/// Poster, review and spoiler flag derived from an item description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptionParts {
    pub poster: String,
    pub review: String,
    pub spoiler: bool,
}

/// Converts one raw item into an entry.
///
/// Only a missing guid is an error. Every other absent or malformed field
/// falls back to its empty value.
pub fn extract(item: &RawItem) -> Result<Entry, ExtractError> {
    let id = item
        .guid
        .as_deref()
        .map(str::trim)
        .filter(|guid| !guid.is_empty())
        .ok_or_else(|| ExtractError::MissingField {
            field: "guid".to_string(),
        })?;

    let watched_date = parse_watched_date(item.extension("watchedDate"));
    let parts = parse_description(&item.title, &item.description, watched_date);

    Ok(Entry {
        id: id.to_string(),
        url: item.link.clone().unwrap_or_default(),
        title: item.extension("filmTitle").unwrap_or_default().to_string(),
        year: item.extension("filmYear").unwrap_or_default().to_string(),
        rating: parse_rating(item.extension("memberRating")),
        watched_date,
        rewatch: parse_rewatch(item.extension("rewatch")),
        poster: parts.poster,
        review: parts.review,
        spoiler: parts.spoiler,
    })
}

/// Parses a `memberRating` value such as `4.5` into tenths of a star.
///
/// Anything but a whole digit, a separator and a half digit of `0` or `5`
/// yields [`UNRATED`].
pub fn parse_rating(value: Option<&str>) -> i32 {
    let Some(value) = value.map(str::trim) else {
        return UNRATED;
    };
    let chars: Vec<char> = value.chars().collect();
    if chars.len() != 3 {
        return UNRATED;
    }

    match (chars[0].to_digit(10), chars[2].to_digit(10)) {
        (Some(whole), Some(half)) if half == 0 || half == 5 => (whole * 10 + half) as i32,
        _ => UNRATED,
    }
}

/// Parses a `watchedDate` value in `YYYY-MM-DD` form.
pub fn parse_watched_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

/// Only the literal `Yes` marks a rewatch.
pub fn parse_rewatch(value: Option<&str>) -> bool {
    value == Some("Yes")
}

/// Splits the leading poster image off a description.
///
/// The image is only accepted when the description starts with it and it is
/// served from [`POSTER_HOST_PREFIX`]. On a match the image markup is
/// replaced by a single space.
pub fn extract_poster(description: &str) -> (Option<String>, Cow<'_, str>) {
    match POSTER_PATTERN.captures(description) {
        Some(caps) => {
            let poster = format!("{POSTER_HOST_PREFIX}{}", &caps[1]);
            let rest = POSTER_PATTERN.replacen(description, 1, " ");
            (Some(poster), rest)
        }
        None => (None, Cow::Borrowed(description)),
    }
}

/// The description Letterboxd generates for an entry without a review.
pub fn watched_on_stub(watched_date: Option<NaiveDate>) -> String {
    format!(" <p>Watched on {}.</p> ", format_watched_on_date(watched_date))
}

/// Long-form watched date. A missing date renders like an unset timestamp
/// does upstream.
fn format_watched_on_date(watched_date: Option<NaiveDate>) -> String {
    match watched_date {
        Some(date) => date.format(WATCHED_ON_DATE_FORMAT).to_string(),
        None => UNSET_WATCHED_ON_DATE.to_string(),
    }
}

/// Derives poster, review text and spoiler flag from an item title and
/// description.
pub fn parse_description(
    title: &str,
    description: &str,
    watched_date: Option<NaiveDate>,
) -> DescriptionParts {
    let (poster, description) = extract_poster(description);
    let mut description = description.into_owned();

    let mut spoiler = false;
    if title.ends_with(SPOILER_TITLE_SUFFIX) {
        description = description.replacen(SPOILER_DESCRIPTION, " ", 1);
        spoiler = true;
    }

    let review = if description == watched_on_stub(watched_date) {
        spoiler = false;
        String::new()
    } else {
        strip_tags(&description).trim().to_string()
    };

    DescriptionParts {
        poster: poster.unwrap_or_default(),
        review,
        spoiler,
    }
}
