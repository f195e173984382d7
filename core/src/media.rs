//! Asset URL derivation for image, video and audio resources.
//!
//! # Design
//! `media_url` is pure: the same media and options always give the same
//! URL or the same `UsageError`. The URL shape is
//! `{domain}/v1/{id}-{format}[-{size}]/{fingerprint}/{slug}[.{ext}]`, where
//! `size` is the definition tier if one is given, else the width.
//!
//! Validation runs before any lookup, in this order:
//! 1. A playable extension needs a video or audio resource, the `default`
//!    or `source` format, and a definition.
//! 2. A GIF image at the `.gif` extension only serves its `source`
//!    rendition.
//! 3. Anything else (a `.jpg` preview of a video, a plain image) is free.

use std::fmt;
use std::str::FromStr;

use crate::error::UsageError;
use crate::types::{Fingerprints, Media};

/// Extensions that address the playable stream rather than a still image.
pub const PLAYABLE_EXTENSIONS: &[&str] = &["mp4", "webm", "m3u8", "mp3", "m4a", "ogg"];

const GIF_MIMETYPE: &str = "image/gif";
const GIF_EXTENSION: &str = "gif";

/// Named media rendition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    Source,
    #[default]
    Default,
    Thumb,
    Square,
    Cover,
    Stories,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 6] = [
        MediaFormat::Source,
        MediaFormat::Default,
        MediaFormat::Thumb,
        MediaFormat::Square,
        MediaFormat::Cover,
        MediaFormat::Stories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaFormat::Source => "source",
            MediaFormat::Default => "default",
            MediaFormat::Thumb => "thumb",
            MediaFormat::Square => "square",
            MediaFormat::Cover => "cover",
            MediaFormat::Stories => "stories",
        }
    }

    fn fingerprint(self, fingerprints: &Fingerprints) -> Option<&str> {
        match self {
            MediaFormat::Source => fingerprints.source.as_deref(),
            MediaFormat::Default => fingerprints.default.as_deref(),
            MediaFormat::Thumb => fingerprints.thumb.as_deref(),
            MediaFormat::Square => fingerprints.square.as_deref(),
            MediaFormat::Cover => fingerprints.cover.as_deref(),
            MediaFormat::Stories => fingerprints.stories.as_deref(),
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown media format: {s}"))
    }
}

/// Playable-media quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Definition {
    Hd,
    Sd,
}

impl Definition {
    pub fn as_str(self) -> &'static str {
        match self {
            Definition::Hd => "hd",
            Definition::Sd => "sd",
        }
    }
}

impl FromStr for Definition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hd" => Ok(Definition::Hd),
            "sd" => Ok(Definition::Sd),
            other => Err(format!("unknown definition: {other}")),
        }
    }
}

/// Presentation options for `media_url`.
///
/// Defaults: `format = default`, `slug = "media"`, everything else unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUrlOptions {
    pub format: MediaFormat,
    pub width: Option<u32>,
    pub slug: String,
    pub ext: Option<String>,
    pub definition: Option<Definition>,
}

impl Default for MediaUrlOptions {
    fn default() -> Self {
        Self {
            format: MediaFormat::Default,
            width: None,
            slug: "media".to_string(),
            ext: None,
            definition: None,
        }
    }
}

impl MediaUrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: MediaFormat) -> Self {
        self.format = format;
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }

    pub fn definition(mut self, definition: Definition) -> Self {
        self.definition = Some(definition);
        self
    }
}

pub fn is_playable_extension(ext: &str) -> bool {
    PLAYABLE_EXTENSIONS
        .iter()
        .any(|playable| playable.eq_ignore_ascii_case(ext))
}

/// Derive the asset URL of `media` under `domain`.
pub fn media_url(
    domain: &str,
    media: Media<'_>,
    options: &MediaUrlOptions,
) -> Result<String, UsageError> {
    validate(media, options)?;

    let attributes = media.attributes();
    let format = options.format;
    let fingerprint =
        format
            .fingerprint(&attributes.fingerprints)
            .ok_or_else(|| UsageError::MissingFingerprint {
                id: media.id().to_string(),
                format: format.to_string(),
            })?;

    let size = match (options.definition, options.width) {
        (Some(definition), _) => Some(definition.as_str().to_string()),
        (None, Some(width)) => Some(width.to_string()),
        (None, None) => None,
    };

    let mut url = format!(
        "{}/v1/{}-{}",
        domain.trim_end_matches('/'),
        media.id(),
        format
    );
    if let Some(size) = size {
        url.push('-');
        url.push_str(&size);
    }
    url.push('/');
    url.push_str(fingerprint);
    url.push('/');
    url.push_str(&options.slug);
    if let Some(ext) = &options.ext {
        url.push('.');
        url.push_str(ext);
    }
    Ok(url)
}

fn validate(media: Media<'_>, options: &MediaUrlOptions) -> Result<(), UsageError> {
    let Some(ext) = options.ext.as_deref() else {
        return Ok(());
    };

    if is_playable_extension(ext) {
        if !media.kind.is_playable() {
            return Err(UsageError::InvalidMediaTypeForExtension {
                media_type: media.kind.resource_type().to_string(),
                ext: ext.to_string(),
            });
        }
        if !matches!(options.format, MediaFormat::Default | MediaFormat::Source) {
            return Err(UsageError::InvalidFormatForExtension {
                format: options.format.to_string(),
                ext: ext.to_string(),
            });
        }
        if options.definition.is_none() {
            return Err(UsageError::MissingDefinition {
                ext: ext.to_string(),
            });
        }
        return Ok(());
    }

    if media.attributes().mimetype == GIF_MIMETYPE
        && ext.eq_ignore_ascii_case(GIF_EXTENSION)
        && options.format != MediaFormat::Source
    {
        return Err(UsageError::GifRequiresSource);
    }

    Ok(())
}
