//! Value types validated at the request boundary: media types, edition dates
//! and month keys, and the tagged upload payload.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rejection produced when a raw boundary value fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    Date(String),
    #[error("invalid month `{0}`, expected YYYY-MM")]
    Month(String),
    #[error("unsupported file type `{0}`, only PDF, JPG, JPEG and PNG files are accepted")]
    MediaType(String),
    #[error("a file upload is required")]
    MissingFile,
    #[error("field `{0}` is required")]
    MissingField(&'static str),
    #[error("`{0}` must be at least 1")]
    BelowOne(&'static str),
    #[error("page {page} with limit {limit} is past any possible result")]
    PageOutOfRange { page: u32, limit: u32 },
}

/// The closed set of file kinds an edition or post image may carry.
///
/// The stored form is the mime subtype (`jpeg` for `image/jpeg`, `jpg` for the
/// non-standard `image/jpg`), which doubles as the file extension.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Jpg,
    Jpeg,
    Png,
}

impl MediaType {
    /// Parse a declared mime type such as `application/pdf`.
    pub fn from_mime(mime: &str) -> Result<Self, InvalidInput> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(Self::Pdf),
            "image/jpeg" => Ok(Self::Jpeg),
            "image/jpg" => Ok(Self::Jpg),
            "image/png" => Ok(Self::Png),
            _ => Err(InvalidInput::MediaType(mime.to_string())),
        }
    }

    /// Parse the stored extension form (`pdf`, `jpg`, ...).
    pub fn from_extension(ext: &str) -> Result<Self, InvalidInput> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "jpg" => Ok(Self::Jpg),
            "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            _ => Err(InvalidInput::MediaType(ext.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    /// Canonical mime type used when handing content to a store.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl TryFrom<String> for MediaType {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_extension(&value)
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date.
///
/// The shape is checked before the calendar so that loose forms chrono would
/// accept (`2025-3-1`, `+2025-03-01`) are rejected.
pub fn parse_edition_date(raw: &str) -> Result<NaiveDate, InvalidInput> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(InvalidInput::Date(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| InvalidInput::Date(raw.to_string()))
}

/// A calendar month used to filter editions by date prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Parse a strict `YYYY-MM` month key.
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        let invalid = || InvalidInput::Month(raw.to_string());
        let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }

    /// `LIKE` pattern matching every stored date within this month.
    pub fn date_pattern(&self) -> String {
        format!("{self}-%")
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The file part of a multipart request, modelled as present or absent so the
/// services never inspect raw form fields.
#[derive(Clone, Debug)]
pub enum Upload {
    File {
        content: Bytes,
        /// Declared mime type, validated by the consuming service.
        content_type: String,
    },
    Missing,
}

impl Upload {
    pub fn file(content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self::File {
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Validate the declared type and split out the content.
    ///
    /// Returns `None` for a missing upload so optional-file flows can decide
    /// what absence means.
    pub fn validated(&self) -> Result<Option<(Bytes, MediaType)>, InvalidInput> {
        match self {
            Self::File {
                content,
                content_type,
            } => Ok(Some((content.clone(), MediaType::from_mime(content_type)?))),
            Self::Missing => Ok(None),
        }
    }
}
