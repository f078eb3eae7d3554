// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::path::PathBuf;

/// Error type for dataset transfer operations.
///
/// The three domain kinds are [`Error::ConfigurationError`],
/// [`Error::ExtractionError`] and [`Error::UploadError`]. The remaining
/// variants wrap failures from the filesystem, the HTTP stack and the
/// serialization layers so they can be propagated with `?`.
#[derive(Debug)]
pub enum Error {
    /// Missing or placeholder settings, or an unusable local cache root.
    ConfigurationError(String),
    /// A downloaded annotation archive was corrupt or held no JSON file.
    ExtractionError(String),
    /// A single image could not be ingested by the destination project.
    UploadError(PathBuf, String),
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration source parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// HTTP request error from the reqwest client.
    HttpError(reqwest::Error),
    /// URL parsing error.
    UrlParseError(url::ParseError),
    /// ZIP archive error.
    ZipError(zip::result::ZipError),
    /// Directory traversal error.
    WalkDirError(walkdir::Error),
    /// A remote platform answered with a non-success status.
    ApiError(u16, String),
    /// A remote object (dataset, release, project) does not exist.
    NotFound(String),
    /// Server returned an invalid or unexpected response.
    InvalidResponse(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpError(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UrlParseError(err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipError(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ConfigurationError(s) => write!(f, "Configuration error: {}", s),
            Error::ExtractionError(s) => write!(f, "Extraction error: {}", s),
            Error::UploadError(path, s) => {
                write!(f, "Upload error for {}: {}", path.display(), s)
            }
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration source error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::HttpError(e) => write!(f, "HTTP error: {}", e),
            Error::UrlParseError(e) => write!(f, "URL parse error: {}", e),
            Error::ZipError(e) => write!(f, "ZIP error: {}", e),
            Error::WalkDirError(e) => write!(f, "Directory traversal error: {}", e),
            Error::ApiError(status, body) => write!(f, "API error {}: {}", status, body),
            Error::NotFound(s) => write!(f, "Not found: {}", s),
            Error::InvalidResponse(s) => write!(f, "Invalid server response: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::HttpError(e) => Some(e),
            Error::UrlParseError(e) => Some(e),
            Error::ZipError(e) => Some(e),
            Error::WalkDirError(e) => Some(e),
            _ => None,
        }
    }
}
