//! Media resolution: fetch a post's off-chain metadata, probe the declared
//! content type of the referenced binary, and classify it into a renderable
//! kind.
//!
//! Both network steps are best-effort for the enclosing view: a missing or
//! unreachable payload is a state to render, not a failure to propagate.
//! Dropping the returned futures cancels the underlying requests, which is
//! how a view being navigated away abandons its in-flight probes.

use crate::error::ClientError;
use crate::transport::http_client;
use crate::types::PostMetadata;
use std::time::Duration;

/// Renderable media family, derived from a MIME content type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    TextDocument,
    Font,
    PdfDocument,
    DataJson,
    Archive,
    Document,
    ApplicationBinary,
    Other,
    /// Content type missing or empty.
    Unknown,
}

/// Result of probing a content URL. `Unreachable` is distinct from
/// `Unknown`: the former is a failed probe, the latter a successful probe
/// with no usable content type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    Kind(MediaKind),
    Unreachable,
}

/// Map a declared content type to a media kind. Pure: exact major-type
/// match for image/video/audio/text/font, substring matches on the
/// `application` subtype for the pdf/json/archive/office families.
pub fn classify(content_type: Option<&str>) -> MediaKind {
    let Some(ct) = content_type else {
        return MediaKind::Unknown;
    };
    let ct = ct.to_ascii_lowercase();
    let mime = ct.split(';').next().unwrap_or("").trim();
    if mime.is_empty() {
        return MediaKind::Unknown;
    }
    let (major, minor) = mime.split_once('/').unwrap_or((mime, ""));
    match major {
        "image" => MediaKind::Image,
        "video" => MediaKind::Video,
        "audio" => MediaKind::Audio,
        "text" => MediaKind::TextDocument,
        "font" => MediaKind::Font,
        "application" => {
            if minor.contains("pdf") {
                MediaKind::PdfDocument
            } else if minor.contains("json") {
                MediaKind::DataJson
            } else if minor.contains("zip") || minor.contains("compressed") {
                MediaKind::Archive
            } else if minor.contains("msword") || minor.contains("officedocument") {
                MediaKind::Document
            } else {
                MediaKind::ApplicationBinary
            }
        }
        _ => MediaKind::Other,
    }
}

/// Fetch a post's content URI as JSON metadata.
pub async fn resolve(content_uri: &str, timeout_ms: u64) -> Result<PostMetadata, ClientError> {
    let unavailable = |reason: String| ClientError::MetadataUnavailable {
        uri: content_uri.to_string(),
        reason,
    };
    let res = http_client()
        .get(content_uri)
        .timeout(Duration::from_millis(timeout_ms))
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?;
    if !res.status().is_success() {
        return Err(unavailable(format!("http {}", res.status())));
    }
    res.json::<PostMetadata>()
        .await
        .map_err(|e| unavailable(e.to_string()))
}

/// `resolve`, absorbed to the "metadata failed to load" view state.
pub async fn resolve_or_absent(content_uri: &str, timeout_ms: u64) -> Option<PostMetadata> {
    match resolve(content_uri, timeout_ms).await {
        Ok(meta) => Some(meta),
        Err(e) => {
            log::warn!("[media] {e}");
            None
        }
    }
}

/// Probe the content URL's declared content type with a metadata-only HEAD
/// request (no body transfer).
pub async fn probe(content_url: &str, timeout_ms: u64) -> Probe {
    let res = http_client()
        .head(content_url)
        .timeout(Duration::from_millis(timeout_ms))
        .send()
        .await;
    match res {
        Ok(res) if res.status().is_success() => {
            let content_type = res
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            Probe::Kind(classify(content_type.as_deref()))
        }
        Ok(res) => {
            log::warn!("[media] probe of {content_url} got http {}", res.status());
            Probe::Unreachable
        }
        Err(e) => {
            log::warn!("[media] probe of {content_url} failed: {e}");
            Probe::Unreachable
        }
    }
}

/// Best-effort secondary signal: classify by file extension. Only consulted
/// when the probe came back `Unknown` or `Unreachable`. The video list is
/// checked before audio so `.ogg` lands on video, matching the renderer's
/// precedence.
pub fn classify_extension(url: &str) -> MediaKind {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .to_ascii_lowercase();
    let Some(ext) = path.rsplit('.').next().filter(|e| !e.contains('/')) else {
        return MediaKind::Unknown;
    };
    match ext {
        "png" | "jpg" | "jpeg" | "gif" | "webp" => MediaKind::Image,
        "mp4" | "webm" | "ogg" => MediaKind::Video,
        "mp3" | "wav" => MediaKind::Audio,
        _ => MediaKind::Unknown,
    }
}

/// The kind a renderer should use: the probe result when conclusive,
/// otherwise the extension fallback.
pub fn render_kind(probe: Probe, content_url: &str) -> MediaKind {
    match probe {
        Probe::Kind(kind) if kind != MediaKind::Unknown => kind,
        _ => classify_extension(content_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_major_types() {
        assert_eq!(classify(Some("image/png")), MediaKind::Image);
        assert_eq!(classify(Some("video/mp4")), MediaKind::Video);
        assert_eq!(classify(Some("audio/mpeg")), MediaKind::Audio);
        assert_eq!(classify(Some("text/plain")), MediaKind::TextDocument);
        assert_eq!(classify(Some("font/woff2")), MediaKind::Font);
    }

    #[test]
    fn classify_application_subtypes() {
        assert_eq!(classify(Some("application/pdf")), MediaKind::PdfDocument);
        assert_eq!(classify(Some("application/json")), MediaKind::DataJson);
        assert_eq!(classify(Some("application/zip")), MediaKind::Archive);
        assert_eq!(
            classify(Some("application/x-7z-compressed")),
            MediaKind::Archive
        );
        assert_eq!(classify(Some("application/msword")), MediaKind::Document);
        assert_eq!(
            classify(Some(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            )),
            MediaKind::Document
        );
        assert_eq!(
            classify(Some("application/octet-stream")),
            MediaKind::ApplicationBinary
        );
    }

    #[test]
    fn classify_edge_cases() {
        assert_eq!(classify(None), MediaKind::Unknown);
        assert_eq!(classify(Some("")), MediaKind::Unknown);
        assert_eq!(classify(Some("model/gltf-binary")), MediaKind::Other);
        // parameters and case are ignored
        assert_eq!(classify(Some("IMAGE/PNG; charset=binary")), MediaKind::Image);
    }

    #[test]
    fn extension_fallback() {
        assert_eq!(
            classify_extension("https://gw/ipfs/Qm1/cat.PNG?x=1"),
            MediaKind::Image
        );
        assert_eq!(classify_extension("https://gw/clip.webm"), MediaKind::Video);
        // ogg is ambiguous; the renderer checks video first
        assert_eq!(classify_extension("https://gw/track.ogg"), MediaKind::Video);
        assert_eq!(classify_extension("https://gw/track.mp3"), MediaKind::Audio);
        assert_eq!(classify_extension("https://gw/ipfs/Qm1"), MediaKind::Unknown);
    }

    #[test]
    fn render_kind_prefers_probe_then_extension() {
        assert_eq!(
            render_kind(Probe::Kind(MediaKind::PdfDocument), "x.png"),
            MediaKind::PdfDocument
        );
        assert_eq!(
            render_kind(Probe::Kind(MediaKind::Unknown), "x.png"),
            MediaKind::Image
        );
        assert_eq!(
            render_kind(Probe::Unreachable, "clip.mp4"),
            MediaKind::Video
        );
    }
}
