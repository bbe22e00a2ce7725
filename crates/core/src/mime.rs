//! MIME type guessing from file names.
//!
//! The browser-provided content type is unreliable; the extension of the
//! uploaded file name usually is not. The table below covers the formats
//! this system stores in practice.

/// Known extension → MIME type pairs.
const MIME_CANDIDATES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
];

/// Guess the MIME type from an uploaded file name, or `None` when the
/// extension is missing or unknown (callers keep the browser-provided type).
///
/// HEIC/HEIF is special-cased because common OS MIME databases lack it.
pub fn guess_mime_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1;
    if ext.eq_ignore_ascii_case("heic") || ext.eq_ignore_ascii_case("heif") {
        return Some("image/heic");
    }
    MIME_CANDIDATES
        .iter()
        .find(|(candidate, _)| ext.eq_ignore_ascii_case(candidate))
        .map(|(_, mime)| *mime)
}

/// Return a file extension (with leading dot) for a MIME type, or empty.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/tiff" => ".tif",
        "image/heic" => ".heic",
        "application/pdf" => ".pdf",
        "text/plain" => ".txt",
        _ => "",
    }
}

/// Whether a MIME type denotes an image payload.
pub fn is_image(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}
