use std::path::Path;

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Extension the embedded differential updater fetches through byte ranges.
/// Responses for it must always carry an exact `Content-Length`.
pub const APPIMAGE_EXTENSION: &str = "appimage";

/// Fixed extension-to-MIME table for served artifacts.
pub fn mime_for_path(path: &Path) -> &'static str {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_MIME;
    };
    match extension.to_ascii_lowercase().as_str() {
        APPIMAGE_EXTENSION => "application/octet-stream",
        "deb" => "application/x-debian-package",
        "rpm" => "application/x-rpm",
        "dmg" => "application/x-apple-diskimage",
        "exe" => "application/vnd.microsoft.portable-executable",
        "json" => "application/json",
        _ => DEFAULT_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(
            mime_for_path(Path::new("app.deb")),
            "application/x-debian-package"
        );
        assert_eq!(
            mime_for_path(Path::new("App.AppImage")),
            "application/octet-stream"
        );
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(mime_for_path(Path::new("app.xyz")), DEFAULT_MIME);
        assert_eq!(mime_for_path(Path::new("no-extension")), DEFAULT_MIME);
    }

    #[test]
    fn appimage_mime_lookup_is_case_insensitive() {
        assert_eq!(
            mime_for_path(Path::new("App-1.2.3.AppImage")),
            "application/octet-stream"
        );
    }
}
