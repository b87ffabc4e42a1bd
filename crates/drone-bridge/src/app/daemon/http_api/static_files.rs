//! Confinement of static asset requests to the document root.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::usecases::ports::PathError;

const INDEX_FILE: &str = "index.html";

/// Maps a request path onto a file under `root`.
///
/// The path is normalized lexically before anything touches the filesystem;
/// `..` segments that would climb above `root` are rejected.
pub(crate) fn resolve_static_path(root: &Path, request_path: &str) -> Result<PathBuf, PathError> {
    let reject = || PathError::OutsideRoot(request_path.to_string());

    let relative = request_path.trim_start_matches('/');
    let relative = if relative.is_empty() {
        INDEX_FILE
    } else {
        relative
    };

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(reject());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(reject()),
        }
    }

    let full = root.join(normalized);
    if !full.starts_with(root) {
        return Err(reject());
    }
    Ok(full)
}

pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html") => "text/html",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
