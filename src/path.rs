//! Slash-separated resource path helpers.
//!
//! Lock names use `/` as the separator regardless of the host operating
//! system. Every name is normalized with [`slash_clean`] before it touches the
//! lock namespace, so the rest of the crate can assume absolute, clean paths.

use std::ops::ControlFlow;

/// Normalize a resource name into a clean absolute path.
///
/// A leading `/` is added when missing, repeated separators collapse, `.`
/// segments are dropped and `..` segments remove the previous segment (never
/// climbing above `/`). The result never has a trailing `/` unless it is the
/// root itself.
pub fn slash_clean(name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Parent directory of a clean absolute path. The parent of `/` is `/`.
pub fn parent(name: &str) -> &str {
    match name.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &name[..i],
    }
}

/// Iterate over `name` and each of its ancestors, ending with `/`.
pub fn ancestors(name: &str) -> Ancestors<'_> {
    Ancestors { next: Some(name) }
}

/// Iterator returned by [`ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    next: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.next?;
        self.next = if current == "/" {
            None
        } else {
            Some(parent(current))
        };
        Some(current)
    }
}

/// Walk from `name` up to `/`, calling `visit(level, is_first)` at each level.
///
/// Stops as soon as the visitor breaks, and reports whether it did.
pub fn walk_to_root<F>(name: &str, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(&str, bool) -> ControlFlow<()>,
{
    for (depth, level) in ancestors(name).enumerate() {
        if visit(level, depth == 0).is_break() {
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}
