// Video-host URL recognition and title cleanup.
//
// Feed posts link to videos in three shapes: the canonical watch URL, the
// short-link form, and the embed form. Anything else is not playable and gets
// dropped by the parser.

const VIDEO_ID_LEN: usize = 11;

/// True when the URL points at a recognized video host.
pub fn is_video_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com/watch")
        || lower.contains("youtu.be/")
        || lower.contains("youtube.com/embed")
        || lower.contains("youtube.com/shorts")
}

/// Extract the stable 11-character video id from a watch/short/embed URL.
/// Returns None when no well-formed id can be found.
pub fn extract_video_id(url: &str) -> Option<String> {
    let candidate = if let Some(rest) = url.split("watch?").nth(1) {
        // v= can appear anywhere in the query string
        rest.split('&').find_map(|kv| kv.strip_prefix("v="))?
    } else if let Some(rest) = after_host_path(url, "youtu.be/") {
        rest
    } else if let Some(rest) = after_host_path(url, "/embed/") {
        rest
    } else if let Some(rest) = after_host_path(url, "/shorts/") {
        rest
    } else {
        return None;
    };

    let id: String = candidate
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if id.len() == VIDEO_ID_LEN {
        Some(id)
    } else {
        None
    }
}

fn after_host_path<'a>(url: &'a str, marker: &str) -> Option<&'a str> {
    url.find(marker).map(|i| &url[i + marker.len()..])
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Medium-quality thumbnail for a video id.
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/mqdefault.jpg", video_id)
}

/// Best-effort split of a post title into `(title, artist)`.
///
/// Strips square-bracket tags ("[FRESH]", "[Official Video]"), then splits
/// once on " - ". Without a separator the whole string is the title and the
/// artist is unknown.
pub fn clean_title(raw: &str) -> (String, Option<String>) {
    let stripped = strip_bracket_tags(raw);
    let cleaned = collapse_whitespace(&stripped);

    match cleaned.split_once(" - ") {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            (title.trim().to_string(), Some(artist.trim().to_string()))
        }
        _ => (cleaned.trim().to_string(), None),
    }
}

fn strip_bracket_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
