use uuid::Uuid;

/// Upper bound for the title part of a storage key.
pub const MAX_KEY_STEM: usize = 64;
/// Upper bound for the title part of a downloaded file's name.
const MAX_FILE_STEM: usize = 120;

/// Blob store key: `{slug}-{random token}.{ext}`.
///
/// The slug keeps ASCII letters and digits of the title, collapsing every
/// other run of characters into a single `-`. The random token keeps two
/// videos with the same title from overwriting each other.
pub fn storage_key(title: Option<&str>, extension: Option<&str>) -> String {
    let mut slug = slugify(title.unwrap_or_default());
    slug.truncate(MAX_KEY_STEM);
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "video" } else { slug };

    let token = Uuid::new_v4().simple().to_string();
    match extension.map(slugify).filter(|ext| !ext.is_empty()) {
        Some(ext) => format!("{slug}-{token}.{ext}"),
        None => format!("{slug}-{token}"),
    }
}

fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_separator = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }
    out
}

/// Local file name `{title}.{ext}` with path separators and control
/// characters replaced. Not unique; see [`crate::reserve_unique`].
pub fn local_file_name(title: Option<&str>, extension: &str) -> String {
    let cleaned: String = title
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_control() || "\\/:*?\"<>|".contains(c) {
                '_'
            } else {
                c
            }
        })
        .take(MAX_FILE_STEM)
        .collect();
    let stem = cleaned.trim_matches(|c| c == ' ' || c == '.' || c == '_');
    let stem = if stem.is_empty() { "video" } else { stem };
    format!("{stem}.{extension}")
}
