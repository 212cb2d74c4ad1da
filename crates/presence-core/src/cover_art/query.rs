use presence_detect::MediaInfo;

/// The non-empty metadata fields a catalogue search can use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFields<'a> {
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub title: Option<&'a str>,
    pub date: Option<&'a str>,
}

impl<'a> SearchFields<'a> {
    pub fn from_media(media: &'a MediaInfo) -> Self {
        let present = |v: Option<&'a str>| v.map(str::trim).filter(|v| !v.is_empty());
        Self {
            artist: present(media.artist.as_deref()),
            album: present(media.album.as_deref()),
            title: present(Some(media.title.as_str())),
            date: present(media.date.as_deref()),
        }
    }

    /// First four characters of the date tag, if it has at least four.
    pub fn year(&self) -> Option<&'a str> {
        self.date.and_then(|date| date.get(..4))
    }
}

/// Search query from the most specific field combination available.
pub fn build_query(fields: &SearchFields<'_>) -> Option<String> {
    match (fields.artist, fields.album, fields.title) {
        (Some(artist), Some(album), Some(title)) => {
            Some(format!(r#"{title} AND artist:{artist} AND release:"{album}""#))
        }
        (Some(artist), None, Some(title)) => Some(format!("{title} AND artist:{artist}")),
        (Some(artist), Some(album), None) => {
            Some(format!(r#"artist:"{artist}" AND release:"{album}""#))
        }
        (None, Some(album), _) => Some(format!(r#"release:"{album}""#)),
        (Some(artist), None, None) => Some(format!(r#"artist:"{artist}""#)),
        (None, None, Some(title)) => Some(format!(r#"recording:"{title}""#)),
        (None, None, None) => None,
    }
}

/// Looser query tried when the specific searches found nothing.
pub fn build_fallback_query(fields: &SearchFields<'_>) -> Option<String> {
    match (fields.artist, fields.title) {
        (Some(artist), Some(_)) => Some(format!(r#"artist:"{artist}""#)),
        _ => None,
    }
}
