//! Groups a request's flat `content` array into analysis groups (spec §4.6
//! step 3): "each image starts a new group, text items attach to the group
//! that contains the next image (or trail as the last group)".

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Image(String),
    Text(String),
}

pub fn classify(item: &str) -> ContentItem {
    if item.starts_with("http://") || item.starts_with("https://") {
        ContentItem::Image(item.to_string())
    } else {
        ContentItem::Text(item.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisGroup {
    pub image_url: Option<String>,
    pub texts: Vec<String>,
}

impl AnalysisGroup {
    /// Whether this group's last content item was text (spec §4.6 step 4
    /// anchor selection: "for the last group, if the last content item is
    /// text, use it verbatim").
    pub fn last_item_is_text(&self) -> bool {
        !self.texts.is_empty()
    }
}

/// Text seen before the first image attaches to that image's group; text
/// trailing after the last image (or all text, if there is no image at all)
/// forms — or is appended to — the final group.
pub fn group_content(content: &[String]) -> Vec<AnalysisGroup> {
    let mut groups: Vec<AnalysisGroup> = Vec::new();
    let mut pending_texts: Vec<String> = Vec::new();

    for item in content {
        match classify(item) {
            ContentItem::Image(url) => {
                groups.push(AnalysisGroup { image_url: Some(url), texts: std::mem::take(&mut pending_texts) });
            }
            ContentItem::Text(text) => pending_texts.push(text),
        }
    }

    if !pending_texts.is_empty() {
        match groups.last_mut() {
            Some(last) => last.texts.extend(pending_texts),
            None => groups.push(AnalysisGroup { image_url: None, texts: pending_texts }),
        }
    }

    groups
}
