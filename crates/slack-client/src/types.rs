//! Wire shapes for the subset of Slack responses the adapter reads. Unknown
//! fields are ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Option<ChannelProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelProperties {
    #[serde(default)]
    pub canvas: Option<CanvasProperty>,
    #[serde(default)]
    pub tabs: Vec<ChannelTab>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CanvasProperty {
    #[serde(default)]
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelTab {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Option<TabData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabData {
    #[serde(default)]
    pub file_id: Option<String>,
}

impl Channel {
    /// Embedded canvas id from `properties.canvas`, then the canvas tab.
    pub fn canvas_id(&self) -> Option<String> {
        let props = self.properties.as_ref()?;
        props
            .canvas
            .as_ref()
            .and_then(|c| c.file_id.clone())
            .or_else(|| {
                props
                    .tabs
                    .iter()
                    .filter(|t| t.kind == "canvas")
                    .find_map(|t| t.data.as_ref().and_then(|d| d.file_id.clone()))
            })
            .filter(|id| !id.is_empty())
    }

    /// The channel advertises a canvas, whether or not its id is present.
    pub fn has_canvas(&self) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|p| p.canvas.is_some() || p.tabs.iter().any(|t| t.kind == "canvas"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationInfo {
    pub channel: Channel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationList {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

// ---------------------------------------------------------------------------
// Files and canvases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub plain_text: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    pub file: File,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasCreated {
    pub canvas_id: String,
}
