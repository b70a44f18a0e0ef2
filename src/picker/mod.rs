//! File chooser dispatch
//!
//! Browser file-chooser requests arrive as `ChooserParams`. `classify` turns
//! them into one of three picker kinds; the `PickerBroker` hands each request
//! to the native host and gives the caller a ticket that resolves with the
//! selected URIs.

mod broker;

pub use broker::{HostQueue, PendingPick, PickId, PickTicket, PickerBroker, PickerLauncher};

use serde::{Deserialize, Serialize};

/// Accept-type marker some pages use to ask for a directory
pub const DIRECTORY_ACCEPT: &str = ".directory";

/// Chooser mode as reported by the browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawMode")]
pub enum ChooserMode {
    #[default]
    Open,
    OpenMultiple,
    OpenFolder,
    Save,
}

/// Wire form of a chooser mode: a name or the numeric code (0..=3)
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMode {
    Code(u8),
    Name(String),
}

impl TryFrom<RawMode> for ChooserMode {
    type Error = String;

    fn try_from(raw: RawMode) -> Result<Self, Self::Error> {
        match raw {
            RawMode::Code(0) => Ok(Self::Open),
            RawMode::Code(1) => Ok(Self::OpenMultiple),
            RawMode::Code(2) => Ok(Self::OpenFolder),
            RawMode::Code(3) => Ok(Self::Save),
            RawMode::Code(n) => Err(format!("unknown chooser mode {n}")),
            RawMode::Name(name) => match name.as_str() {
                "open" => Ok(Self::Open),
                "open_multiple" => Ok(Self::OpenMultiple),
                "open_folder" => Ok(Self::OpenFolder),
                "save" => Ok(Self::Save),
                other => Err(format!("unknown chooser mode '{other}'")),
            },
        }
    }
}

/// A file-chooser request from the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChooserParams {
    #[serde(default)]
    pub mode: ChooserMode,
    #[serde(default)]
    pub accept_types: Vec<String>,
    #[serde(default)]
    pub filename_hint: Option<String>,
    #[serde(default)]
    pub capture: bool,
}

/// What the native host should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PickRequest {
    Open {
        multiple: bool,
        accept_types: Vec<String>,
        capture: bool,
    },
    Save {
        mime_type: String,
        suggested_name: Option<String>,
    },
    Directory,
}

impl PickRequest {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Open { .. } => "OPEN",
            Self::Save { .. } => "SAVE",
            Self::Directory => "DIRECTORY",
        }
    }
}

/// How a directory pick is reported back to the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryMode {
    /// The selected directory itself
    #[default]
    ReturnDirectory,
    /// The regular files directly inside the selected directory
    EnumerateFiles,
}

/// Classify a chooser request
///
/// Directory picks win over everything: the folder mode, or any accept type
/// equal to `.directory`. Save mode comes next; all else is an open.
pub fn classify(params: &ChooserParams) -> PickRequest {
    let wants_directory = params.mode == ChooserMode::OpenFolder
        || params
            .accept_types
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(DIRECTORY_ACCEPT));
    if wants_directory {
        return PickRequest::Directory;
    }

    if params.mode == ChooserMode::Save {
        let mime_type = params
            .accept_types
            .first()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or("*/*")
            .to_string();
        let suggested_name = params
            .filename_hint
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string);
        return PickRequest::Save {
            mime_type,
            suggested_name,
        };
    }

    PickRequest::Open {
        multiple: params.mode == ChooserMode::OpenMultiple,
        accept_types: params
            .accept_types
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .collect(),
        capture: params.capture,
    }
}
