use serde::{Deserialize, Serialize};

/// JSON body the receiver returns for an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub path: String,
    pub size: u64,
    pub path_key: String,
    pub filename: String,
    pub extracted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_dir: Option<String>,
}
