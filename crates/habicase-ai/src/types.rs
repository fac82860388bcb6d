//! Request and response shapes exchanged with the collaborators.

use habicase_core::IssueDraft;
use serde::{Deserialize, Serialize};

/// A single image sent along with an analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    /// MIME type, e.g. `image/jpeg`.
    pub media_type: String,
    /// Base64 payload without any `data:` prefix.
    pub data: String,
}

impl ImageInput {
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// `data:<mime>;base64,<payload>`, the form stored as an evidence file reference.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    /// Parse a base64 data URI back into an image.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let media_type = header.strip_suffix(";base64")?;
        Some(Self::new(media_type, data))
    }
}

/// Free text plus an optional photo to classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub description: String,
    pub image: Option<ImageInput>,
}

impl AnalysisRequest {
    pub fn text(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }
}

/// A suggested caption for a piece of evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceDraft {
    pub caption: String,
}

/// Best-effort classifier output. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub issue: Option<IssueDraft>,
    pub evidence_items: Vec<EvidenceDraft>,
    pub disclaimers: Vec<String>,
    pub summary: Option<String>,
}

impl Analysis {
    /// First non-blank evidence caption, if any.
    pub fn first_caption(&self) -> Option<&str> {
        self.evidence_items
            .iter()
            .map(|e| e.caption.trim())
            .find(|c| !c.is_empty())
    }
}

/// Narrative report for a whole case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    /// Markdown body.
    pub report_body: String,
    pub timeline_narrative: String,
    pub pattern_narrative: String,
}

impl Report {
    pub fn is_usable(&self) -> bool {
        !self.report_body.trim().is_empty()
    }

    /// Body followed by the two narratives as markdown sections.
    pub fn to_markdown(&self) -> String {
        let mut out = self.report_body.trim_end().to_string();
        for (heading, text) in [
            ("Timeline", &self.timeline_narrative),
            ("Patterns", &self.pattern_narrative),
        ] {
            if !text.trim().is_empty() {
                out.push_str(&format!("\n\n## {heading}\n\n{}", text.trim()));
            }
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_roundtrip() {
        let img = ImageInput::new("image/png", "iVBORw0KGgo=");
        let uri = img.to_data_uri();
        assert_eq!(uri, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(ImageInput::from_data_uri(&uri), Some(img));
    }

    #[test]
    fn non_data_uri_is_not_an_image() {
        assert!(ImageInput::from_data_uri("https://example.com/a.png").is_none());
        assert!(ImageInput::from_data_uri("data:image/png,raw").is_none());
    }

    #[test]
    fn empty_analysis_json() {
        let a: Analysis = serde_json::from_str("{}").unwrap();
        assert_eq!(a, Analysis::default());
        assert!(a.issue.is_none());
        assert!(a.first_caption().is_none());
    }

    #[test]
    fn analysis_with_partial_issue() {
        let json = r#"{
            "issue": {"title": "Mold", "severity": "high"},
            "evidence_items": [{"caption": "  "}, {"caption": "Black mold near vent"}],
            "disclaimers": ["Not legal advice"]
        }"#;
        let a: Analysis = serde_json::from_str(json).unwrap();
        let issue = a.issue.as_ref().unwrap();
        assert_eq!(issue.title.as_deref(), Some("Mold"));
        assert!(issue.room.is_none());
        assert_eq!(a.first_caption(), Some("Black mold near vent"));
        assert_eq!(a.disclaimers, ["Not legal advice"]);
    }

    #[test]
    fn report_markdown_sections() {
        let r = Report {
            report_body: "# Case report\n\nBody.".into(),
            timeline_narrative: "Reported in January.".into(),
            pattern_narrative: String::new(),
        };
        let md = r.to_markdown();
        assert!(md.starts_with("# Case report"));
        assert!(md.contains("## Timeline\n\nReported in January."));
        assert!(!md.contains("## Patterns"));
    }

    #[test]
    fn blank_report_is_not_usable() {
        assert!(!Report::default().is_usable());
    }
}
