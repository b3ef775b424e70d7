use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::models::{CvDraft, ImageUpload};

/// The multipart shape of a create/update request: every section as a JSON
/// string part, plus the profile image as a binary part when one is pending.
#[derive(Debug, Clone, PartialEq)]
pub struct CvPayload {
    sections: Vec<(&'static str, String)>,
    image: Option<ImageUpload>,
}

impl CvPayload {
    pub fn from_draft(draft: &CvDraft) -> Result<Self, serde_json::Error> {
        // The image never rides inside `basic`; it goes out as its own part.
        let mut basic = serde_json::to_value(&draft.basic)?;
        if let Value::Object(map) = &mut basic {
            map.remove("image");
        }

        let sections = vec![
            ("basic", basic.to_string()),
            ("education", serde_json::to_string(&draft.education)?),
            ("experience", serde_json::to_string(&draft.experience)?),
            ("projects", serde_json::to_string(&draft.projects)?),
            ("skills", serde_json::to_string(&draft.skills)?),
            ("social", serde_json::to_string(&draft.social)?),
            ("layout", serde_json::to_string(&draft.layout)?),
        ];

        Ok(Self {
            sections,
            image: draft.basic.image.upload().cloned(),
        })
    }

    /// JSON text of one section part.
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, json)| json.as_str())
    }

    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.sections.iter().map(|(key, json)| (*key, json.as_str()))
    }

    pub fn image(&self) -> Option<&ImageUpload> {
        self.image.as_ref()
    }

    pub(crate) fn into_form(self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for (name, json) in self.sections {
            form = form.text(name, json);
        }
        if let Some(image) = self.image {
            let part = Part::bytes(image.bytes.to_vec())
                .file_name(image.file_name)
                .mime_str(&image.content_type)?;
            form = form.part("image", part);
        }
        Ok(form)
    }
}
