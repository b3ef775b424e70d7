//! Draft mutations.
//!
//! `reduce` is a pure `(draft, edit) -> draft'` transformation. List sections
//! are only ever touched through a field replace on an existing item, an
//! append, or a remove-at-index; there is no auto-extend.

use serde_json::Value;
use thiserror::Error;

use crate::models::{CvDraft, ImageSource, ListSection, ScalarSection, SectionItem, TextFields};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Image(ImageSource),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<ImageSource> for FieldValue {
    fn from(value: ImageSource) -> Self {
        FieldValue::Image(value)
    }
}

/// One user edit, as dispatched by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    SetField {
        section: ScalarSection,
        field: String,
        value: FieldValue,
    },
    SetItemField {
        section: ListSection,
        index: usize,
        field: String,
        value: String,
    },
    AddItem(SectionItem),
    DeleteItem {
        section: ListSection,
        index: usize,
    },
}

impl Edit {
    pub fn set_field(
        section: ScalarSection,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        Edit::SetField {
            section,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn set_item_field(
        section: ListSection,
        index: usize,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Edit::SetItemField {
            section,
            index,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn add_item(item: SectionItem) -> Self {
        Edit::AddItem(item)
    }

    pub fn add_blank_item(section: ListSection) -> Self {
        Edit::AddItem(section.blank_item())
    }

    pub fn delete_item(section: ListSection, index: usize) -> Self {
        Edit::DeleteItem { section, index }
    }

    /// The error-map key this edit touches.
    pub fn field_path(&self) -> String {
        match self {
            Edit::SetField { section, field, .. } => format!("{section}.{field}"),
            Edit::SetItemField {
                section,
                index,
                field,
                ..
            } => format!("{section}[{index}].{field}"),
            Edit::AddItem(item) => item.section().key().to_string(),
            Edit::DeleteItem { section, index } => format!("{section}[{index}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("{section} has no item at index {index} (length {len})")]
    IndexOutOfBounds {
        section: ListSection,
        index: usize,
        len: usize,
    },

    #[error("Invalid value for {path}: {reason}")]
    InvalidValue { path: String, reason: String },
}

/// Applies `edit` to a copy of `draft`.
pub fn reduce(draft: &CvDraft, edit: Edit) -> Result<CvDraft, EditError> {
    let mut next = draft.clone();
    apply(&mut next, edit)?;
    Ok(next)
}

fn apply(draft: &mut CvDraft, edit: Edit) -> Result<(), EditError> {
    match edit {
        Edit::SetField {
            section: ScalarSection::Basic,
            field,
            value,
        } => set_basic_field(draft, &field, value),
        Edit::SetField {
            section: ScalarSection::Layout,
            field,
            value,
        } => set_layout_field(draft, &field, value),
        Edit::SetItemField {
            section,
            index,
            field,
            value,
        } => {
            let item = item_mut(draft, section, index)?;
            set_text(item, &field, value);
            Ok(())
        }
        Edit::AddItem(item) => {
            match item {
                SectionItem::Education(item) => draft.education.push(item),
                SectionItem::Experience(item) => draft.experience.push(item),
                SectionItem::Project(item) => draft.projects.push(item),
                SectionItem::Skill(item) => draft.skills.push(item),
                SectionItem::Social(item) => draft.social.push(item),
            }
            Ok(())
        }
        Edit::DeleteItem { section, index } => match section {
            ListSection::Education => remove_at(&mut draft.education, section, index),
            ListSection::Experience => remove_at(&mut draft.experience, section, index),
            ListSection::Projects => remove_at(&mut draft.projects, section, index),
            ListSection::Skills => remove_at(&mut draft.skills, section, index),
            ListSection::Social => remove_at(&mut draft.social, section, index),
        },
    }
}

fn set_basic_field(draft: &mut CvDraft, field: &str, value: FieldValue) -> Result<(), EditError> {
    match (field, value) {
        ("image", FieldValue::Image(image)) => draft.basic.image = image,
        ("image", FieldValue::Text(url)) if url.trim().is_empty() => {
            draft.basic.image = ImageSource::None
        }
        ("image", FieldValue::Text(url)) => draft.basic.image = ImageSource::Url(url),
        (field, FieldValue::Text(text)) => set_text(&mut draft.basic, field, text),
        (field, FieldValue::Image(_)) => return Err(not_an_image(ScalarSection::Basic, field)),
    }
    Ok(())
}

fn set_layout_field(draft: &mut CvDraft, field: &str, value: FieldValue) -> Result<(), EditError> {
    let FieldValue::Text(text) = value else {
        return Err(not_an_image(ScalarSection::Layout, field));
    };
    if field == "size" {
        draft.layout.size = text
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| EditError::InvalidValue {
                path: "layout.size".to_string(),
                reason: format!("'{text}' is not a positive whole number"),
            })?;
    } else {
        set_text(&mut draft.layout, field, text);
    }
    Ok(())
}

fn not_an_image(section: ScalarSection, field: &str) -> EditError {
    EditError::InvalidValue {
        path: format!("{section}.{field}"),
        reason: "only basic.image accepts an image".to_string(),
    }
}

// Unknown field names land in the record's pass-through map.
fn set_text(record: &mut dyn TextFields, field: &str, value: String) {
    match record.text_field_mut(field) {
        Some(slot) => *slot = value,
        None => {
            record
                .extra_mut()
                .insert(field.to_string(), Value::String(value));
        }
    }
}

fn item_mut(
    draft: &mut CvDraft,
    section: ListSection,
    index: usize,
) -> Result<&mut dyn TextFields, EditError> {
    let len = draft.list_len(section);
    let item = match section {
        ListSection::Education => draft.education.get_mut(index).map(fields_mut),
        ListSection::Experience => draft.experience.get_mut(index).map(fields_mut),
        ListSection::Projects => draft.projects.get_mut(index).map(fields_mut),
        ListSection::Skills => draft.skills.get_mut(index).map(fields_mut),
        ListSection::Social => draft.social.get_mut(index).map(fields_mut),
    };
    item.ok_or(EditError::IndexOutOfBounds {
        section,
        index,
        len,
    })
}

fn fields_mut<T: TextFields>(item: &mut T) -> &mut dyn TextFields {
    item
}

fn remove_at<T>(items: &mut Vec<T>, section: ListSection, index: usize) -> Result<(), EditError> {
    if index >= items.len() {
        return Err(EditError::IndexOutOfBounds {
            section,
            index,
            len: items.len(),
        });
    }
    items.remove(index);
    Ok(())
}
