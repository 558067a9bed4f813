//! HTML fragments for the gallery page.
//!
//! Every piece of user text goes through [`escape`]. Controls carry
//! `data-action` / `data-image-id` attributes and no inline handlers; listeners
//! are attached after render and routed by [`super::events::route_click`].

use std::fmt::Write;

use super::{GridCell, GridView, NoticeView, PreviewView, TagOption, View};
use crate::controller::{EditForm, UploadForm};

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render_view(view: &View) -> String {
    let mut out = String::new();
    let _ = write!(out, r#"<main class="gallery" data-theme="{}">"#, view.theme);
    out.push_str(r#"<div class="toolbar">"#);
    let _ = write!(
        out,
        r#"<input type="search" id="search" placeholder="Search images" value="{}">"#,
        escape(&view.search)
    );
    out.push_str(&tag_select(&view.tag_options));
    out.push_str(r#"<button type="button" data-action="upload">Upload</button>"#);
    out.push_str("</div>");
    out.push_str(&notices(&view.notices));
    out.push_str(&grid(&view.grid));
    if let Some(preview) = &view.preview {
        out.push_str(&preview_dialog(preview));
    }
    if let Some(form) = &view.upload {
        out.push_str(&upload_dialog(form));
    }
    if let Some(form) = &view.edit {
        out.push_str(&edit_dialog(form));
    }
    out.push_str("</main>");
    out
}

pub fn grid(view: &GridView) -> String {
    match view {
        GridView::Empty { message } => {
            format!(r#"<div class="empty-state"><p>{}</p></div>"#, escape(message))
        }
        GridView::Cells(cells) => {
            let mut out = String::from(r#"<div class="gallery-grid">"#);
            for cell in cells {
                out.push_str(&grid_cell(cell));
            }
            out.push_str("</div>");
            out
        }
    }
}

fn grid_cell(cell: &GridCell) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="image-card" data-action="preview" data-image-id="{id}"><img src="{src}" alt="{alt}" loading="lazy"><div class="image-info"><h3>{title}</h3>"#,
        id = cell.id,
        src = escape(&cell.thumbnail_url),
        alt = escape(&cell.title),
        title = escape(&cell.title),
    );
    if let Some(desc) = &cell.description {
        let _ = write!(out, "<p>{}</p>", escape(desc));
    }
    out.push_str(&tag_badges(&cell.tags));
    if cell.owner_controls {
        out.push_str(&owner_controls(cell.id));
    }
    out.push_str("</div></div>");
    out
}

fn owner_controls(id: impl std::fmt::Display) -> String {
    format!(
        r#"<div class="image-actions"><button type="button" class="btn-edit" data-action="edit" data-image-id="{id}">Edit</button><button type="button" class="btn-delete" data-action="delete" data-image-id="{id}">Delete</button></div>"#
    )
}

fn tag_badges(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let mut out = String::from(r#"<div class="tags">"#);
    for tag in tags {
        let _ = write!(out, r#"<span class="tag">{}</span>"#, escape(tag));
    }
    out.push_str("</div>");
    out
}

pub fn preview_dialog(preview: &PreviewView) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="modal" id="preview-modal" data-image-id="{id}"><button type="button" class="close" data-action="close-preview">&times;</button><img src="{src}" alt="{alt}"><h2>{title}</h2>"#,
        id = preview.id,
        src = escape(&preview.image_url),
        alt = escape(&preview.title),
        title = escape(&preview.title),
    );
    if let Some(desc) = &preview.description {
        let _ = write!(out, "<p>{}</p>", escape(desc));
    }
    out.push_str(&tag_badges(&preview.tags));
    let _ = write!(
        out,
        r#"<p class="date">Uploaded {}</p>"#,
        escape(&preview.created)
    );
    if preview.owner_controls {
        out.push_str(&owner_controls(preview.id));
    }
    out.push_str("</div>");
    out
}

pub fn tag_select(options: &[TagOption]) -> String {
    let mut out = String::from(r#"<select id="tag-filter">"#);
    for option in options {
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            escape(&option.value),
            if option.selected { " selected" } else { "" },
            escape(&option.label)
        );
    }
    out.push_str("</select>");
    out
}

pub fn notices(notices: &[NoticeView]) -> String {
    let mut out = String::new();
    for notice in notices {
        let _ = write!(
            out,
            r#"<div class="notice notice-{}" role="status">{}</div>"#,
            notice.kind,
            escape(&notice.text)
        );
    }
    out
}

pub fn upload_dialog(form: &UploadForm) -> String {
    let file = form
        .file
        .as_ref()
        .map(|f| escape(&f.name))
        .unwrap_or_default();
    format!(
        r#"<div class="modal" id="upload-modal"><form data-action="submit-upload"><input type="file" name="file" accept="image/*" data-chosen="{file}"><input type="text" name="title" required value="{title}"><textarea name="description">{description}</textarea><input type="text" name="tags" placeholder="comma, separated, tags" value="{tags}"><button type="submit">Upload</button><button type="button" data-action="close-upload">Cancel</button></form></div>"#,
        title = escape(&form.title),
        description = escape(&form.description),
        tags = escape(&form.tags),
    )
}

pub fn edit_dialog(form: &EditForm) -> String {
    format!(
        r#"<div class="modal" id="edit-modal" data-image-id="{id}"><form data-action="submit-edit"><input type="text" name="title" required value="{title}"><textarea name="description">{description}</textarea><input type="text" name="tags" value="{tags}"><button type="submit">Save</button><button type="button" data-action="close-edit">Cancel</button></form></div>"#,
        id = form.image_id,
        title = escape(&form.title),
        description = escape(&form.description),
        tags = escape(&form.tags),
    )
}
