//! Askama implementation of the `Renderer` port.
//!
//! Titles go through askama's HTML escaping; post content is escaped by
//! `markup::content_to_html` (which also handles line breaks) and then
//! marked safe in the template.

pub mod markup;

use askama::Template;
use axum::http::StatusCode;
use domains::{AppError, PostId, PostView, Renderer, Result, Thread, ThreadSummary};

use markup::content_to_html;

/// A post after escaping, as the templates consume it.
pub struct PostRow {
    pub id: PostId,
    pub content_html: String,
    pub image_url: Option<String>,
}

impl From<&PostView> for PostRow {
    fn from(post: &PostView) -> Self {
        Self {
            id: post.id,
            content_html: content_to_html(&post.content),
            image_url: post.image_url.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub threads: &'a [ThreadSummary],
}

#[derive(Template)]
#[template(path = "thread.html")]
pub struct ThreadTemplate<'a> {
    pub thread: &'a Thread,
    pub posts: Vec<PostRow>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub post: PostRow,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate<'a> {
    pub message: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub status: u16,
    pub message: &'a str,
}

fn render(template: &impl Template) -> Result<String> {
    template
        .render()
        .map_err(|e| AppError::Internal(format!("template rendering failed: {e}")))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AskamaRenderer;

impl Renderer for AskamaRenderer {
    fn thread_list(&self, threads: &[ThreadSummary]) -> Result<String> {
        render(&IndexTemplate { threads })
    }

    fn thread_page(&self, thread: &Thread, posts: &[PostView]) -> Result<String> {
        render(&ThreadTemplate {
            thread,
            posts: posts.iter().map(PostRow::from).collect(),
        })
    }

    fn not_found(&self, message: &str) -> Result<String> {
        render(&NotFoundTemplate { message })
    }

    fn post_fragment(&self, post: &PostView) -> Result<String> {
        render(&PostTemplate { post: post.into() })
    }
}

/// Markup for error responses. Never fails: falls back to the escaped
/// message if the template cannot be rendered.
pub fn error_markup(status: StatusCode, message: &str) -> String {
    render(&ErrorTemplate {
        status: status.as_u16(),
        message,
    })
    .unwrap_or_else(|_| content_to_html(message))
}
