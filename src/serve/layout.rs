//! HTML layout for wiki pages. Everything that is not already rendered
//! markdown goes through [`escape_html`].

use std::fmt::Write;

use crate::ingest::{IndexSet, TreeNode};

use super::PageView;

const STYLE: &str = "\
body{margin:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',sans-serif;color:#222;display:flex;min-height:100vh}\
aside{width:16rem;padding:1rem;background:#f6f6f6;border-right:1px solid #e4e4e4}\
aside ul{list-style:none;padding-left:.8rem;margin:.2rem 0}\
aside a.active{font-weight:bold}\
main{flex:1;padding:1rem 2rem;max-width:52rem}\
nav.topics a{margin-right:1rem}\
nav.breadcrumb{font-size:.9rem;color:#666;margin:.5rem 0}\
a{color:#0b62c4;text-decoration:none}\
pre{background:#f4f4f4;padding:.6rem;overflow:auto}";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn href(path: &str) -> String {
    format!("/{}", escape_html(path))
}

/// Body of a directory view: the directory's own index page followed by its
/// child listing
pub fn directory_body(path: &str, page_html: &str, children: &[String]) -> String {
    let mut out = String::from(page_html);
    if children.is_empty() {
        return out;
    }

    out.push_str("<ul class=\"children\">");
    for child in children {
        let child_path = if path.is_empty() {
            child.clone()
        } else {
            format!("{}/{}", path, child)
        };
        let _ = write!(
            out,
            "<li><a href=\"{}\">{}</a></li>",
            href(&child_path),
            escape_html(child)
        );
    }
    out.push_str("</ul>");
    out
}

fn render_tree(node: &TreeNode, active: &str, out: &mut String) {
    if node.children.is_empty() {
        return;
    }

    out.push_str("<ul>");
    for child in node.children.values() {
        let class = if child.path == active { " class=\"active\"" } else { "" };
        let _ = write!(
            out,
            "<li><a href=\"{}\"{}>{}</a>",
            href(&child.path),
            class,
            escape_html(&child.name)
        );
        render_tree(child, active, out);
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}

/// Full HTML document for a resolved page
pub fn render_document(view: &PageView, index: &IndexSet) -> String {
    let mut out = String::with_capacity(view.body.len() + 2048);
    let title = escape_html(&view.title);

    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title><style>{}</style></head><body>",
        title, STYLE
    );

    out.push_str("<aside><a href=\"/\">home</a>");
    render_tree(index.tree(), &view.path, &mut out);
    out.push_str("</aside><main>");

    out.push_str("<nav class=\"topics\">");
    for topic in index.topics() {
        let _ = write!(out, "<a href=\"{}\">{}</a>", href(topic), escape_html(topic));
    }
    out.push_str("</nav>");

    if !view.breadcrumb.is_empty() {
        out.push_str("<nav class=\"breadcrumb\">");
        for (i, crumb) in view.breadcrumb.iter().enumerate() {
            if i > 0 {
                out.push_str(" / ");
            }
            let name = crumb.rsplit('/').next().unwrap_or(crumb);
            let _ = write!(out, "<a href=\"{}\">{}</a>", href(crumb), escape_html(name));
        }
        out.push_str("</nav>");
    }

    let _ = write!(out, "<article>{}</article></main></body></html>", view.body);
    out
}

pub fn not_found(path: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Not found</title></head>\
         <body><h1>404</h1><p>No page at /{}</p><p><a href=\"/\">home</a></p></body></html>",
        escape_html(path)
    )
}
