//! Line-oriented conversion of model output into a small HTML fragment.
//!
//! Recognises three kinds of line: `**bold**` lines become `<h3>` headings,
//! lines starting with `*` become list items and everything else becomes a
//! paragraph. List depth is guessed from the number of `*` characters on the
//! line, so literal asterisks inside an item can open or close a nested list.
//! Input is not HTML-escaped.

/// Tracks the open `<ul>` elements while walking the lines.
#[derive(Default)]
struct ListState {
    in_list: bool,
    level: usize,
    nested: usize,
}

impl ListState {
    fn close(&mut self, out: &mut String) {
        if !self.in_list {
            return;
        }
        for _ in 0..=self.nested {
            out.push_str("</ul>\n");
        }
        self.in_list = false;
        self.nested = 0;
        self.level = 0;
    }

    fn item(&mut self, markers: usize, out: &mut String) {
        if !self.in_list {
            out.push_str("<ul>\n");
            self.in_list = true;
        } else if markers > self.level {
            out.push_str("<ul>\n");
            self.nested += 1;
        } else if markers < self.level && self.nested > 0 {
            out.push_str("</ul>\n");
            self.nested -= 1;
        }
        self.level = markers;
    }
}

fn is_bold_header(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("**") && trimmed.ends_with("**")
}

fn strip_markers(line: &str) -> &str {
    line.trim_matches('*').trim()
}

/// Convert raw model text into HTML, one element per input line.
pub fn parse_response(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + text.len() / 2);
    let mut list = ListState::default();

    for line in text.split('\n') {
        if is_bold_header(line) {
            list.close(&mut html);
            html.push_str("<h3>");
            html.push_str(strip_markers(line.trim()));
            html.push_str("</h3>\n");
        } else if line.starts_with('*') {
            let markers = line.matches('*').count();
            list.item(markers, &mut html);
            html.push_str("  <li>");
            html.push_str(strip_markers(line));
            html.push_str("</li>\n");
        } else {
            list.close(&mut html);
            html.push_str("<p>");
            html.push_str(line.trim());
            html.push_str("</p>\n");
        }
    }

    list.close(&mut html);
    html
}
