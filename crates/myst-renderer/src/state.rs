//! State structs tracked by the HTML writer while walking the token stream.

use std::collections::HashSet;

use pulldown_cmark::{Alignment, Event, Tag, TagEnd};

/// State for tracking code block rendering.
#[derive(Default)]
pub(crate) struct CodeBlockState {
    /// Whether we're inside a code block.
    active: bool,
    /// Fence info string, `None` for indented code blocks.
    info: Option<String>,
    /// Buffer for code block content.
    buffer: String,
}

impl CodeBlockState {
    /// Start a new code block.
    pub(crate) fn start(&mut self, info: Option<String>) {
        self.active = true;
        self.info = info;
        self.buffer.clear();
    }

    /// End the current code block and return (info, content).
    pub(crate) fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.info.take(), std::mem::take(&mut self.buffer))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// State for tracking table rendering.
#[derive(Default)]
pub(crate) struct TableState {
    /// Whether we're inside the table header row.
    in_head: bool,
    /// Whether `<tbody>` has been opened for the current table.
    in_body: bool,
    /// Column alignments for current table.
    alignments: Vec<Alignment>,
    /// Current column index in table row.
    cell_index: usize,
}

impl TableState {
    /// Start a new table with column alignments.
    pub(crate) fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.in_body = false;
        self.cell_index = 0;
    }

    pub(crate) fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub(crate) fn end_head(&mut self) {
        self.in_head = false;
    }

    /// Start a body row. Returns `true` if this is the first body row.
    pub(crate) fn start_row(&mut self) -> bool {
        self.cell_index = 0;
        !std::mem::replace(&mut self.in_body, true)
    }

    pub(crate) fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub(crate) fn is_in_head(&self) -> bool {
        self.in_head
    }

    pub(crate) fn is_in_body(&self) -> bool {
        self.in_body
    }

    /// Get the alignment style for the current cell.
    pub(crate) fn current_alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// State for tracking image alt text capture.
#[derive(Default)]
pub(crate) struct ImageState {
    /// Nesting depth; images inside alt text only contribute their text.
    depth: usize,
    /// Buffer for alt text.
    alt_text: String,
}

impl ImageState {
    /// Start capturing image alt text. Returns `true` for the outermost image.
    pub(crate) fn start(&mut self) -> bool {
        self.depth += 1;
        if self.depth == 1 {
            self.alt_text.clear();
            true
        } else {
            false
        }
    }

    /// End image capture. Returns the alt text when the outermost image closes.
    pub(crate) fn end(&mut self) -> Option<String> {
        self.depth = self.depth.saturating_sub(1);
        (self.depth == 0).then(|| std::mem::take(&mut self.alt_text))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.depth > 0
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.alt_text.push_str(text);
    }
}

/// Task list markup state.
///
/// The list and item tags are written before the checkbox marker is seen, so
/// the token stream is scanned once up front to find which lists and items
/// hold task markers.
#[derive(Default)]
pub(crate) struct TaskListState {
    /// Token indices of `Start(List)` events that contain task items.
    lists: HashSet<usize>,
    /// Token indices of `Start(Item)` events that are task items.
    items: HashSet<usize>,
    /// Whether a `<label>` is open around the current item text.
    label_open: bool,
    /// Whether a space is owed between the checkbox and the item text.
    pending_space: bool,
    /// Number of checkboxes written, for `task-item-N` ids.
    counter: usize,
}

impl TaskListState {
    /// Find task lists and items in a token stream.
    pub(crate) fn scan<'a, 'e: 'a>(events: impl IntoIterator<Item = &'a Event<'e>>) -> Self {
        let mut state = Self::default();
        let mut lists: Vec<usize> = Vec::new();
        let mut items: Vec<usize> = Vec::new();

        for (index, event) in events.into_iter().enumerate() {
            match event {
                Event::Start(Tag::List(_)) => lists.push(index),
                Event::End(TagEnd::List(_)) => {
                    lists.pop();
                }
                Event::Start(Tag::Item) => items.push(index),
                Event::End(TagEnd::Item) => {
                    items.pop();
                }
                Event::TaskListMarker(_) => {
                    if let Some(&item) = items.last() {
                        state.items.insert(item);
                    }
                    if let Some(&list) = lists.last() {
                        state.lists.insert(list);
                    }
                }
                _ => {}
            }
        }

        state
    }

    pub(crate) fn is_task_list(&self, index: usize) -> bool {
        self.lists.contains(&index)
    }

    pub(crate) fn is_task_item(&self, index: usize) -> bool {
        self.items.contains(&index)
    }

    /// Allocate the next checkbox id.
    pub(crate) fn next_id(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    pub(crate) fn open_label(&mut self) {
        self.label_open = true;
    }

    /// Close the item label if one is open. Returns `true` if it was.
    pub(crate) fn take_label(&mut self) -> bool {
        std::mem::take(&mut self.label_open)
    }

    pub(crate) fn owe_space(&mut self) {
        self.pending_space = true;
    }

    pub(crate) fn take_space(&mut self) -> bool {
        std::mem::take(&mut self.pending_space)
    }
}

/// Escape special HTML characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}
