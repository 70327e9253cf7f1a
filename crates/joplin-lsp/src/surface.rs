use std::sync::{Mutex, MutexGuard, PoisonError};

use joplin_core::{Annotation, BufferRef, EditorSurface, NodeKind, RenderedTree};

use crate::protocol::NotebookView;

#[derive(Default)]
struct Frame {
    lines: Vec<String>,
    annotations: Vec<Option<Annotation>>,
    painted: bool,
}

/// Editor surface backed by the reply of one command
///
/// The tree is painted into a frame which is then sent back to the client
/// as a `NotebookView`; the client owns the real buffer.
pub struct ViewSurface {
    cursor: Option<usize>,
    debug: bool,
    frame: Mutex<Frame>,
}

impl ViewSurface {
    pub fn new(cursor: Option<usize>, debug: bool) -> Self {
        Self {
            cursor,
            debug,
            frame: Mutex::new(Frame::default()),
        }
    }

    fn frame(&self) -> MutexGuard<'_, Frame> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn is_painted(&self) -> bool {
        self.frame().painted
    }

    /// Reply for the client, `None` when nothing was painted
    pub fn into_view(self, title: &str) -> Option<NotebookView> {
        let debug = self.debug;
        let frame = self.frame.into_inner().unwrap_or_else(PoisonError::into_inner);
        if !frame.painted {
            return None;
        }

        let annotations: Vec<Annotation> = frame.annotations.into_iter().flatten().collect();
        Some(view_of(title, frame.lines, annotations, true, debug))
    }
}

/// Build a view from plain lines and bindings
pub fn view_of(
    title: &str,
    lines: Vec<String>,
    annotations: Vec<Annotation>,
    changed: bool,
    debug: bool,
) -> NotebookView {
    let hints = if debug {
        annotations
            .iter()
            .map(|a| format!("{} ({})", a.id, kind_name(a.kind)))
            .collect()
    } else {
        Vec::new()
    };

    NotebookView {
        title: title.to_string(),
        lines,
        annotations,
        changed,
        hints,
    }
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Folder => "folder",
        NodeKind::Note => "note",
    }
}

/// View of a rendering that was not repainted
pub fn unchanged_view(title: &str, rendered: RenderedTree, debug: bool) -> NotebookView {
    view_of(title, rendered.lines, rendered.annotations, false, debug)
}

impl EditorSurface for ViewSurface {
    fn set_buffer_lines(&self, buffer: &BufferRef, lines: &[String]) {
        log::trace!("{}: {} lines", buffer.0, lines.len());
        let mut frame = self.frame();
        frame.lines = lines.to_vec();
        frame.annotations.resize(lines.len(), None);
        frame.painted = true;
    }

    fn set_line_annotation(&self, _buffer: &BufferRef, line: usize, annotation: &Annotation) {
        let mut frame = self.frame();
        if line >= frame.annotations.len() {
            frame.annotations.resize(line + 1, None);
        }
        frame.annotations[line] = Some(annotation.clone());
    }

    fn clear_annotations(&self, _buffer: &BufferRef) {
        self.frame().annotations.clear();
    }

    fn current_line_number(&self) -> Option<usize> {
        self.cursor
    }
}
