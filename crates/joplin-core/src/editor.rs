use crate::model::{Annotation, BufferRef};
use crate::render::RenderedTree;

/// Editor buffer primitives the tree is painted through
pub trait EditorSurface: Send + Sync {
    fn set_buffer_lines(&self, buffer: &BufferRef, lines: &[String]);

    /// `line` is 0-based
    fn set_line_annotation(&self, buffer: &BufferRef, line: usize, annotation: &Annotation);

    fn clear_annotations(&self, buffer: &BufferRef);

    /// 1-based cursor line, `None` when the cursor is not in the buffer
    fn current_line_number(&self) -> Option<usize>;

    /// Replace buffer contents and bindings with a rendering
    fn paint(&self, buffer: &BufferRef, rendered: &RenderedTree) {
        self.clear_annotations(buffer);
        self.set_buffer_lines(buffer, &rendered.lines);
        for (line, annotation) in rendered.annotations.iter().enumerate() {
            self.set_line_annotation(buffer, line, annotation);
        }
    }
}
