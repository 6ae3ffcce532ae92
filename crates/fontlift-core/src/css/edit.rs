/// Text edits against an untouched source string.
///
/// Every offset refers to the original text, so edits never shift each other: insertions are
/// collected and only spliced in when the buffer is rendered.
#[derive(Debug, Clone)]
pub struct EditBuffer<'a> {
    original: &'a str,
    prefixes: Vec<String>,
    inserts: Vec<(usize, String)>,
}

impl<'a> EditBuffer<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            prefixes: Vec::new(),
            inserts: Vec::new(),
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Adds text at the very start; the most recent prepend ends up first.
    pub fn prepend(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.prefixes.push(text);
        }
    }

    /// Inserts text immediately before the original byte `offset`.
    ///
    /// Offsets past the end are clamped; offsets inside a UTF-8 sequence are ignored.
    pub fn insert_left(&mut self, offset: usize, text: impl Into<String>) {
        let text = text.into();
        let offset = offset.min(self.original.len());
        if text.is_empty() || !self.original.is_char_boundary(offset) {
            return;
        }
        self.inserts.push((offset, text));
    }

    pub fn has_changed(&self) -> bool {
        !self.prefixes.is_empty() || !self.inserts.is_empty()
    }

    pub fn render(&self) -> String {
        let extra: usize = self
            .prefixes
            .iter()
            .chain(self.inserts.iter().map(|(_, t)| t))
            .map(String::len)
            .sum();
        let mut out = String::with_capacity(self.original.len() + extra);
        for prefix in self.prefixes.iter().rev() {
            out.push_str(prefix);
        }

        let mut inserts: Vec<&(usize, String)> = self.inserts.iter().collect();
        inserts.sort_by_key(|(offset, _)| *offset);
        let mut cursor = 0;
        for (offset, text) in inserts {
            out.push_str(&self.original[cursor..*offset]);
            out.push_str(text);
            cursor = *offset;
        }
        out.push_str(&self.original[cursor..]);
        out
    }
}
