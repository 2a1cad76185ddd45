use ropey::Rope;

const UNDO_LIMIT: usize = 200;

/// The text buffer, its cursor, and a snapshot undo history.
pub struct Editor {
    rope: Rope,
    cursor_char: usize,
    preferred_col: Option<usize>,
    undo_stack: Vec<Rope>,
    redo_stack: Vec<Rope>,
    // Content as of the last load or save.
    saved: String,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            cursor_char: 0,
            preferred_col: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            saved: String::new(),
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Replaces the whole buffer and forgets history.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.cursor_char = 0;
        self.preferred_col = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.saved = text.to_string();
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.rope.to_string();
    }

    pub fn is_dirty(&self) -> bool {
        self.rope != self.saved.as_str()
    }

    pub fn insert_char(&mut self, c: char) {
        self.push_undo();
        self.rope.insert_char(self.cursor_char, c);
        self.cursor_char = self.cursor_char.saturating_add(1);
        self.preferred_col = None;
    }

    pub fn insert_str(&mut self, text: &str) {
        self.push_undo();
        self.rope.insert(self.cursor_char, text);
        self.cursor_char = self.cursor_char.saturating_add(text.chars().count());
        self.preferred_col = None;
    }

    pub fn backspace(&mut self) {
        if self.cursor_char == 0 {
            return;
        }
        self.push_undo();
        let prev = self.prev_boundary(self.cursor_char);
        self.rope.remove(prev..self.cursor_char);
        self.cursor_char = prev;
        self.preferred_col = None;
    }

    pub fn delete(&mut self) {
        if self.cursor_char >= self.rope.len_chars() {
            return;
        }
        self.push_undo();
        let next = self.next_boundary(self.cursor_char);
        self.rope.remove(self.cursor_char..next);
        self.preferred_col = None;
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_char = self.prev_boundary(self.cursor_char);
        self.preferred_col = None;
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor_char = self.next_boundary(self.cursor_char);
        self.preferred_col = None;
    }

    // `\r\n` is one step for the cursor.
    fn prev_boundary(&self, idx: usize) -> usize {
        if idx >= 2 && self.rope.char(idx - 1) == '\n' && self.rope.char(idx - 2) == '\r' {
            idx - 2
        } else {
            idx.saturating_sub(1)
        }
    }

    fn next_boundary(&self, idx: usize) -> usize {
        let len = self.rope.len_chars();
        if idx + 1 < len && self.rope.char(idx) == '\r' && self.rope.char(idx + 1) == '\n' {
            idx + 2
        } else {
            (idx + 1).min(len)
        }
    }

    pub fn move_cursor_up(&mut self) {
        self.move_cursor_lines(-1);
    }

    pub fn move_cursor_down(&mut self) {
        self.move_cursor_lines(1);
    }

    pub fn move_cursor_lines(&mut self, delta: isize) {
        let (line, col) = self.cursor_line_col();
        let max_line = self.rope.len_lines().saturating_sub(1);
        let target_line = if delta.is_negative() {
            line.saturating_sub(delta.unsigned_abs())
        } else {
            (line + delta as usize).min(max_line)
        };
        if target_line == line {
            return;
        }
        let desired = self.preferred_col.unwrap_or(col);
        let target_col = desired.min(line_len_chars(&self.rope, target_line));
        self.cursor_char = self.rope.line_to_char(target_line) + target_col;
        self.preferred_col = Some(desired);
    }

    pub fn move_cursor_line_start(&mut self) {
        let (line, _) = self.cursor_line_col();
        self.cursor_char = self.rope.line_to_char(line);
        self.preferred_col = None;
    }

    pub fn move_cursor_line_end(&mut self) {
        let (line, _) = self.cursor_line_col();
        let len = line_len_chars(&self.rope, line);
        self.cursor_char = self.rope.line_to_char(line) + len;
        self.preferred_col = None;
    }

    pub fn cursor_line_col(&self) -> (usize, usize) {
        let line = self.rope.char_to_line(self.cursor_char);
        let col = self.cursor_char - self.rope.line_to_char(line);
        (line, col)
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(prev) => {
                self.redo_stack.push(std::mem::replace(&mut self.rope, prev));
                self.cursor_char = self.cursor_char.min(self.rope.len_chars());
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(std::mem::replace(&mut self.rope, next));
                self.cursor_char = self.cursor_char.min(self.rope.len_chars());
                true
            }
            None => false,
        }
    }

    fn push_undo(&mut self) {
        if self.undo_stack.len() == UNDO_LIMIT {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(self.rope.clone());
        self.redo_stack.clear();
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

/// Characters ropey treats as line breaks.
pub fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

pub fn line_len_chars(rope: &Rope, line: usize) -> usize {
    if line >= rope.len_lines() {
        return 0;
    }
    let slice = rope.line(line);
    let mut len = slice.len_chars();
    if len == 0 {
        return 0;
    }
    let last = slice.char(len - 1);
    if is_line_break(last) {
        len -= 1;
        if last == '\n' && len > 0 && slice.char(len - 1) == '\r' {
            len -= 1;
        }
    }
    len
}
