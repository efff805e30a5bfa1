//! Line-editor state for the command prompt.

/// A single-line editor: the text being typed, a cursor, and a history of
/// submitted lines browsable with the arrow keys.
#[derive(Default)]
pub struct InputLine {
    text: String,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
    stash: String,
}

impl InputLine {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Insert a printable ASCII character at the cursor.
    pub fn insert(&mut self, ch: char) {
        if ch.is_ascii() && !ch.is_ascii_control() {
            self.text.insert(self.cursor, ch);
            self.cursor += 1;
        }
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.text.remove(self.cursor);
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Step back through submitted lines (Up arrow). The first step stashes
    /// whatever is currently being typed so it can be restored later.
    pub fn history_prev(&mut self) {
        let next = match self.history_index {
            None if self.history.is_empty() => return,
            None => {
                self.stash = std::mem::take(&mut self.text);
                self.history.len() - 1
            }
            Some(0) => return, // already at the oldest entry
            Some(idx) => idx - 1,
        };
        self.history_index = Some(next);
        self.text = self.history[next].clone();
        self.cursor = self.text.len();
    }

    /// Step forward through submitted lines (Down arrow); past the newest
    /// entry the stashed in-progress line comes back.
    pub fn history_next(&mut self) {
        let Some(idx) = self.history_index else {
            return; // not browsing history
        };
        if let Some(entry) = self.history.get(idx + 1) {
            self.history_index = Some(idx + 1);
            self.text = entry.clone();
        } else {
            self.history_index = None;
            self.text = std::mem::take(&mut self.stash);
        }
        self.cursor = self.text.len();
    }

    /// Take the trimmed line for submission, recording it in history and
    /// resetting the editor. `None` when nothing but whitespace was typed.
    pub fn take(&mut self) -> Option<String> {
        let line = self.text.trim().to_string();
        self.text.clear();
        self.cursor = 0;
        self.history_index = None;
        self.stash.clear();

        if line.is_empty() {
            return None;
        }
        self.history.push(line.clone());
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::InputLine;

    #[test]
    fn editing_keeps_the_cursor_in_bounds() {
        let mut input = InputLine::default();
        for ch in "price".chars() {
            input.insert(ch);
        }
        assert_eq!(input.text(), "price");
        assert_eq!(input.cursor(), 5);

        input.move_home();
        input.delete();
        assert_eq!(input.text(), "rice");

        input.move_end();
        input.backspace();
        assert_eq!(input.text(), "ric");
        assert_eq!(input.cursor(), 3);

        input.move_left();
        input.move_left();
        input.move_left();
        input.move_left(); // pinned at zero
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn take_records_history_and_resets() {
        let mut input = InputLine::default();
        for ch in "  hello  ".chars() {
            input.insert(ch);
        }
        assert_eq!(input.take().as_deref(), Some("hello"));
        assert_eq!(input.text(), "");
        assert_eq!(input.cursor(), 0);

        // Whitespace-only submissions vanish without touching history.
        input.insert(' ');
        assert_eq!(input.take(), None);

        input.history_prev();
        assert_eq!(input.text(), "hello");
    }

    #[test]
    fn history_round_trips_the_stashed_draft() {
        let mut input = InputLine::default();
        for line in ["first", "second"] {
            for ch in line.chars() {
                input.insert(ch);
            }
            input.take();
        }
        for ch in "draft".chars() {
            input.insert(ch);
        }

        input.history_prev();
        assert_eq!(input.text(), "second");
        input.history_prev();
        assert_eq!(input.text(), "first");
        input.history_prev();
        assert_eq!(input.text(), "first"); // pinned at oldest

        input.history_next();
        assert_eq!(input.text(), "second");
        input.history_next();
        assert_eq!(input.text(), "draft"); // stashed draft restored
        assert_eq!(input.cursor(), 5);
    }
}
