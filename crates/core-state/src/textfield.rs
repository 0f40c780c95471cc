//! Text-field overlay: a prompt + input line with optional autocomplete
//! cycling.

/// Autocomplete candidates for the current input, plus cursor over them.
/// `None` cursor means "show the original prefix": cycling has an empty
/// suffix so the user can return to what they originally typed.
#[derive(Debug, Clone, Default)]
struct Autocomplete {
    candidates: Vec<String>,
    cursor: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct TextFieldState {
    prompt: String,
    input: String,
    /// The input text as it stood before autocomplete cycling began; restored
    /// when the cycle returns to the empty-suffix position.
    base_input: String,
    autocomplete: Autocomplete,
    error: Option<String>,
    active: bool,
}

impl TextFieldState {
    pub fn open(prompt: impl Into<String>, initial: impl Into<String>) -> Self {
        let input: String = initial.into();
        Self {
            prompt: prompt.into(),
            base_input: input.clone(),
            input,
            autocomplete: Autocomplete::default(),
            error: None,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
        self.reset_autocomplete();
    }

    pub fn backspace(&mut self) {
        self.input.pop();
        self.reset_autocomplete();
    }

    fn reset_autocomplete(&mut self) {
        self.autocomplete = Autocomplete::default();
        self.base_input = self.input.clone();
    }

    /// Populate autocomplete candidates for the current `base_input` prefix
    /// (caller supplies them — this crate has no filesystem access).
    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.autocomplete.candidates = candidates;
        self.autocomplete.cursor = None;
    }

    /// Cycle to the next candidate suffix, wrapping through an empty suffix
    /// (the original prefix) once all candidates have been shown.
    pub fn cycle_autocomplete(&mut self) {
        if self.autocomplete.candidates.is_empty() {
            return;
        }
        let len = self.autocomplete.candidates.len();
        let next = match self.autocomplete.cursor {
            None => Some(0),
            Some(i) if i + 1 < len => Some(i + 1),
            Some(_) => None, // wrap back to the original prefix
        };
        self.autocomplete.cursor = next;
        self.input = match next {
            Some(i) => self.autocomplete.candidates[i].clone(),
            None => self.base_input.clone(),
        };
    }

    /// Mark the field as errored; the field stays open, displaying the
    /// error in the status bar.
    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
    }

    pub fn close(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_resets_autocomplete_cycle() {
        let mut f = TextFieldState::open(":e ", "src/li");
        f.set_candidates(vec!["src/lib.rs".into(), "src/list.rs".into()]);
        f.cycle_autocomplete();
        assert_eq!(f.input(), "src/lib.rs");
        f.push_char('x');
        assert_eq!(f.input(), "src/lib.rsx");
    }

    #[test]
    fn autocomplete_cycles_through_candidates_then_back_to_prefix() {
        let mut f = TextFieldState::open(":e ", "src/li");
        f.set_candidates(vec!["src/lib.rs".into(), "src/list.rs".into()]);
        f.cycle_autocomplete();
        assert_eq!(f.input(), "src/lib.rs");
        f.cycle_autocomplete();
        assert_eq!(f.input(), "src/list.rs");
        f.cycle_autocomplete();
        assert_eq!(f.input(), "src/li", "wraps back to the original prefix");
        f.cycle_autocomplete();
        assert_eq!(f.input(), "src/lib.rs", "cycle restarts from the top");
    }

    #[test]
    fn error_keeps_field_open() {
        let mut f = TextFieldState::open(":w ", "");
        f.set_error("permission denied");
        assert!(f.is_active());
        assert_eq!(f.error(), Some("permission denied"));
    }

    #[test]
    fn close_deactivates() {
        let mut f = TextFieldState::open(":w ", "");
        f.close();
        assert!(!f.is_active());
    }
}
